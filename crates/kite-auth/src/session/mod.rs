//! Cache-backed registry of live sessions.

pub mod store;

use sha2::{Digest, Sha256};

pub use store::SessionStore;

/// Session handle for a refresh token: lowercase hex SHA-256 of the token.
pub fn session_id_for(refresh_token: &str) -> String {
    Sha256::digest(refresh_token.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_is_sha256_hex() {
        assert_eq!(
            session_id_for("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(session_id_for("token-a").len(), 64);
        assert_ne!(session_id_for("token-a"), session_id_for("token-b"));
    }
}
