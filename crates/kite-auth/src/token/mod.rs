//! Access token signing and verification, refresh token minting.

pub mod claims;
pub mod issuer;

pub use claims::Claims;
pub use issuer::{IssuedSession, TokenIssuer, TokenPair};
