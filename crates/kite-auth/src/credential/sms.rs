//! One-time SMS codes: generation and delivery.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use async_trait::async_trait;
use tracing::info;

use kite_core::result::AppResult;

/// Number of digits in a one-time code.
pub const CODE_DIGITS: usize = 6;

/// Largest multiple of 10^6 that fits in a `u32`; draws above it are rejected
/// so every code is equally likely.
const UNBIASED_LIMIT: u32 = 4_294_000_000;

/// Delivers one-time codes to a phone.
#[async_trait]
pub trait SmsSender: Send + Sync + std::fmt::Debug {
    /// Send `code` to `phone`. An error means the code never left.
    async fn send(&self, phone: &str, code: &str) -> AppResult<()>;
}

/// Sender that only writes to the log. For development deployments.
#[derive(Debug, Clone, Default)]
pub struct LogSmsSender;

#[async_trait]
impl SmsSender for LogSmsSender {
    async fn send(&self, phone: &str, code: &str) -> AppResult<()> {
        info!(phone = %mask_phone(phone), code, "SMS code issued (log sender)");
        Ok(())
    }
}

/// A fresh zero-padded six-digit code from the OS RNG.
pub fn generate_code() -> String {
    let value = loop {
        let draw = OsRng.next_u32();
        if draw < UNBIASED_LIMIT {
            break draw % 1_000_000;
        }
    };
    format!("{value:0width$}", width = CODE_DIGITS)
}

/// Keeps the last four digits of a phone number.
pub fn mask_phone(phone: &str) -> String {
    let keep = phone.len().saturating_sub(4);
    match phone.get(keep..) {
        Some(tail) if keep > 0 => format!("{}{tail}", "*".repeat(keep)),
        _ => "****".to_string(),
    }
}
