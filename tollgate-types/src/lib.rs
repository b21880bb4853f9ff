//! Core type definitions for Tollgate.
//!
//! This crate defines the value types shared by the verification pipeline:
//! - Policy outcomes (Entitled / NotEntitled / Retry)
//! - The decoded, authenticated server reply
//! - The per-request verification context
//! - Decoding of the reply's URL-encoded extras
//!
//! Nothing here touches keys, files, or policy state; that lives in
//! `tollgate-license`.

mod context;
mod extras;
mod outcome;
mod reply;

pub use context::VerificationContext;
pub use extras::{decode_extras, Extras};
pub use outcome::Outcome;
pub use reply::{PipeReplyDecoder, ReplyDecoder, SignedReply};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding reply data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The signed data does not have the expected `|`-separated layout.
    #[error("malformed reply: {0}")]
    MalformedReply(String),

    /// A numeric field of the reply failed to parse.
    #[error("invalid {field} in reply: {value:?}")]
    InvalidField { field: &'static str, value: String },

    /// The extras string could not be URL-decoded.
    #[error("invalid extras: {0}")]
    InvalidExtras(String),
}
