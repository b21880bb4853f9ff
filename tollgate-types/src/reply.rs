//! The decoded server reply and the decoders that produce it.

use crate::extras::{decode_extras, Extras};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Fields decoded from an authenticated server reply.
///
/// A reply is produced once, after its signature has been checked, and is
/// never mutated or re-decoded afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedReply {
    /// Response code echoed inside the signed payload.
    pub response_code: i32,
    /// Nonce echoed from the originating request.
    pub nonce: i32,
    /// Package identifier the server answered for.
    pub package_name: String,
    /// Version identifier the server answered for.
    pub version_code: String,
    /// Application-specific user identifier. Empty only on failure codes.
    pub user_id: String,
    /// Server timestamp in milliseconds since the epoch.
    pub timestamp: i64,
    /// Raw, still URL-encoded extras (`key=value&...`).
    pub extra: String,
}

impl SignedReply {
    /// Decodes the extras field into key/value pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if the extras are not valid URL-encoded data.
    pub fn extras(&self) -> Result<Extras> {
        decode_extras(&self.extra)
    }
}

/// Turns a signed-data string into a [`SignedReply`].
///
/// The verifier treats every decode error the same way, so implementations
/// only need to say *that* decoding failed.
pub trait ReplyDecoder: Send + Sync {
    /// Decodes an already-authenticated signed-data string.
    fn decode(&self, signed_data: &str) -> Result<SignedReply>;
}

/// Decoder for the `code|nonce|package|version|user|timestamp:extras` layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipeReplyDecoder;

/// Minimum number of `|`-separated fields before the extras.
const MIN_FIELDS: usize = 6;

impl ReplyDecoder for PipeReplyDecoder {
    fn decode(&self, signed_data: &str) -> Result<SignedReply> {
        let (main, extra) = signed_data.split_once(':').unwrap_or((signed_data, ""));

        let fields: Vec<&str> = main.split('|').collect();
        if main.is_empty() || fields.len() < MIN_FIELDS {
            return Err(Error::MalformedReply(format!(
                "expected at least {MIN_FIELDS} fields, got {}",
                if main.is_empty() { 0 } else { fields.len() }
            )));
        }

        Ok(SignedReply {
            response_code: parse_field("response code", fields[0])?,
            nonce: parse_field("nonce", fields[1])?,
            package_name: fields[2].to_string(),
            version_code: fields[3].to_string(),
            user_id: fields[4].to_string(),
            timestamp: parse_field("timestamp", fields[5])?,
            extra: extra.to_string(),
        })
    }
}

fn parse_field<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| Error::InvalidField {
        field,
        value: value.to_string(),
    })
}
