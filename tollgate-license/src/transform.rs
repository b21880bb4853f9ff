//! Response codes and the integrity-keyed transform used to dispatch on them.
//!
//! The incoming code and every known constant are folded with the artifact
//! checksum before they are compared. The comparison is still an equality
//! test, but a patched binary changes its own checksum and with it every
//! folded value, so flipping a constant in place no longer selects the
//! branch the patch was aiming for.
//!
//! The wire values are stored sealed and only unsealed at run time.

use crate::integrity::IntegrityHash;
use std::fmt;

const SEAL: i32 = 0x2F6B_13C5;

const fn seal(wire: i32) -> i32 {
    wire ^ SEAL
}

const fn unseal(sealed: i32) -> i32 {
    sealed ^ SEAL
}

/// Status codes the licensing service can answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    /// The user is licensed.
    Licensed,
    /// The user is not licensed.
    NotLicensed,
    /// Licensed, but the server signed with a retired key.
    LicensedOldKey,
    /// The application is not managed by the store.
    NotMarketManaged,
    /// The licensing server failed internally.
    ServerFailure,
    /// The device exceeded its request quota.
    OverQuota,
    /// The licensing server could not be reached.
    ErrorContactingServer,
    /// The package name is unknown to the store.
    InvalidPackageName,
    /// The requesting uid does not own the package.
    NonMatchingUid,
}

/// Known codes in dispatch order, with their sealed wire values.
const KNOWN: [(ResponseCode, i32); 9] = [
    (ResponseCode::Licensed, seal(0x0)),
    (ResponseCode::LicensedOldKey, seal(0x2)),
    (ResponseCode::NotLicensed, seal(0x1)),
    (ResponseCode::ErrorContactingServer, seal(0x101)),
    (ResponseCode::ServerFailure, seal(0x4)),
    (ResponseCode::OverQuota, seal(0x5)),
    (ResponseCode::InvalidPackageName, seal(0x102)),
    (ResponseCode::NonMatchingUid, seal(0x103)),
    (ResponseCode::NotMarketManaged, seal(0x3)),
];

impl ResponseCode {
    /// All known codes, in dispatch order.
    pub const ALL: [ResponseCode; 9] = [
        Self::Licensed,
        Self::LicensedOldKey,
        Self::NotLicensed,
        Self::ErrorContactingServer,
        Self::ServerFailure,
        Self::OverQuota,
        Self::InvalidPackageName,
        Self::NonMatchingUid,
        Self::NotMarketManaged,
    ];

    /// Returns the integer the service sends for this code.
    #[must_use]
    pub fn wire_value(self) -> i32 {
        KNOWN
            .iter()
            .find(|(code, _)| *code == self)
            .map_or(-1, |(_, sealed)| unseal(*sealed))
    }

    /// Looks up a code by its wire value with a plain comparison.
    #[must_use]
    pub fn from_wire(raw: i32) -> Option<Self> {
        KNOWN
            .iter()
            .find(|(_, sealed)| unseal(*sealed) == raw)
            .map(|(code, _)| *code)
    }

    /// Returns true for codes whose reply carries a signed payload.
    #[must_use]
    pub fn carries_payload(self) -> bool {
        matches!(self, Self::Licensed | Self::NotLicensed | Self::LicensedOldKey)
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Licensed => "licensed",
            Self::NotLicensed => "not_licensed",
            Self::LicensedOldKey => "licensed_old_key",
            Self::NotMarketManaged => "not_market_managed",
            Self::ServerFailure => "server_failure",
            Self::OverQuota => "over_quota",
            Self::ErrorContactingServer => "error_contacting_server",
            Self::InvalidPackageName => "invalid_package_name",
            Self::NonMatchingUid => "non_matching_uid",
        };
        f.write_str(s)
    }
}

/// Folds a code with the key: odd codes add it, even codes subtract it.
///
/// An add/subtract collision needs `2 * key` to equal the difference of an
/// odd and an even code, which is odd, so the fold is injective for every key.
pub(crate) fn fold(code: i32, key: i32) -> i32 {
    if code & 1 == 1 {
        code.wrapping_add(key)
    } else {
        code.wrapping_sub(key)
    }
}

/// Resolves raw response codes through the integrity-keyed fold.
#[derive(Debug, Clone, Copy)]
pub struct ResponseTransform {
    key: Option<i32>,
}

impl ResponseTransform {
    /// Creates a transform keyed by the artifact checksum.
    #[must_use]
    pub fn new(hash: IntegrityHash) -> Self {
        Self { key: hash.key() }
    }

    /// Returns the first known code whose folded value equals the folded
    /// `raw` code. The sentinel hash matches nothing.
    #[must_use]
    pub fn resolve(&self, raw: i32) -> Option<ResponseCode> {
        let key = self.key?;
        let folded = fold(raw, key);
        KNOWN
            .iter()
            .find(|(_, sealed)| fold(unseal(*sealed), key) == folded)
            .map(|(code, _)| *code)
    }
}
