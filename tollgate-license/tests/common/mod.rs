//! Shared test helpers for verifier tests.

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signer, SigningKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha1::{Digest, Sha1};
use std::io::Write;
use std::sync::{Arc, Mutex, OnceLock};
use tempfile::NamedTempFile;
use tollgate_license::{
    AccessPolicy, ApplicationError, ArtifactHasher, ChecksumMode, DeviceLimiter, LicenseCallback,
    LicenseVerifier, NullDeviceLimiter, Outcome, PublicKey, StrictPolicy, VerificationContext,
};

pub const NONCE: i32 = 12345;
pub const PACKAGE: &str = "com.example.app";
pub const VERSION: &str = "42";
pub const USER: &str = "user-1";

/// Routes library logs to the test harness (`RUST_LOG=debug` to see them).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A 1024-bit RSA key pair, generated once per test binary.
pub fn rsa_keypair() -> &'static (RsaPrivateKey, PublicKey) {
    static KEYPAIR: OnceLock<(RsaPrivateKey, PublicKey)> = OnceLock::new();
    KEYPAIR.get_or_init(|| {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let public = PublicKey::Rsa(private.to_public_key());
        (private, public)
    })
}

/// Returns the RSA public key used by [`sign_rsa`].
pub fn rsa_public_key() -> &'static PublicKey {
    &rsa_keypair().1
}

/// Signs `data` with RSA PKCS#1 v1.5 over SHA-1, returned as base64.
pub fn sign_rsa(data: &str) -> String {
    let digest = Sha1::digest(data.as_bytes());
    let sig = rsa_keypair()
        .0
        .sign(Pkcs1v15Sign::new::<Sha1>(), &digest)
        .unwrap();
    STANDARD.encode(sig)
}

/// Returns a deterministic Ed25519 key pair from a fixed seed.
pub fn ed25519_keypair() -> (SigningKey, PublicKey) {
    let seed: [u8; 32] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    let signing_key = SigningKey::from_bytes(&seed);
    let public = PublicKey::Ed25519(signing_key.verifying_key());
    (signing_key, public)
}

/// Signs `data` with Ed25519, returned as base64.
pub fn sign_ed25519(signing_key: &SigningKey, data: &str) -> String {
    STANDARD.encode(signing_key.sign(data.as_bytes()).to_bytes())
}

/// Builds signed data in the `code|nonce|package|version|user|timestamp:extras` layout.
pub fn signed_data(code: i32, nonce: i32, package: &str, version: &str, user: &str, extras: &str) -> String {
    let base = format!("{code}|{nonce}|{package}|{version}|{user}|1700000000000");
    if extras.is_empty() {
        base
    } else {
        format!("{base}:{extras}")
    }
}

/// Signed data matching [`context`] for the given code.
pub fn valid_signed_data(code: i32) -> String {
    signed_data(code, NONCE, PACKAGE, VERSION, USER, "")
}

pub fn context() -> VerificationContext {
    VerificationContext::new(NONCE, PACKAGE, VERSION)
}

/// One callback notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Allow(Outcome),
    DontAllow(Outcome),
    ApplicationError(ApplicationError),
}

/// Callback that records every notification.
#[derive(Debug, Default)]
pub struct RecordingCallback {
    events: Mutex<Vec<Notification>>,
}

impl RecordingCallback {
    pub fn events(&self) -> Vec<Notification> {
        self.events.lock().unwrap().clone()
    }

    /// Returns the single notification, failing if there was not exactly one.
    pub fn only(&self) -> Notification {
        let events = self.events();
        assert_eq!(events.len(), 1, "expected exactly one notification, got {events:?}");
        events[0]
    }

    fn push(&self, n: Notification) {
        self.events.lock().unwrap().push(n);
    }
}

impl LicenseCallback for RecordingCallback {
    fn allow(&self, outcome: Outcome) {
        self.push(Notification::Allow(outcome));
    }

    fn dont_allow(&self, outcome: Outcome) {
        self.push(Notification::DontAllow(outcome));
    }

    fn application_error(&self, error: ApplicationError) {
        self.push(Notification::ApplicationError(error));
    }
}

/// Writes a fake installed artifact spanning a few checksum blocks.
pub fn artifact() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let contents: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    file.write_all(&contents).unwrap();
    file.flush().unwrap();
    file
}

/// A verifier over a temporary artifact with a strict policy.
pub struct Harness {
    pub artifact: NamedTempFile,
    pub policy: Arc<StrictPolicy>,
    pub verifier: LicenseVerifier,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_limiter(Arc::new(NullDeviceLimiter))
    }

    pub fn with_limiter(limiter: Arc<dyn DeviceLimiter>) -> Self {
        init_tracing();
        let artifact = artifact();
        let policy = Arc::new(StrictPolicy::new());
        let hasher = ArtifactHasher::new(artifact.path(), ChecksumMode::Full);
        let verifier = LicenseVerifier::new(policy.clone() as Arc<dyn AccessPolicy>, limiter, hasher);
        Self {
            artifact,
            policy,
            verifier,
        }
    }

    /// Verifies an RSA-signed response against the default context.
    pub fn verify(&self, code: i32, signed_data: &str, signature: &str) -> Notification {
        self.verify_with(code, signed_data, signature, &context())
    }

    pub fn verify_with(
        &self,
        code: i32,
        signed_data: &str,
        signature: &str,
        context: &VerificationContext,
    ) -> Notification {
        let callback = RecordingCallback::default();
        self.verifier
            .verify(rsa_public_key(), code, signed_data, signature, context, &callback)
            .unwrap();
        callback.only()
    }

    /// Verifies a correctly signed response for `code`.
    pub fn verify_valid(&self, code: i32) -> Notification {
        let data = valid_signed_data(code);
        let sig = sign_rsa(&data);
        self.verify(code, &data, &sig)
    }
}
