//! Verification of a licensing server response.
//!
//! One call to [`LicenseVerifier::verify`] runs the whole pipeline:
//!
//! 1. For codes that carry a payload, authenticate the signature, decode the
//!    signed data and check it against the [`VerificationContext`].
//! 2. Checksum the installed artifact and resolve the response code through
//!    the keyed [`ResponseTransform`].
//! 3. Map the code to an outcome (consulting the device limiter on success),
//!    feed it to the access policy and notify the callback.
//!
//! Exactly one callback method fires per call. Invalid responses are fed to
//! the policy as `NotEntitled` and always reported through `dont_allow`.
//! The verifier keeps no state of its own between calls.

use crate::callback::{ApplicationError, LicenseCallback};
use crate::config::VerifierConfig;
use crate::error::{LicenseError, LicenseResult};
use crate::integrity::ArtifactHasher;
use crate::limiter::DeviceLimiter;
use crate::policy::AccessPolicy;
use crate::signature::{PublicKey, SignatureAuthenticator};
use crate::transform::{ResponseCode, ResponseTransform};
use std::sync::Arc;
use tollgate_types::{Outcome, PipeReplyDecoder, ReplyDecoder, SignedReply, VerificationContext};
use tracing::{debug, error, warn};

/// Verifies signed licensing responses and reports the access decision.
pub struct LicenseVerifier {
    policy: Arc<dyn AccessPolicy>,
    limiter: Arc<dyn DeviceLimiter>,
    decoder: Arc<dyn ReplyDecoder>,
    authenticator: SignatureAuthenticator,
    hasher: ArtifactHasher,
}

impl LicenseVerifier {
    /// Creates a verifier with the default decoder and RSA/SHA-1 signatures.
    pub fn new(
        policy: Arc<dyn AccessPolicy>,
        limiter: Arc<dyn DeviceLimiter>,
        hasher: ArtifactHasher,
    ) -> Self {
        Self {
            policy,
            limiter,
            decoder: Arc::new(PipeReplyDecoder),
            authenticator: SignatureAuthenticator::default(),
            hasher,
        }
    }

    /// Creates a verifier using the algorithm and artifact from `config`.
    pub fn from_config(
        config: &VerifierConfig,
        policy: Arc<dyn AccessPolicy>,
        limiter: Arc<dyn DeviceLimiter>,
    ) -> Self {
        Self::new(policy, limiter, config.hasher()).with_authenticator(config.authenticator())
    }

    /// Replaces the reply decoder.
    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn ReplyDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Replaces the signature authenticator.
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: SignatureAuthenticator) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Returns the access policy decisions are fed to.
    #[must_use]
    pub fn policy(&self) -> &Arc<dyn AccessPolicy> {
        &self.policy
    }

    /// Verifies a server response and notifies `callback` of the result.
    ///
    /// `signature` is the base64 signature over `signed_data`; both may be
    /// empty for codes that carry no payload.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Crypto`] if the signature provider itself
    /// fails. Every other condition is reported through `callback`.
    pub fn verify(
        &self,
        public_key: &PublicKey,
        response_code: i32,
        signed_data: &str,
        signature: &str,
        context: &VerificationContext,
        callback: &dyn LicenseCallback,
    ) -> LicenseResult<()> {
        let mut reply = None;

        if ResponseCode::from_wire(response_code).is_some_and(ResponseCode::carries_payload) {
            match self.check_payload(public_key, response_code, signed_data, signature, context) {
                Ok(Some(checked)) => reply = Some(checked),
                Ok(None) => {
                    self.handle_invalid_response(callback);
                    return Ok(());
                }
                Err(LicenseError::InvalidPublicKey(reason)) => {
                    error!("public key rejected: {reason}");
                    callback.application_error(ApplicationError::InvalidPublicKey);
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }

        let transform = ResponseTransform::new(self.hasher.compute());
        let outcome = match transform.resolve(response_code) {
            Some(ResponseCode::Licensed | ResponseCode::LicensedOldKey) => {
                let user_id = reply.as_ref().map_or("", |r| r.user_id.as_str());
                self.limiter.is_device_allowed(user_id)
            }
            Some(ResponseCode::NotLicensed) => Outcome::NotEntitled,
            Some(ResponseCode::ErrorContactingServer) => {
                warn!("error contacting licensing server");
                Outcome::Retry
            }
            Some(ResponseCode::ServerFailure) => {
                warn!("an error has occurred on the licensing server");
                Outcome::Retry
            }
            Some(ResponseCode::OverQuota) => {
                warn!("licensing server is refusing to talk to this device, over quota");
                Outcome::Retry
            }
            Some(ResponseCode::InvalidPackageName) => {
                callback.application_error(ApplicationError::InvalidPackageName);
                return Ok(());
            }
            Some(ResponseCode::NonMatchingUid) => {
                callback.application_error(ApplicationError::NonMatchingUid);
                return Ok(());
            }
            Some(ResponseCode::NotMarketManaged) => {
                callback.application_error(ApplicationError::NotMarketManaged);
                return Ok(());
            }
            None => {
                error!(response_code, "unknown response code for license check");
                self.handle_invalid_response(callback);
                return Ok(());
            }
        };

        self.handle_response(outcome, reply.as_ref(), callback);
        Ok(())
    }

    /// Runs [`verify`](Self::verify) on the tokio blocking pool.
    ///
    /// The callback fires on the blocking worker thread.
    #[cfg(feature = "runtime")]
    pub fn verify_in_background(
        self: &Arc<Self>,
        public_key: PublicKey,
        response_code: i32,
        signed_data: String,
        signature: String,
        context: VerificationContext,
        callback: Arc<dyn LicenseCallback>,
    ) -> tokio::task::JoinHandle<LicenseResult<()>> {
        let verifier = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            verifier.verify(
                &public_key,
                response_code,
                &signed_data,
                &signature,
                &context,
                callback.as_ref(),
            )
        })
    }

    /// Authenticates, decodes and cross-checks a payload-carrying response.
    ///
    /// `Ok(None)` means the response is invalid; the reason has been logged.
    fn check_payload(
        &self,
        public_key: &PublicKey,
        response_code: i32,
        signed_data: &str,
        signature: &str,
        context: &VerificationContext,
    ) -> LicenseResult<Option<SignedReply>> {
        if !self.authenticator.authenticate(public_key, signed_data, signature)? {
            return Ok(None);
        }

        let reply = match self.decoder.decode(signed_data) {
            Ok(reply) => reply,
            Err(e) => {
                error!("could not parse response: {e}");
                return Ok(None);
            }
        };

        let mismatch = if reply.response_code != response_code {
            Some("response codes don't match")
        } else if reply.nonce != context.nonce {
            Some("nonce doesn't match")
        } else if reply.package_name != context.package_name {
            Some("package name doesn't match")
        } else if reply.version_code != context.version_code {
            Some("version codes don't match")
        } else if reply.user_id.is_empty() {
            Some("user identifier is empty")
        } else {
            None
        };

        if let Some(reason) = mismatch {
            error!("{reason}");
            return Ok(None);
        }
        Ok(Some(reply))
    }

    fn handle_response(&self, outcome: Outcome, reply: Option<&SignedReply>, callback: &dyn LicenseCallback) {
        self.policy.process_server_response(outcome, reply);

        if self.policy.allow_access() {
            debug!(%outcome, "access allowed");
            callback.allow(outcome);
        } else {
            debug!(%outcome, "access denied");
            callback.dont_allow(outcome);
        }
    }

    fn handle_invalid_response(&self, callback: &dyn LicenseCallback) {
        self.policy.process_server_response(Outcome::NotEntitled, None);
        callback.dont_allow(Outcome::NotEntitled);
    }
}
