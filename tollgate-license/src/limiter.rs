//! Device limiters: narrow a server-granted entitlement per device.
//!
//! The verifier consults the limiter only after an authenticated `Licensed`
//! reply. [`BoundDeviceLimiter`] binds each user to a bounded set of device
//! fingerprints, so one purchase cannot be spread over an unlimited number
//! of machines.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::env;
use std::sync::{Mutex, PoisonError};
use tollgate_types::Outcome;
use tracing::warn;

/// Decides whether the current device may use a user's entitlement.
pub trait DeviceLimiter: Send + Sync {
    /// Returns the outcome for `user_id` on this device.
    fn is_device_allowed(&self, user_id: &str) -> Outcome;
}

/// Places no limit on devices.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDeviceLimiter;

impl DeviceLimiter for NullDeviceLimiter {
    fn is_device_allowed(&self, _user_id: &str) -> Outcome {
        Outcome::Entitled
    }
}

/// A stable fingerprint that identifies this device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFingerprint {
    id: String,
    generated_at: chrono::DateTime<chrono::Utc>,
}

impl DeviceFingerprint {
    /// Generates a fingerprint for the current device.
    ///
    /// Combines OS, architecture, hostname and the platform machine id. The
    /// result survives reboots but changes if the machine is replaced.
    #[must_use]
    pub fn generate() -> Self {
        let hash = Sha256::digest(fingerprint_source().as_bytes());

        Self {
            id: BASE64.encode(&hash[..16]),
            generated_at: chrono::Utc::now(),
        }
    }

    /// Returns the fingerprint ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns when the fingerprint was taken.
    #[must_use]
    pub fn generated_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.generated_at
    }
}

/// Allows each user at most `max_devices` distinct devices.
///
/// The first devices a user shows up on are registered until the cap is
/// reached; any further device is refused.
#[derive(Debug)]
pub struct BoundDeviceLimiter {
    max_devices: usize,
    device_id: String,
    registry: Mutex<HashMap<String, BTreeSet<String>>>,
}

impl BoundDeviceLimiter {
    /// Creates a limiter for the current device.
    #[must_use]
    pub fn new(max_devices: usize) -> Self {
        Self::with_device_id(max_devices, DeviceFingerprint::generate().id)
    }

    /// Creates a limiter that identifies the current device as `device_id`.
    pub fn with_device_id(max_devices: usize, device_id: impl Into<String>) -> Self {
        Self {
            max_devices,
            device_id: device_id.into(),
            registry: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the id this limiter uses for the current device.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Records that `user_id` already uses `device_id`, e.g. from server data.
    pub fn register(&self, user_id: &str, device_id: impl Into<String>) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user_id.to_string())
            .or_default()
            .insert(device_id.into());
    }

    /// Returns the number of devices registered for `user_id`.
    #[must_use]
    pub fn device_count(&self, user_id: &str) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .map_or(0, BTreeSet::len)
    }
}

impl DeviceLimiter for BoundDeviceLimiter {
    fn is_device_allowed(&self, user_id: &str) -> Outcome {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let devices = registry.entry(user_id.to_string()).or_default();

        if devices.contains(&self.device_id) {
            return Outcome::Entitled;
        }
        if devices.len() >= self.max_devices {
            warn!(user_id, max = self.max_devices, "device limit reached");
            return Outcome::NotEntitled;
        }
        devices.insert(self.device_id.clone());
        Outcome::Entitled
    }
}

/// Inputs hashed into a [`DeviceFingerprint`], joined with `|`.
fn fingerprint_source() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    let mut parts = vec![env::consts::OS.to_string(), env::consts::ARCH.to_string(), host];
    parts.extend(machine_id());
    parts.join("|")
}

#[cfg(target_os = "linux")]
fn machine_id() -> Option<String> {
    const CANDIDATES: [&str; 2] = ["/etc/machine-id", "/var/lib/dbus/machine-id"];

    CANDIDATES
        .iter()
        .filter_map(|path| std::fs::read_to_string(path).ok())
        .map(|id| id.trim().to_string())
        .find(|id| !id.is_empty())
}

#[cfg(target_os = "macos")]
fn machine_id() -> Option<String> {
    let output = std::process::Command::new("ioreg")
        .args(["-rd1", "-c", "IOPlatformExpertDevice"])
        .output()
        .ok()?;
    let text = String::from_utf8(output.stdout).ok()?;
    let line = text.lines().find(|l| l.contains("IOPlatformUUID"))?;
    // `"IOPlatformUUID" = "XXXXXXXX-..."`
    line.rsplit('"').nth(1).map(str::to_string)
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn machine_id() -> Option<String> {
    None
}
