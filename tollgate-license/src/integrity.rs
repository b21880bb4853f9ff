//! CRC-32 checksum of the installed application artifact.
//!
//! The checksum is recomputed on every verification and only ever used as
//! the key of the response transform. It is not a security hash and is
//! never persisted or sent anywhere.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Size of the blocks the artifact is streamed in.
pub const BLOCK_SIZE: usize = 4096;

/// How the checksum treats each block read from the artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumMode {
    /// Checksum over the complete file contents.
    #[default]
    Full,
    /// Drops the final byte of every block before it is checksummed.
    ///
    /// Reproduces the checksum of legacy deployments bit for bit. Only use it
    /// when parity with such a deployment is required.
    Legacy,
}

/// Result of hashing the installed artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegrityHash {
    /// CRC-32 of the artifact.
    Crc32(u32),
    /// The artifact could not be read. No response code matches this key.
    Unavailable,
}

impl IntegrityHash {
    /// Returns the low 32 bits as a signed key, or `None` for the sentinel.
    #[must_use]
    pub fn key(&self) -> Option<i32> {
        match self {
            Self::Crc32(crc) => Some(*crc as i32),
            Self::Unavailable => None,
        }
    }
}

/// Computes the [`IntegrityHash`] of an artifact on disk.
#[derive(Debug, Clone)]
pub struct ArtifactHasher {
    path: PathBuf,
    mode: ChecksumMode,
}

impl ArtifactHasher {
    /// Creates a hasher for the artifact at `path`.
    pub fn new(path: impl Into<PathBuf>, mode: ChecksumMode) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }

    /// Creates a hasher for the currently running executable.
    ///
    /// If the executable path cannot be determined the hasher points at an
    /// empty path and every computation yields [`IntegrityHash::Unavailable`].
    pub fn current_exe(mode: ChecksumMode) -> Self {
        let path = std::env::current_exe().unwrap_or_else(|e| {
            warn!("cannot locate running executable: {e}");
            PathBuf::new()
        });
        Self::new(path, mode)
    }

    /// Returns the artifact path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the checksum mode.
    #[must_use]
    pub fn mode(&self) -> ChecksumMode {
        self.mode
    }

    /// Hashes the artifact. I/O failures yield [`IntegrityHash::Unavailable`].
    #[must_use]
    pub fn compute(&self) -> IntegrityHash {
        match checksum_file(&self.path, self.mode) {
            Ok(crc) => {
                debug!(path = %self.path.display(), "artifact checksum computed");
                IntegrityHash::Crc32(crc)
            }
            Err(e) => {
                warn!(path = %self.path.display(), "artifact checksum failed: {e}");
                IntegrityHash::Unavailable
            }
        }
    }
}

fn checksum_file(path: &Path, mode: ChecksumMode) -> io::Result<u32> {
    let mut file = File::open(path)?;
    checksum_reader(&mut file, mode)
}

/// Streams `reader` in [`BLOCK_SIZE`] blocks and returns the CRC-32.
pub fn checksum_reader<R: Read>(reader: &mut R, mode: ChecksumMode) -> io::Result<u32> {
    let mut hasher = Hasher::new();
    let mut block = [0u8; BLOCK_SIZE];
    loop {
        let n = fill_block(reader, &mut block)?;
        if n == 0 {
            break;
        }
        let len = match mode {
            ChecksumMode::Full => n,
            ChecksumMode::Legacy => n - 1,
        };
        hasher.update(&block[..len]);
    }
    Ok(hasher.finalize())
}

/// Reads until the block is full or the reader is exhausted.
fn fill_block<R: Read>(reader: &mut R, block: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < block.len() {
        match reader.read(&mut block[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
