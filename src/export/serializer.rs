//! Binary encoding of model artifacts
//!
//! Layout: bincode of `{magic, format_version, payload, checksum}` where the
//! payload is itself the bincode of the `ModelArtifact`.

use serde::{Deserialize, Serialize};

use super::artifact::ModelArtifact;
use crate::error::{ForecastError, Result};

/// Serialized artifact wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerializedArtifact {
    /// Magic bytes for format detection
    magic: [u8; 4],
    /// Format version
    format_version: u32,
    /// Bincode of the artifact
    payload: Vec<u8>,
    /// Checksum for integrity verification
    checksum: u64,
}

impl SerializedArtifact {
    const MAGIC: [u8; 4] = *b"MFCA";
    const VERSION: u32 = 1;

    fn new(payload: Vec<u8>) -> Self {
        let checksum = compute_checksum(&payload);
        Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            payload,
            checksum,
        }
    }

    fn verify(&self) -> Result<()> {
        if self.magic != Self::MAGIC {
            return Err(ForecastError::Storage("not a model artifact".to_string()));
        }
        if self.format_version != Self::VERSION {
            return Err(ForecastError::Storage(format!(
                "unsupported artifact format version {}",
                self.format_version
            )));
        }
        if compute_checksum(&self.payload) != self.checksum {
            return Err(ForecastError::Storage(
                "checksum verification failed - artifact may be corrupted".to_string(),
            ));
        }
        Ok(())
    }
}

/// FNV-1a
fn compute_checksum(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Serialize an artifact to bytes
pub fn to_bytes(artifact: &ModelArtifact) -> Result<Vec<u8>> {
    let payload = bincode::serialize(artifact)?;
    Ok(bincode::serialize(&SerializedArtifact::new(payload))?)
}

/// Deserialize and verify an artifact
pub fn from_bytes(bytes: &[u8]) -> Result<ModelArtifact> {
    let wrapper: SerializedArtifact = bincode::deserialize(bytes)
        .map_err(|e| ForecastError::Storage(format!("unreadable artifact: {}", e)))?;
    wrapper.verify()?;
    bincode::deserialize(&wrapper.payload)
        .map_err(|e| ForecastError::Storage(format!("unreadable artifact payload: {}", e)))
}
