//! Content fingerprints for report configs.

use sha2::{Digest, Sha256};

use super::config::ReportConfig;

/// SHA-256 of the config's JSON form, as 64 lowercase hex characters.
///
/// Used to tell whether the working config differs from the last saved or
/// loaded one.
pub fn fingerprint(config: &ReportConfig) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(config)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
