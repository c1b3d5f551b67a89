//! The recovery descriptor (spec §6 "recovery descriptor", §9).
//!
//! A small JSON document written next to a loaded project and deleted
//! on a clean unload. Its own correctness property is purely
//! existential: "present iff the previous session loaded a project and
//! did not cleanly unload." Nothing in this crate ever reads its own
//! descriptor back to resume a crashed session -- that belongs to the
//! host, which is expected to notice the file on startup before the
//! core is even constructed -- so [`RecoveryDescriptor`] only needs to
//! round-trip through `serde_json` well enough for a host-side reader
//! to parse it, and to tolerate being absent or truncated.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::host::{Host, LogLevel, TextEncoding};

/// `{datFilePath, sprFilePath, versionValue, serverItemsPath, timestamp}`
/// (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryDescriptor {
    pub dat_file_path: PathBuf,
    pub spr_file_path: PathBuf,
    pub version_value: u16,
    pub server_items_path: Option<PathBuf>,
    pub timestamp: u64,
}

impl RecoveryDescriptor {
    pub fn new(
        dat_file_path: PathBuf,
        spr_file_path: PathBuf,
        version_value: u16,
        server_items_path: Option<PathBuf>,
    ) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        RecoveryDescriptor {
            dat_file_path,
            spr_file_path,
            version_value,
            server_items_path,
            timestamp,
        }
    }

    /// Best-effort write: any failure is swallowed and logged at
    /// `Warning`, never surfaced to the session's caller (spec §7
    /// "recovery descriptor ... intentionally swallowed").
    pub fn persist(&self, host: &dyn Host, path: &Path) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                host.log(LogLevel::Warning, &format!("failed to serialize recovery descriptor: {e}"));
                return;
            }
        };
        if let Err(e) = host.write_text(path, &json, TextEncoding::Utf8) {
            host.log(LogLevel::Warning, &format!("failed to persist recovery descriptor: {e}"));
        }
    }

    /// Best-effort delete, called on a clean unload. A missing file is
    /// not a failure at all (see [`Host::remove`]); anything else is
    /// swallowed and logged.
    pub fn clear(host: &dyn Host, path: &Path) {
        if let Err(e) = host.remove(path) {
            host.log(LogLevel::Warning, &format!("failed to clear recovery descriptor: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let descriptor = RecoveryDescriptor::new(
            PathBuf::from("client.dat"),
            PathBuf::from("client.spr"),
            1098,
            Some(PathBuf::from("items.otb")),
        );
        let json = serde_json::to_string(&descriptor).unwrap();
        let back: RecoveryDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dat_file_path, descriptor.dat_file_path);
        assert_eq!(back.version_value, 1098);
    }

    #[test]
    fn tolerates_a_truncated_descriptor() {
        let result: Result<RecoveryDescriptor, _> = serde_json::from_str("{\"datFilePath\":");
        assert!(result.is_err());
    }
}
