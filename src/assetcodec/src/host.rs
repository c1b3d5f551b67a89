//! The host capability interface (spec §6).
//!
//! The core never touches a filesystem, a settings store, or a log
//! widget directly; every such effect is routed through a `Host`
//! implementation supplied by the embedding application. This keeps the
//! codec and the project session deterministic and testable, and keeps
//! the "shell" (dialogs, menus, the updater, the window) out of this
//! crate entirely, per spec §1.

use std::path::{Path, PathBuf};

use crate::error::{AssetError, Result};

/// Severity for the host's log sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Text encoding for [`Host::read_text`]/[`Host::write_text`]. The
/// core's own text files (OTFI) are UTF-8; `items.xml` is the legacy
/// latin-1 the game's server tooling emits (spec §6 "OTFI ... read and
/// written verbatim as UTF-8", "items.xml ... latin-1 XML").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

/// Capabilities the core imports from its embedding application.
///
/// Every method here is infallible-by-convention only where spec §6 says
/// so (`exists`, `log`); everything that touches the filesystem returns a
/// `Result` so the session can translate a failure into
/// [`AssetError::Host`] or [`AssetError::NotFound`] per the propagation
/// policy in spec §7.
pub trait Host {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>>;

    /// Must create intermediate directories.
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    fn read_text(&self, path: &Path, encoding: TextEncoding) -> Result<String>;

    fn write_text(&self, path: &Path, text: &str, encoding: TextEncoding) -> Result<()>;

    /// Best-effort atomic copy of each existing file to `path.bak`. A
    /// missing source file is not an error; a copy failure is swallowed
    /// and logged, never surfaced, per spec §7 "best-effort".
    fn backup(&self, paths: &[PathBuf]);

    fn exists(&self, path: &Path) -> bool;

    /// Deletes a file if present; a missing file is not an error. Used
    /// by the project session to clear the recovery descriptor on a
    /// clean unload (spec §4.10 "delete the recovery descriptor") --
    /// not itself one of spec §6's enumerated capabilities, but
    /// required for that operation to be anything other than a stale
    /// file left on disk forever.
    fn remove(&self, path: &Path) -> Result<()>;

    /// Sorted list of entries in `dir`, optionally filtered by extension
    /// (without the leading dot).
    fn list(&self, dir: &Path, extensions: Option<&[&str]>) -> Result<Vec<PathBuf>>;

    /// Case-insensitive lookup of `name` within `dir`.
    fn find_in_dir(&self, dir: &Path, name: &str) -> Option<PathBuf>;

    fn watch(&self, path: &Path, on_change: Box<dyn Fn() + Send + Sync>);

    fn unwatch(&self, path: &Path);

    fn unwatch_all(&self);

    fn log(&self, level: LogLevel, message: &str);
}

/// A plain local-filesystem `Host`, used by tests and by any embedder
/// that doesn't need file watching or a real log sink.
///
/// Watching is a no-op here: callbacks are simply never invoked, which
/// is a conforming (if useless) implementation, since spec §5 says
/// watcher callbacks are delivered "out-of-band" and "best-effort" and
/// the core never relies on their ordering or even their delivery.
#[derive(Default)]
pub struct LocalHost;

impl Host for LocalHost {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| to_host_error(path, e))
    }

    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| to_host_error(path, e))?;
        }
        std::fs::write(path, bytes).map_err(|e| to_host_error(path, e))
    }

    fn read_text(&self, path: &Path, encoding: TextEncoding) -> Result<String> {
        let bytes = std::fs::read(path).map_err(|e| to_host_error(path, e))?;
        match encoding {
            TextEncoding::Utf8 => {
                String::from_utf8(bytes).map_err(|e| AssetError::format("host", format!("invalid utf-8 in {}: {e}", path.display())))
            }
            TextEncoding::Latin1 => Ok(bytes.into_iter().map(|b| b as char).collect()),
        }
    }

    fn write_text(&self, path: &Path, text: &str, encoding: TextEncoding) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| to_host_error(path, e))?;
        }
        let bytes: Vec<u8> = match encoding {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
            TextEncoding::Latin1 => text.chars().map(|c| c as u32 as u8).collect(),
        };
        std::fs::write(path, bytes).map_err(|e| to_host_error(path, e))
    }

    fn backup(&self, paths: &[PathBuf]) {
        for path in paths {
            if !path.exists() {
                continue;
            }
            let backup_path = path.with_extension(format!(
                "{}.bak",
                path.extension().and_then(|e| e.to_str()).unwrap_or("")
            ));
            if let Err(e) = std::fs::copy(path, &backup_path) {
                self.log(
                    LogLevel::Warning,
                    &format!("failed to back up {}: {e}", path.display()),
                );
            }
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove(&self, path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(to_host_error(path, e)),
        }
    }

    fn list(&self, dir: &Path, extensions: Option<&[&str]>) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|e| to_host_error(dir, e))? {
            let entry = entry.map_err(|e| to_host_error(dir, e))?;
            let path = entry.path();
            if let Some(exts) = extensions {
                let matches = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| exts.iter().any(|want| want.eq_ignore_ascii_case(e)));
                if !matches {
                    continue;
                }
            }
            entries.push(path);
        }
        entries.sort();
        Ok(entries)
    }

    fn find_in_dir(&self, dir: &Path, name: &str) -> Option<PathBuf> {
        let entries = std::fs::read_dir(dir).ok()?;
        for entry in entries.flatten() {
            let path = entry.path();
            if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
                if file_name.eq_ignore_ascii_case(name) {
                    return Some(path);
                }
            }
        }
        None
    }

    fn watch(&self, _path: &Path, _on_change: Box<dyn Fn() + Send + Sync>) {}

    fn unwatch(&self, _path: &Path) {}

    fn unwatch_all(&self) {}

    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => log::info!("{message}"),
            LogLevel::Warning => log::warn!("{message}"),
            LogLevel::Error => log::error!("{message}"),
        }
    }
}

fn to_host_error(path: &Path, e: std::io::Error) -> AssetError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AssetError::NotFound(path.display().to_string())
    } else {
        AssetError::Host(format!("{}: {e}", path.display()))
    }
}
