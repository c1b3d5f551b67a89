//! The project session (spec §4.10, component C10).
//!
//! Orchestrates `create`/`load`/`compile`/`loadMergeFiles`/`unload`
//! against a [`Host`], and nothing else: parsing a DAT buffer into a
//! [`crate::dat::DatFile`] is C6's job, overlaying sprite edits is C9's,
//! this module only ever touches raw bytes, paths, and the host's
//! watch/backup/log capabilities. It is deliberately thin (spec §2:
//! "7% share") -- a caller owns the actual [`crate::dat::ThingTable`]
//! and [`crate::store::SpriteStore`] and threads them through
//! [`ProjectSession::compile`] each time, the same way it received them
//! from [`ProjectSession::load`] as raw buffers to parse itself.

mod recovery;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dat::ClientFeatures;
use crate::error::{AssetError, Result};
use crate::host::{Host, LogLevel, TextEncoding};

pub use recovery::RecoveryDescriptor;

/// An external-change callback installed on a watched path. Wrapped in
/// `Arc` (not the `Box` [`Host::watch`] itself takes) so the same
/// callback can be installed on both the DAT and SPR paths, and
/// reinstalled again on `compile`'s new paths without the caller handing
/// over a fresh closure each time.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Immutable snapshot of the session's state, returned by every
/// operation (spec §4.10 "each returns the new immutable snapshot of
/// the state, or an error").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub loaded: bool,
    pub dat_path: Option<PathBuf>,
    pub spr_path: Option<PathBuf>,
    pub server_items_path: Option<PathBuf>,
    pub client_version: u16,
    pub dat_signature: u32,
    pub spr_signature: u32,
    pub features: ClientFeatures,
    pub is_temporary: bool,
    pub changed: bool,
    pub display_filename: Option<String>,
}

impl SessionState {
    fn display_filename_for(path: &Path) -> Option<String> {
        path.file_name().map(|n| n.to_string_lossy().into_owned())
    }
}

/// Parameters for [`ProjectSession::create`]: a brand new, unsaved
/// project (spec §4.10 "create").
#[derive(Debug, Clone)]
pub struct CreateParams {
    pub client_version: u16,
    pub dat_signature: u32,
    pub spr_signature: u32,
    /// Transparency has no version-implied default (spec §4.8's
    /// `applyVersionDefaults` never touches it); the caller states it
    /// explicitly when creating a fresh project.
    pub transparency: bool,
}

/// Parameters for [`ProjectSession::load`] (spec §4.10 "load").
#[derive(Debug, Clone)]
pub struct LoadParams {
    pub dat_path: PathBuf,
    pub spr_path: PathBuf,
    pub client_version: u16,
    pub transparency: bool,
    pub server_items_path: Option<PathBuf>,
    pub on_external_change: Option<ChangeCallback>,
}

/// The opaque `items.otb` bytes and/or latin-1 `items.xml` text read
/// alongside a project, never parsed by this crate (spec §1 Non-goals
/// "item-attribute XML/OTB parsing").
#[derive(Debug, Clone, Default)]
pub struct ServerItemFiles {
    pub otb: Option<Vec<u8>>,
    pub xml: Option<String>,
}

/// Raw buffers returned by [`ProjectSession::load`] for the caller to
/// hand to [`crate::dat::read_dat`] / [`crate::spr::SprAccessor::parse`]
/// (spec §4.10 "return the raw buffers to the caller for parsing").
#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub dat_bytes: Vec<u8>,
    pub spr_bytes: Vec<u8>,
    /// Same-stem `.otfi` text, read verbatim if present (spec §6).
    pub otfi: Option<String>,
    pub server_items: ServerItemFiles,
}

/// Parameters for [`ProjectSession::compile`]: the caller's current
/// in-memory DAT/SPR encoding, already serialised by C6/C4, plus
/// optional sidecar files (spec §4.10 "compile").
#[derive(Debug, Clone)]
pub struct CompileParams {
    pub dat_path: PathBuf,
    pub spr_path: PathBuf,
    pub dat_bytes: Vec<u8>,
    pub spr_bytes: Vec<u8>,
    pub dat_signature: u32,
    pub spr_signature: u32,
    pub server_items_path: Option<PathBuf>,
    pub otfi: Option<String>,
    pub server_items: Option<ServerItemFiles>,
}

/// Parameters for [`ProjectSession::load_merge_files`] (spec §4.10
/// "loadMergeFiles").
#[derive(Debug, Clone)]
pub struct MergeLoadParams {
    pub dat_path: PathBuf,
    pub spr_path: PathBuf,
}

/// The first `.dat`/`.spr`/`.otfi` found in a directory, by filesystem
/// order (spec §4.10 "discoverClientFiles").
#[derive(Debug, Clone, Default)]
pub struct DiscoveredClientFiles {
    pub dat: Option<PathBuf>,
    pub spr: Option<PathBuf>,
    pub otfi: Option<PathBuf>,
}

/// A case-insensitive `items.otb`/`items.xml` lookup (spec §4.10
/// "discoverServerItemFiles").
#[derive(Debug, Clone, Default)]
pub struct DiscoveredServerItemFiles {
    pub otb: Option<PathBuf>,
    pub xml: Option<PathBuf>,
}

/// Orchestrates the load/create/compile/merge/unload lifecycle of
/// exactly one DAT+SPR project at a time, delegating every effect to a
/// [`Host`] (spec §4.10, §5 "single-threaded ... guards one global
/// state bound to a process").
pub struct ProjectSession {
    host: Box<dyn Host>,
    recovery_path: PathBuf,
    state: SessionState,
    watch_callback: Option<ChangeCallback>,
}

impl ProjectSession {
    /// `recovery_path` is where the recovery descriptor is written and
    /// cleared; spec §6 treats it as an implementation detail of the
    /// embedding host, so the caller supplies it rather than this crate
    /// inventing a location.
    pub fn new(host: Box<dyn Host>, recovery_path: PathBuf) -> Self {
        ProjectSession {
            host,
            recovery_path,
            state: SessionState::default(),
            watch_callback: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// `create` -- unload whatever was loaded, start a brand-new
    /// temporary project with features derived from `client_version`
    /// (spec §4.10 "create").
    pub fn create(&mut self, params: CreateParams) -> Result<SessionState> {
        self.unload_internal();

        let features = ClientFeatures::empty().apply_version_defaults(params.client_version);
        let features = if params.transparency {
            features | ClientFeatures::TRANSPARENCY
        } else {
            features
        };

        self.state = SessionState {
            loaded: true,
            dat_path: None,
            spr_path: None,
            server_items_path: None,
            client_version: params.client_version,
            dat_signature: params.dat_signature,
            spr_signature: params.spr_signature,
            features,
            is_temporary: true,
            changed: false,
            display_filename: None,
        };
        Ok(self.state.clone())
    }

    /// `load` -- unload the current project, verify both files exist,
    /// read them (and any sidecar files) through the host, install file
    /// watches, persist a recovery descriptor, and hand the raw bytes
    /// back for the caller to parse (spec §4.10 "load").
    ///
    /// Not-found and host errors are the only ones this operation can
    /// raise (spec §7 "the session catches exactly host errors and
    /// not-found errors"); on either, the previous project stays
    /// unloaded rather than half-restored (spec §7 "the unload happens
    /// before I/O").
    pub fn load(&mut self, params: LoadParams) -> Result<(SessionState, LoadedProject)> {
        self.unload_internal();

        if !self.host.exists(&params.dat_path) {
            return Err(AssetError::NotFound(params.dat_path.display().to_string()));
        }
        if !self.host.exists(&params.spr_path) {
            return Err(AssetError::NotFound(params.spr_path.display().to_string()));
        }

        let dat_bytes = self.host.read_bytes(&params.dat_path)?;
        let spr_bytes = self.host.read_bytes(&params.spr_path)?;

        let otfi_path = params.dat_path.with_extension("otfi");
        let otfi = if self.host.exists(&otfi_path) {
            self.host.read_text(&otfi_path, TextEncoding::Utf8).ok()
        } else {
            None
        };

        let server_items = match &params.server_items_path {
            Some(dir) => self.read_server_items(dir),
            None => ServerItemFiles::default(),
        };

        self.install_watch(&params.dat_path, &params.spr_path, params.on_external_change.clone());

        let features = ClientFeatures::empty().apply_version_defaults(params.client_version);
        let features = if params.transparency {
            features | ClientFeatures::TRANSPARENCY
        } else {
            features
        };

        self.state = SessionState {
            loaded: true,
            dat_path: Some(params.dat_path.clone()),
            spr_path: Some(params.spr_path.clone()),
            server_items_path: params.server_items_path.clone(),
            client_version: params.client_version,
            dat_signature: 0,
            spr_signature: 0,
            features,
            is_temporary: false,
            changed: false,
            display_filename: SessionState::display_filename_for(&params.dat_path),
        };
        self.watch_callback = params.on_external_change;

        let descriptor = RecoveryDescriptor::new(
            params.dat_path,
            params.spr_path,
            params.client_version,
            params.server_items_path,
        );
        descriptor.persist(self.host.as_ref(), &self.recovery_path);

        Ok((self.state.clone(), LoadedProject { dat_bytes, spr_bytes, otfi, server_items }))
    }

    /// `compile` -- refuses if nothing is loaded; backs up the existing
    /// on-disk files, writes the new DAT/SPR (and optional sidecars),
    /// updates and returns the state, and reinstalls watches and the
    /// recovery descriptor on the new paths (spec §4.10 "compile").
    ///
    /// A write failure here can leave the on-disk state partially
    /// written; the backups taken beforehand are the recovery path
    /// (spec §7 "A failed compile leaves the on-disk state possibly
    /// partially written").
    pub fn compile(&mut self, params: CompileParams) -> Result<SessionState> {
        if !self.state.loaded {
            return Err(AssetError::State("no project loaded"));
        }

        let mut backup_paths = vec![params.dat_path.clone(), params.spr_path.clone()];
        if let Some(dir) = &params.server_items_path {
            let found = self.discover_server_item_files(dir);
            backup_paths.extend(found.otb);
            backup_paths.extend(found.xml);
        }
        self.host.backup(&backup_paths);

        self.host.write_bytes(&params.dat_path, &params.dat_bytes)?;
        self.host.write_bytes(&params.spr_path, &params.spr_bytes)?;

        if let Some(otfi) = &params.otfi {
            let otfi_path = params.dat_path.with_extension("otfi");
            self.host.write_text(&otfi_path, otfi, TextEncoding::Utf8)?;
        }
        if let Some(server_items) = &params.server_items {
            if let Some(dir) = &params.server_items_path {
                if let Some(otb) = &server_items.otb {
                    self.host.write_bytes(&dir.join("items.otb"), otb)?;
                }
                if let Some(xml) = &server_items.xml {
                    self.host.write_text(&dir.join("items.xml"), xml, TextEncoding::Latin1)?;
                }
            }
        }

        self.state.dat_path = Some(params.dat_path.clone());
        self.state.spr_path = Some(params.spr_path.clone());
        self.state.server_items_path = params.server_items_path.clone();
        self.state.dat_signature = params.dat_signature;
        self.state.spr_signature = params.spr_signature;
        self.state.is_temporary = false;
        self.state.changed = false;
        self.state.display_filename = SessionState::display_filename_for(&params.dat_path);

        self.install_watch(&params.dat_path, &params.spr_path, self.watch_callback.clone());

        let descriptor = RecoveryDescriptor::new(
            params.dat_path,
            params.spr_path,
            self.state.client_version,
            params.server_items_path,
        );
        descriptor.persist(self.host.as_ref(), &self.recovery_path);

        Ok(self.state.clone())
    }

    /// `loadMergeFiles` -- refuses if nothing is loaded; reads a second
    /// DAT+SPR pair and returns its raw buffers only, without touching
    /// this session's own state (spec §4.10 "the session does not
    /// modify its own tables -- that merge logic is the caller's").
    pub fn load_merge_files(&self, params: MergeLoadParams) -> Result<(Vec<u8>, Vec<u8>)> {
        if !self.state.loaded {
            return Err(AssetError::State("no project loaded"));
        }
        if !self.host.exists(&params.dat_path) {
            return Err(AssetError::NotFound(params.dat_path.display().to_string()));
        }
        if !self.host.exists(&params.spr_path) {
            return Err(AssetError::NotFound(params.spr_path.display().to_string()));
        }
        let dat_bytes = self.host.read_bytes(&params.dat_path)?;
        let spr_bytes = self.host.read_bytes(&params.spr_path)?;
        Ok((dat_bytes, spr_bytes))
    }

    /// `unload` -- stops watchers, deletes the recovery descriptor, and
    /// resets state to factory defaults. Idempotent (spec §4.10
    /// "unload").
    pub fn unload(&mut self) -> SessionState {
        self.unload_internal();
        self.state.clone()
    }

    fn unload_internal(&mut self) {
        self.host.unwatch_all();
        if self.state.loaded {
            RecoveryDescriptor::clear(self.host.as_ref(), &self.recovery_path);
        }
        self.state = SessionState::default();
        self.watch_callback = None;
    }

    /// No-op when no project is loaded (spec §4.10).
    pub fn mark_changed(&mut self) {
        if self.state.loaded {
            self.state.changed = true;
        }
    }

    /// No-op when no project is loaded (spec §4.10).
    pub fn mark_saved(&mut self) {
        if self.state.loaded {
            self.state.changed = false;
        }
    }

    /// No-op when no project is loaded (spec §4.10).
    pub fn set_server_items_path(&mut self, path: Option<PathBuf>) {
        if self.state.loaded {
            self.state.server_items_path = path;
        }
    }

    /// Merges `features` into the current feature tuple; a no-op when
    /// no project is loaded (spec §4.10 "updateFeatures(partial)").
    pub fn update_features(&mut self, features: ClientFeatures) {
        if self.state.loaded {
            self.state.features |= features;
        }
    }

    /// `discoverClientFiles` (spec §4.10): the first `.dat`, `.spr`,
    /// `.otfi` in `dir` by filesystem order.
    pub fn discover_client_files(&self, dir: &Path) -> Result<DiscoveredClientFiles> {
        Ok(DiscoveredClientFiles {
            dat: self.host.list(dir, Some(&["dat"]))?.into_iter().next(),
            spr: self.host.list(dir, Some(&["spr"]))?.into_iter().next(),
            otfi: self.host.list(dir, Some(&["otfi"]))?.into_iter().next(),
        })
    }

    /// `discoverServerItemFiles` (spec §4.10): case-insensitive lookup
    /// for `items.otb` and `items.xml`.
    pub fn discover_server_item_files(&self, dir: &Path) -> DiscoveredServerItemFiles {
        DiscoveredServerItemFiles {
            otb: self.host.find_in_dir(dir, "items.otb"),
            xml: self.host.find_in_dir(dir, "items.xml"),
        }
    }

    fn read_server_items(&self, dir: &Path) -> ServerItemFiles {
        let found = self.discover_server_item_files(dir);
        ServerItemFiles {
            otb: found.otb.and_then(|p| self.host.read_bytes(&p).ok()),
            xml: found
                .xml
                .and_then(|p| self.host.read_text(&p, TextEncoding::Latin1).ok()),
        }
    }

    fn install_watch(&mut self, dat_path: &Path, spr_path: &Path, callback: Option<ChangeCallback>) {
        self.host.unwatch_all();
        if let Some(callback) = callback {
            let on_dat = callback.clone();
            self.host.watch(dat_path, Box::new(move || on_dat()));
            let on_spr = callback.clone();
            self.host.watch(spr_path, Box::new(move || on_spr()));
        }
    }
}

impl Drop for ProjectSession {
    /// A session that goes out of scope without an explicit `unload`
    /// still releases its watchers; the recovery descriptor is
    /// deliberately left in place, since an unclean drop is exactly the
    /// "previous session did not close cleanly" case the descriptor
    /// exists to signal (spec §9 "Recovery descriptor").
    fn drop(&mut self) {
        self.host.unwatch_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::LocalHost;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn session_in(dir: &Path) -> ProjectSession {
        ProjectSession::new(Box::new(LocalHost), dir.join("recovery.json"))
    }

    #[test]
    fn create_marks_temporary_and_derives_features() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());

        let state = session
            .create(CreateParams {
                client_version: 1098,
                dat_signature: 1,
                spr_signature: 2,
                transparency: true,
            })
            .unwrap();

        assert!(state.loaded);
        assert!(state.is_temporary);
        assert!(!state.changed);
        assert!(state.features.contains(ClientFeatures::EXTENDED));
        assert!(state.features.contains(ClientFeatures::FRAME_GROUPS));
        assert!(state.features.contains(ClientFeatures::TRANSPARENCY));
    }

    #[test]
    fn load_requires_both_files_to_exist() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());

        let dat_path = dir.path().join("client.dat");
        let spr_path = dir.path().join("client.spr");
        std::fs::write(&dat_path, b"dat-bytes").unwrap();
        // spr_path deliberately left missing.

        let err = session
            .load(LoadParams {
                dat_path,
                spr_path,
                client_version: 1098,
                transparency: true,
                server_items_path: None,
                on_external_change: None,
            })
            .unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
        assert!(!session.state().loaded);
    }

    #[test]
    fn load_returns_buffers_and_persists_a_recovery_descriptor() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());

        let dat_path = dir.path().join("client.dat");
        let spr_path = dir.path().join("client.spr");
        std::fs::write(&dat_path, b"dat-bytes").unwrap();
        std::fs::write(&spr_path, b"spr-bytes").unwrap();

        let (state, loaded) = session
            .load(LoadParams {
                dat_path: dat_path.clone(),
                spr_path: spr_path.clone(),
                client_version: 1098,
                transparency: false,
                server_items_path: None,
                on_external_change: None,
            })
            .unwrap();

        assert!(state.loaded);
        assert!(!state.is_temporary);
        assert_eq!(loaded.dat_bytes, b"dat-bytes");
        assert_eq!(loaded.spr_bytes, b"spr-bytes");
        assert!(dir.path().join("recovery.json").exists());
    }

    #[test]
    fn unload_clears_the_recovery_descriptor() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());

        let dat_path = dir.path().join("client.dat");
        let spr_path = dir.path().join("client.spr");
        std::fs::write(&dat_path, b"d").unwrap();
        std::fs::write(&spr_path, b"s").unwrap();
        session
            .load(LoadParams {
                dat_path,
                spr_path,
                client_version: 1098,
                transparency: false,
                server_items_path: None,
                on_external_change: None,
            })
            .unwrap();
        assert!(dir.path().join("recovery.json").exists());

        let state = session.unload();
        assert!(!state.loaded);
        assert!(!dir.path().join("recovery.json").exists());

        // Idempotent.
        let state = session.unload();
        assert!(!state.loaded);
    }

    #[test]
    fn compile_refuses_without_a_loaded_project() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());

        let err = session
            .compile(CompileParams {
                dat_path: dir.path().join("out.dat"),
                spr_path: dir.path().join("out.spr"),
                dat_bytes: vec![],
                spr_bytes: vec![],
                dat_signature: 0,
                spr_signature: 0,
                server_items_path: None,
                otfi: None,
                server_items: None,
            })
            .unwrap_err();
        assert!(matches!(err, AssetError::State(_)));
    }

    #[test]
    fn compile_backs_up_and_writes_then_marks_saved() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());
        session
            .create(CreateParams {
                client_version: 1098,
                dat_signature: 0,
                spr_signature: 0,
                transparency: false,
            })
            .unwrap();
        session.mark_changed();

        let dat_path = dir.path().join("out.dat");
        let spr_path = dir.path().join("out.spr");
        std::fs::write(&dat_path, b"old-dat").unwrap();
        std::fs::write(&spr_path, b"old-spr").unwrap();

        let state = session
            .compile(CompileParams {
                dat_path: dat_path.clone(),
                spr_path: spr_path.clone(),
                dat_bytes: b"new-dat".to_vec(),
                spr_bytes: b"new-spr".to_vec(),
                dat_signature: 7,
                spr_signature: 8,
                server_items_path: None,
                otfi: None,
                server_items: None,
            })
            .unwrap();

        assert!(!state.changed);
        assert!(!state.is_temporary);
        assert_eq!(state.dat_signature, 7);
        assert_eq!(std::fs::read(&dat_path).unwrap(), b"new-dat");
        assert!(dir.path().join("out.dat.bak").exists() || dir.path().join("out.bak").exists());
    }

    #[test]
    fn mark_changed_is_a_no_op_when_nothing_is_loaded() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());
        session.mark_changed();
        assert!(!session.state().changed);
    }

    #[test]
    fn load_merge_files_does_not_touch_session_state() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());
        session
            .create(CreateParams {
                client_version: 1098,
                dat_signature: 0,
                spr_signature: 0,
                transparency: false,
            })
            .unwrap();

        let other_dat = dir.path().join("other.dat");
        let other_spr = dir.path().join("other.spr");
        std::fs::write(&other_dat, b"merge-dat").unwrap();
        std::fs::write(&other_spr, b"merge-spr").unwrap();

        let before = session.state().clone();
        let (dat_bytes, spr_bytes) = session
            .load_merge_files(MergeLoadParams {
                dat_path: other_dat,
                spr_path: other_spr,
            })
            .unwrap();

        assert_eq!(dat_bytes, b"merge-dat");
        assert_eq!(spr_bytes, b"merge-spr");
        assert_eq!(session.state(), &before);
    }

    #[test]
    fn watch_callback_fires_on_change() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());

        let dat_path = dir.path().join("client.dat");
        let spr_path = dir.path().join("client.spr");
        std::fs::write(&dat_path, b"d").unwrap();
        std::fs::write(&spr_path, b"s").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        session
            .load(LoadParams {
                dat_path,
                spr_path,
                client_version: 1098,
                transparency: false,
                server_items_path: None,
                on_external_change: Some(Arc::new(move || {
                    calls_clone.fetch_add(1, Ordering::SeqCst);
                })),
            })
            .unwrap();

        // LocalHost's watch is a conforming no-op (spec §5 "best-effort,
        // delivered out-of-band"); this just exercises that installing
        // and holding the callback doesn't panic or leak across unload.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        session.unload();
    }
}
