//! Per-shell overlay kubeconfig files.
//!
//! Every shell that opts in gets its own overlay file, prepended to its
//! `KUBECONFIG`. The overlay's single context is what `kubectl` ends up
//! using, so switching clusters in one shell never affects another.
//! Overlays are never removed by their shell; [`Kubesel::garbage_collect`]
//! deletes the ones whose owner has exited.
mod data_dir;
mod error;
mod gc;
mod overlay;
mod owner;

use std::collections::HashSet;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::{debug, info, warn};

pub use data_dir::{find_data_home_dir, find_kubesel_data_dir, KUBESEL_DIR_NAME, SESSIONS_DIR_NAME};
pub use error::KubeselError;
pub use gc::{garbage_collect_dir, GarbageCollectOptions, GarbageCollectResult, GcFileError};
pub use overlay::{
    is_managed_context, Overlay, MANAGED_CONTEXT_NAME,
    MANAGED_EXTENSION_API_VERSION, MANAGED_EXTENSION_KIND, MANAGED_EXTENSION_NAME,
};
pub use owner::{OwnerIdentity, ProcessProbe, SystemProbe};

use crate::kubeconfig::Config;
use crate::loader::{find_kubeconfig_files, load_from_file, load_multiple_files, LoadedKubeconfigCollection};

/// Everything one invocation of kubesel knows about the kubeconfig files.
///
/// The files are loaded once, when the value is created. Name lists are
/// computed the first time they are asked for.
pub struct Kubesel {
    kubeconfigs: LoadedKubeconfigCollection,
    data_dir: PathBuf,
    sessions_dir: PathBuf,
    probe: Box<dyn ProcessProbe>,

    cluster_names: OnceLock<Vec<String>>,
    auth_info_names: OnceLock<Vec<String>>,
    context_names: OnceLock<Vec<String>>,
}

impl Kubesel {
    /// Loads the files named by `KUBECONFIG` and uses the user's data
    /// directory for overlays.
    pub async fn new() -> Result<Self, KubeselError> {
        let files = find_kubeconfig_files()?;
        let data_dir = find_kubesel_data_dir().ok_or(KubeselError::NoDataDir)?;
        Ok(Self::load(files, data_dir, Box::new(SystemProbe)).await)
    }

    pub async fn load(files: Vec<PathBuf>, data_dir: impl Into<PathBuf>, probe: Box<dyn ProcessProbe>) -> Self {
        let kubeconfigs = load_multiple_files(files).await;
        Self::from_collection(kubeconfigs, data_dir, probe)
    }

    pub fn from_collection(
        kubeconfigs: LoadedKubeconfigCollection,
        data_dir: impl Into<PathBuf>,
        probe: Box<dyn ProcessProbe>,
    ) -> Self {
        let data_dir = data_dir.into();
        let sessions_dir = data_dir.join(SESSIONS_DIR_NAME);

        Self {
            kubeconfigs,
            data_dir,
            sessions_dir,
            probe,
            cluster_names: OnceLock::new(),
            auth_info_names: OnceLock::new(),
            context_names: OnceLock::new(),
        }
    }

    /// The merged contents of every kubeconfig file.
    pub fn merged(&self) -> &Config {
        &self.kubeconfigs.merged
    }

    pub fn kubeconfigs(&self) -> &LoadedKubeconfigCollection {
        &self.kubeconfigs
    }

    pub fn kubeconfig_files(&self) -> impl Iterator<Item = &Path> {
        self.kubeconfigs.paths()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    pub fn probe(&self) -> &dyn ProcessProbe {
        self.probe.as_ref()
    }

    pub fn list_cluster_names(&self) -> &[String] {
        self.cluster_names.get_or_init(|| {
            self.merged()
                .clusters
                .iter()
                .filter_map(|named| named.name.clone())
                .collect()
        })
    }

    pub fn list_auth_info_names(&self) -> &[String] {
        self.auth_info_names.get_or_init(|| {
            self.merged()
                .auth_infos
                .iter()
                .filter_map(|named| named.name.clone())
                .collect()
        })
    }

    /// Context names, excluding the one managed by kubesel.
    pub fn list_context_names(&self) -> &[String] {
        self.context_names.get_or_init(|| {
            self.merged()
                .contexts
                .iter()
                .filter(|named| !is_managed_context(named))
                .filter_map(|named| named.name.clone())
                .collect()
        })
    }

    pub fn is_overlay_path(&self, path: &Path) -> bool {
        path.starts_with(&self.sessions_dir)
    }

    pub fn overlay_path_for_owner(&self, owner: &OwnerIdentity) -> PathBuf {
        self.sessions_dir.join(owner.file_name())
    }

    /// Returns the overlay of the current shell: the first loaded file that
    /// lives in the sessions directory.
    ///
    /// Fails with [`KubeselError::Unmanaged`] if there is no such file, or
    /// [`KubeselError::Corrupt`] if it isn't a valid overlay.
    pub fn find_overlay(&self) -> Result<Overlay, KubeselError> {
        let loaded = self
            .kubeconfigs
            .configs
            .iter()
            .find(|loaded| self.is_overlay_path(&loaded.path))
            .ok_or(KubeselError::Unmanaged)?;

        Overlay::from_loaded(loaded)
    }

    /// Creates and saves a new overlay for the owner.
    ///
    /// Fails with [`KubeselError::AlreadyManaged`] if the owner already has
    /// an overlay file. It is never overwritten.
    pub fn create_overlay(&self, owner: OwnerIdentity) -> Result<Overlay, KubeselError> {
        self.ensure_sessions_dir_exists()?;

        let overlay = Overlay::new_for_owner(self.overlay_path_for_owner(&owner), owner)?;
        overlay.save_new()?;

        info!(
            path = %overlay.path().display(),
            pid = owner.process,
            epoch = owner.epoch,
            "Created overlay"
        );
        Ok(overlay)
    }

    /// Creates an overlay for the process, starting from the merged config's
    /// current context. If the process already owns one, it is loaded instead.
    /// A corrupt file left at the owner's path is replaced.
    pub fn init_overlay(&self, pid: u32) -> Result<Overlay, KubeselError> {
        let owner = OwnerIdentity::for_process(pid, self.probe())?;

        let path = match self.create_overlay(owner) {
            Ok(overlay) => return self.start_from_merged(overlay),
            Err(KubeselError::AlreadyManaged(path)) => path,
            Err(e) => return Err(e),
        };

        match Overlay::from_loaded(&load_from_file(&path)) {
            Ok(overlay) => {
                debug!(path = %path.display(), "Reusing existing overlay");
                Ok(overlay)
            }
            Err(e) if e.is_corrupt() => {
                warn!(path = %path.display(), error = %e, "Replacing corrupt overlay");
                self.start_from_merged(Overlay::new_for_owner(path, owner)?)
            }
            Err(e) => Err(e),
        }
    }

    fn start_from_merged(&self, mut overlay: Overlay) -> Result<Overlay, KubeselError> {
        overlay.inherit_from(self.merged());
        overlay.save()?;
        Ok(overlay)
    }

    /// The `KUBECONFIG` value for a shell using the overlay: the overlay
    /// first, then every other file of the current search path once.
    pub fn kubeconfig_env_value(&self, overlay: &Overlay) -> Result<OsString, KubeselError> {
        let mut seen = HashSet::new();
        let paths = std::iter::once(overlay.path())
            .chain(self.kubeconfig_files().filter(|path| !self.is_overlay_path(path)))
            .filter(|path| seen.insert(path.to_path_buf()));

        Ok(env::join_paths(paths)?)
    }

    pub(crate) fn ensure_sessions_dir_exists(&self) -> Result<(), KubeselError> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }

        builder
            .create(&self.sessions_dir)
            .map_err(|e| KubeselError::io("creating", &self.sessions_dir, e))
    }
}
