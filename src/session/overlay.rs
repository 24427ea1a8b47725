// session/overlay.rs
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use super::{KubeselError, OwnerIdentity};
use crate::kubeconfig::{
    decode_extension, encode_extension, find_context, find_extension_from, Config, Context,
    Extension, NamedContext, NamedExtension,
};
use crate::loader::LoadedKubeconfig;

pub const MANAGED_CONTEXT_NAME: &str = "kubesel";
pub const MANAGED_EXTENSION_NAME: &str = "managed-by-kubesel";
pub const MANAGED_EXTENSION_API_VERSION: &str = "dev.eth-p.kubesel/v1";
pub const MANAGED_EXTENSION_KIND: &str = "ManagedByKubesel";

const SWAP_FILE_PREFIX: &str = ".kubesel-";
const SWAP_FILE_SUFFIX: &str = ".swp";

#[derive(Debug, Serialize, Deserialize)]
struct ManagedByKubesel {
    owner: OwnerIdentity,
}

/// A kubeconfig file owned by a single shell.
///
/// The file holds exactly one context, named [`MANAGED_CONTEXT_NAME`], which
/// is also the file's `current-context`. Switching cluster, user or
/// namespace mutates that context in place. Changes only reach the disk
/// when [`Overlay::save`] is called.
#[derive(Debug, Clone)]
pub struct Overlay {
    path: PathBuf,
    owner: OwnerIdentity,
    config: Config,
    context_index: usize,
}

impl Overlay {
    /// Builds a fresh overlay in memory. Nothing is written to disk.
    pub fn new_for_owner(path: impl Into<PathBuf>, owner: OwnerIdentity) -> Result<Self, KubeselError> {
        let mut extension = Extension::new(MANAGED_EXTENSION_API_VERSION, MANAGED_EXTENSION_KIND);
        encode_extension(&ManagedByKubesel { owner }, &mut extension)?;

        let config = Config {
            current_context: Some(MANAGED_CONTEXT_NAME.to_string()),
            contexts: vec![NamedContext {
                name: Some(MANAGED_CONTEXT_NAME.to_string()),
                context: Some(Context {
                    cluster: Some(String::new()),
                    user: Some(String::new()),
                    namespace: Some(String::new()),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            extensions: vec![NamedExtension {
                name: Some(MANAGED_EXTENSION_NAME.to_string()),
                extension: Some(extension),
                ..Default::default()
            }],
            ..Default::default()
        };

        Ok(Self {
            path: path.into(),
            owner,
            config,
            context_index: 0,
        })
    }

    /// Reconstructs an overlay from a file the loader already read.
    ///
    /// Anything that doesn't have the shape of an overlay is reported as
    /// [`KubeselError::Corrupt`].
    pub fn from_loaded(loaded: &LoadedKubeconfig) -> Result<Self, KubeselError> {
        let path = loaded.path.as_path();
        if !loaded.errors.is_empty() {
            let reasons: Vec<String> = loaded.errors.iter().map(|e| e.to_string()).collect();
            return Err(KubeselError::corrupt(path, reasons.join("; ")));
        }

        let config = &loaded.config;
        let current_context = config.current_context.as_deref().unwrap_or_default();
        if current_context.is_empty() {
            return Err(KubeselError::corrupt(path, "the current-context is unset"));
        }

        if current_context != MANAGED_CONTEXT_NAME {
            return Err(KubeselError::corrupt(
                path,
                "the current-context is not managed by kubesel",
            ));
        }

        let context_index = config
            .contexts
            .iter()
            .position(|named| named.name.as_deref() == Some(MANAGED_CONTEXT_NAME))
            .filter(|&index| config.contexts[index].context.is_some())
            .ok_or_else(|| {
                KubeselError::corrupt(path, format!("the {MANAGED_CONTEXT_NAME:?} context is missing"))
            })?;

        let extension = find_extension_from(MANAGED_EXTENSION_NAME, config).ok_or_else(|| {
            KubeselError::corrupt(path, format!("the {MANAGED_EXTENSION_NAME:?} extension is missing"))
        })?;

        if !extension.is(MANAGED_EXTENSION_API_VERSION, MANAGED_EXTENSION_KIND) {
            return Err(KubeselError::corrupt(
                path,
                format!("the {MANAGED_EXTENSION_NAME:?} extension has the wrong apiVersion or kind"),
            ));
        }

        let managed: ManagedByKubesel = decode_extension(extension).map_err(|e| {
            KubeselError::corrupt(path, format!("could not decode {MANAGED_EXTENSION_KIND}: {e}"))
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            owner: managed.owner,
            config: config.clone(),
            context_index,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn owner(&self) -> OwnerIdentity {
        self.owner
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cluster_name(&self) -> &str {
        self.context().and_then(|c| c.cluster.as_deref()).unwrap_or_default()
    }

    pub fn auth_info_name(&self) -> &str {
        self.context().and_then(|c| c.user.as_deref()).unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.context().and_then(|c| c.namespace.as_deref()).unwrap_or_default()
    }

    /// The name is not checked against the known clusters.
    pub fn set_cluster_name(&mut self, name: impl Into<String>) {
        self.context_mut().cluster = Some(name.into());
    }

    pub fn set_auth_info_name(&mut self, name: impl Into<String>) {
        self.context_mut().user = Some(name.into());
    }

    pub fn set_namespace(&mut self, name: impl Into<String>) {
        self.context_mut().namespace = Some(name.into());
    }

    /// Copies the cluster, user and namespace of the merged config's
    /// current context, which may be the overlay of a parent shell.
    pub fn inherit_from(&mut self, merged: &Config) {
        let current = merged
            .current_context
            .as_deref()
            .and_then(|name| find_context(name, merged));

        if let Some(current) = current {
            self.apply_context(current);
        }
    }

    /// Points the overlay at the cluster, user and namespace of another
    /// context. Fields the context leaves unset are kept.
    pub fn apply_context(&mut self, context: &Context) {
        let target = self.context_mut();
        if let Some(cluster) = &context.cluster {
            target.cluster = Some(cluster.clone());
        }
        if let Some(user) = &context.user {
            target.user = Some(user.clone());
        }
        if let Some(namespace) = &context.namespace {
            target.namespace = Some(namespace.clone());
        }
    }

    /// Atomically replaces the file on disk.
    ///
    /// The document is written to a hidden sibling file which is then renamed
    /// over the overlay, so readers see either the old or the new contents.
    pub fn save(&self) -> Result<(), KubeselError> {
        self.write_swap_file()?
            .persist(&self.path)
            .map_err(|e| KubeselError::io("replacing", &self.path, e.error))?;

        debug!(path = %self.path.display(), "Saved overlay");
        Ok(())
    }

    /// Writes the overlay to a path that must not exist yet.
    ///
    /// Fails with [`KubeselError::AlreadyManaged`] if something is already
    /// there, even when it appeared after the caller last checked.
    pub fn save_new(&self) -> Result<(), KubeselError> {
        match self.write_swap_file()?.persist_noclobber(&self.path) {
            Ok(_) => {}
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                return Err(KubeselError::AlreadyManaged(self.path.clone()));
            }
            Err(e) => return Err(KubeselError::io("creating", &self.path, e.error)),
        }

        debug!(path = %self.path.display(), "Saved new overlay");
        Ok(())
    }

    fn write_swap_file(&self) -> Result<NamedTempFile, KubeselError> {
        let contents = self.config.to_yaml_string()?;
        let dir = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut swap = tempfile::Builder::new()
            .prefix(SWAP_FILE_PREFIX)
            .suffix(SWAP_FILE_SUFFIX)
            .tempfile_in(dir)
            .map_err(|e| KubeselError::io("creating swap file in", dir, e))?;

        swap.write_all(contents.as_bytes())
            .map_err(|e| KubeselError::io("writing", swap.path(), e))?;
        swap.as_file()
            .sync_all()
            .map_err(|e| KubeselError::io("syncing", swap.path(), e))?;

        Ok(swap)
    }

    fn context(&self) -> Option<&Context> {
        self.config
            .contexts
            .get(self.context_index)
            .and_then(|named| named.context.as_ref())
    }

    fn context_mut(&mut self) -> &mut Context {
        self.config.contexts[self.context_index]
            .context
            .get_or_insert_with(Context::default)
    }
}

pub fn is_managed_context(context: &NamedContext) -> bool {
    context.name.as_deref() == Some(MANAGED_CONTEXT_NAME)
}
