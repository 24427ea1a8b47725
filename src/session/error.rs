// session/error.rs
use std::env::JoinPathsError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::loader::PathError;

#[derive(Debug, Error)]
pub enum KubeselError {
    /// An overlay already exists for the owner. Callers may reuse it.
    #[error("already managing a kubeconfig file: {}", .0.display())]
    AlreadyManaged(PathBuf),

    #[error("managed kubeconfig file is invalid: {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("no kubesel-managed kubeconfig file")]
    Unmanaged,

    #[error("owner process does not exist: {0}")]
    OwnerProcessNotExist(u32),

    #[error("error {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error serializing kubeconfig: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("error finding kubeconfig files: {0}")]
    Paths(#[from] PathError),

    #[error("error checking process state: {0}")]
    Probe(#[source] io::Error),

    #[error("cannot find a data directory for kubesel")]
    NoDataDir,

    #[error("invalid kubeconfig search path: {0}")]
    InvalidSearchPath(#[from] JoinPathsError),
}

impl KubeselError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        KubeselError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        KubeselError::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, KubeselError::Corrupt { .. })
    }

    pub fn is_unmanaged(&self) -> bool {
        matches!(self, KubeselError::Unmanaged)
    }

    pub fn is_already_managed(&self) -> bool {
        matches!(self, KubeselError::AlreadyManaged(_))
    }
}
