//! Per-shell kubeconfig overlays.
//!
//! kubesel gives every shell its own kubeconfig file, placed in front of the
//! shared ones in `KUBECONFIG`. Changing the cluster, user or namespace in
//! one shell edits only that shell's overlay.
pub mod config;
pub mod kubeconfig;
pub mod loader;
pub mod parallel;
pub mod session;
pub mod utils;

pub use session::{Kubesel, KubeselError, Overlay, OwnerIdentity};
