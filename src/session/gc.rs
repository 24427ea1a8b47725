// session/gc.rs
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{Kubesel, KubeselError, Overlay, ProcessProbe};
use crate::loader::{load_from_file, LoadError};

const OVERLAY_EXTENSION: &str = "yaml";

/// Caps for a single collection pass. Zero means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GarbageCollectOptions {
    pub max_files_to_check: usize,
    pub max_files_to_delete: usize,
}

impl GarbageCollectOptions {
    /// Checks every overlay file.
    pub fn exhaustive() -> Self {
        Self::default()
    }

    pub fn bounded(max_files_to_check: usize, max_files_to_delete: usize) -> Self {
        Self {
            max_files_to_check,
            max_files_to_delete,
        }
    }
}

/// Outcome of a collection pass. Per-file errors do not make the pass a
/// failure.
#[derive(Debug, Default)]
pub struct GarbageCollectResult {
    pub files_checked: Vec<PathBuf>,
    pub files_deleted: Vec<PathBuf>,
    pub errors: Vec<GcFileError>,
}

#[derive(Debug, Error)]
#[error("gc error: {}: {source}", path.display())]
pub struct GcFileError {
    pub path: PathBuf,
    #[source]
    pub source: KubeselError,
}

impl Kubesel {
    /// Removes overlay files whose owner is no longer alive.
    pub fn garbage_collect(&self, opts: &GarbageCollectOptions) -> Result<GarbageCollectResult, KubeselError> {
        self.ensure_sessions_dir_exists()?;
        let result = garbage_collect_dir(self.sessions_dir(), self.probe(), opts)?;

        info!(
            checked = result.files_checked.len(),
            deleted = result.files_deleted.len(),
            errors = result.errors.len(),
            "Garbage collected overlay files"
        );
        Ok(result)
    }
}

/// Collects overlay files in `dir`, visiting them in random order.
///
/// Only listing the directory can fail. Problems with individual files are
/// recorded in the result and the file is left alone.
pub fn garbage_collect_dir(
    dir: &Path,
    probe: &dyn ProcessProbe,
    opts: &GarbageCollectOptions,
) -> Result<GarbageCollectResult, KubeselError> {
    let mut candidates = list_candidates(dir)?;
    candidates.shuffle(&mut rand::thread_rng());

    let max_checked = cap(opts.max_files_to_check);
    let max_deleted = cap(opts.max_files_to_delete);
    let mut result = GarbageCollectResult::default();

    for path in candidates {
        if result.files_checked.len() >= max_checked || result.files_deleted.len() >= max_deleted {
            break;
        }

        result.files_checked.push(path.clone());
        let removable = match can_garbage_collect(&path, probe) {
            Ok(removable) => removable,
            Err(source) => {
                warn!(path = %path.display(), error = %source, "Skipping overlay file");
                result.errors.push(GcFileError { path, source });
                continue;
            }
        };

        if !removable {
            debug!(path = %path.display(), "Keeping overlay file");
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted overlay file");
                result.files_deleted.push(path);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Overlay file already deleted");
            }
            Err(e) => {
                let source = KubeselError::io("deleting", &path, e);
                warn!(path = %path.display(), error = %source, "Failed to delete overlay file");
                result.errors.push(GcFileError { path, source });
            }
        }
    }

    Ok(result)
}

fn cap(max: usize) -> usize {
    if max == 0 {
        usize::MAX
    } else {
        max
    }
}

fn list_candidates(dir: &Path) -> Result<Vec<PathBuf>, KubeselError> {
    let entries = fs::read_dir(dir).map_err(|e| KubeselError::io("listing", dir, e))?;

    let mut candidates = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| KubeselError::io("listing", dir, e))?.path();
        if path.extension().is_some_and(|ext| ext == OVERLAY_EXTENSION) {
            candidates.push(path);
        }
    }

    Ok(candidates)
}

/// Decides whether an overlay file may be deleted.
///
/// Files that fail to parse or don't look like an overlay are deletable.
/// Well-formed overlays are deletable once their owner is dead. A file that
/// disappeared before it could be read is not.
fn can_garbage_collect(path: &Path, probe: &dyn ProcessProbe) -> Result<bool, KubeselError> {
    let mut loaded = load_from_file(path);

    let read_error = loaded.errors.iter().position(|e| matches!(e, LoadError::Read(_)));
    if let Some(LoadError::Read(e)) = read_error.map(|index| loaded.errors.swap_remove(index)) {
        if e.kind() == io::ErrorKind::NotFound {
            return Ok(false);
        }
        return Err(KubeselError::io("reading", path, e));
    }

    match Overlay::from_loaded(&loaded) {
        Ok(overlay) => Ok(!overlay.owner().is_alive(probe)?),
        Err(e) if e.is_corrupt() => {
            debug!(path = %path.display(), reason = %e, "Overlay file is corrupt");
            Ok(true)
        }
        Err(e) => Err(e),
    }
}
