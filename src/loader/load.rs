// loader/load.rs
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::kubeconfig::{merge_config, Config};
use crate::parallel::Ordered;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read error: {0}")]
    Read(#[source] io::Error),
    #[error("parse error: {0}")]
    Parse(#[source] serde_yaml::Error),
}

/// A kubeconfig file read from disk (or a stream).
///
/// If reading or parsing failed, `errors` is non-empty and `config` is empty.
#[derive(Debug, Default)]
pub struct LoadedKubeconfig {
    pub path: PathBuf,
    pub config: Config,
    pub errors: Vec<LoadError>,
}

impl LoadedKubeconfig {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Every loaded file in declaration order, plus the result of merging them.
#[derive(Debug, Default)]
pub struct LoadedKubeconfigCollection {
    pub configs: Vec<LoadedKubeconfig>,
    pub merged: Config,
}

impl LoadedKubeconfigCollection {
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.configs.iter().map(|kc| kc.path.as_path())
    }
}

/// Loads the files concurrently and merges them in the order given.
///
/// A file that fails to load keeps its slot, records the error, and
/// contributes nothing to the merge.
pub async fn load_multiple_files(files: Vec<PathBuf>) -> LoadedKubeconfigCollection {
    let mut result = LoadedKubeconfigCollection {
        configs: Vec::with_capacity(files.len()),
        merged: Config::default(),
    };

    let mut ordered = Ordered::spawn(files, |file: PathBuf| load_from_file(&file));
    while let Some((index, loaded)) = ordered.next().await {
        debug!(
            index,
            path = %loaded.path.display(),
            errors = loaded.errors.len(),
            "Loaded kubeconfig"
        );

        result.merged = merge_config(&result.merged, &loaded.config);
        result.configs.push(loaded);
    }

    result
}

/// Reads and parses a kubeconfig file.
pub fn load_from_file(path: &Path) -> LoadedKubeconfig {
    let mut loaded = match File::open(path) {
        Ok(file) => load_from_reader(file),
        Err(e) => LoadedKubeconfig {
            errors: vec![LoadError::Read(e)],
            ..Default::default()
        },
    };

    loaded.path = path.to_path_buf();
    loaded
}

/// Reads and parses a kubeconfig document from a stream. The returned
/// [`LoadedKubeconfig`] has an empty path.
pub fn load_from_reader<R: Read>(mut reader: R) -> LoadedKubeconfig {
    let mut buffer = Vec::new();
    if let Err(e) = reader.read_to_end(&mut buffer) {
        return LoadedKubeconfig {
            errors: vec![LoadError::Read(e)],
            ..Default::default()
        };
    }

    match Config::from_slice(&buffer) {
        Ok(config) => LoadedKubeconfig {
            config,
            ..Default::default()
        },
        Err(e) => LoadedKubeconfig {
            errors: vec![LoadError::Parse(e)],
            ..Default::default()
        },
    }
}
