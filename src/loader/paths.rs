// loader/paths.rs
//
// Resolves the kubeconfig search path the same way kubectl does.
// https://kubernetes.io/docs/concepts/configuration/organize-cluster-access-kubeconfig/#the-kubeconfig-environment-variable
use std::env;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const KUBECONFIG_ENV_VAR: &str = "KUBECONFIG";
pub const DEFAULT_KUBE_DIR_NAME: &str = ".kube";
pub const DEFAULT_KUBECONFIG_FILE_NAME: &str = "config";

#[derive(Debug, Error)]
pub enum PathError {
    #[error("cannot find .kube directory: {0}")]
    NoKubeDir(&'static str),
}

/// What the Windows home-directory search needs to know about a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStat {
    pub owner_writable: bool,
}

/// Returns the kubeconfig files to load, in declaration order.
///
/// `KUBECONFIG` is split with the platform path-list separator, skipping
/// empty entries. When the variable is unset, the default
/// `<home>/.kube/config` file is used.
pub fn find_kubeconfig_files() -> Result<Vec<PathBuf>, PathError> {
    match env::var_os(KUBECONFIG_ENV_VAR) {
        Some(value) => Ok(split_kubeconfig_var(&value)),
        None => Ok(vec![find_default_kubeconfig_file()?]),
    }
}

pub fn split_kubeconfig_var(value: &OsStr) -> Vec<PathBuf> {
    env::split_paths(value)
        .filter(|path| !path.as_os_str().is_empty())
        .collect()
}

pub fn find_default_kubeconfig_file() -> Result<PathBuf, PathError> {
    Ok(find_default_kube_dir()?.join(DEFAULT_KUBECONFIG_FILE_NAME))
}

pub fn find_default_kube_dir() -> Result<PathBuf, PathError> {
    let lookup_env = |name: &str| env::var_os(name);
    if cfg!(windows) {
        find_default_kube_dir_windows(lookup_env, stat_path)
    } else {
        find_default_kube_dir_posix(lookup_env)
    }
}

/// `$HOME/.kube`. Unlike kubectl, an unset `$HOME` is an error rather than
/// an empty path.
pub fn find_default_kube_dir_posix<E>(lookup_env: E) -> Result<PathBuf, PathError>
where
    E: Fn(&str) -> Option<OsString>,
{
    let home = lookup_env("HOME").ok_or(PathError::NoKubeDir("$HOME environment variable undefined"))?;
    Ok(PathBuf::from(home).join(DEFAULT_KUBE_DIR_NAME))
}

/// Picks the home directory the way client-go's `homedir.HomeDir` does on
/// Windows:
///
/// 1. the first of `%HOME%`, `%HOMEDRIVE%%HOMEPATH%`, `%USERPROFILE%`
///    containing `.kube\config`;
/// 2. the first owner-writable of `%HOME%`, `%USERPROFILE%`,
///    `%HOMEDRIVE%%HOMEPATH%`;
/// 3. the first existing one, in that same order.
pub fn find_default_kube_dir_windows<E, S>(lookup_env: E, stat: S) -> Result<PathBuf, PathError>
where
    E: Fn(&str) -> Option<OsString>,
    S: Fn(&Path) -> Option<PathStat>,
{
    #[derive(Default)]
    struct Candidate {
        path: Option<PathBuf>,
        has_kubeconfig: bool,
        exists: bool,
        writable: bool,
    }

    let non_empty = |name: &str| lookup_env(name).filter(|value| !value.is_empty());

    let mut from_home = Candidate {
        path: non_empty("HOME").map(PathBuf::from),
        ..Default::default()
    };
    let mut from_drive_home = Candidate {
        path: non_empty("HOMEDRIVE")
            .zip(non_empty("HOMEPATH"))
            .map(|(drive, path)| PathBuf::from(drive).join(path)),
        ..Default::default()
    };
    let mut from_user_profile = Candidate {
        path: non_empty("USERPROFILE").map(PathBuf::from),
        ..Default::default()
    };

    for candidate in [&mut from_home, &mut from_drive_home, &mut from_user_profile] {
        let Some(path) = &candidate.path else {
            continue;
        };

        let kubeconfig = path.join(DEFAULT_KUBE_DIR_NAME).join(DEFAULT_KUBECONFIG_FILE_NAME);
        if stat(&kubeconfig).is_some() {
            candidate.has_kubeconfig = true;
            continue;
        }

        if let Some(info) = stat(path) {
            candidate.exists = true;
            candidate.writable = info.owner_writable;
        }
    }

    let kube_dir = |candidate: &Candidate| candidate.path.as_ref().map(|p| p.join(DEFAULT_KUBE_DIR_NAME));

    for candidate in [&from_home, &from_drive_home, &from_user_profile] {
        if candidate.has_kubeconfig {
            return kube_dir(candidate).ok_or(PathError::NoKubeDir("no home directory candidate"));
        }
    }

    let dir_order = [&from_home, &from_user_profile, &from_drive_home];
    let found = dir_order
        .iter()
        .find(|candidate| candidate.writable)
        .or_else(|| dir_order.iter().find(|candidate| candidate.exists));

    found
        .and_then(|candidate| kube_dir(*candidate))
        .ok_or(PathError::NoKubeDir("no home directory candidate exists"))
}

fn stat_path(path: &Path) -> Option<PathStat> {
    let metadata = fs::metadata(path).ok()?;
    Some(PathStat {
        owner_writable: owner_writable(&metadata),
    })
}

#[cfg(unix)]
fn owner_writable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o200 != 0
}

#[cfg(not(unix))]
fn owner_writable(metadata: &fs::Metadata) -> bool {
    !metadata.permissions().readonly()
}
