//! Finding and loading the kubeconfig files named by the search path.
mod load;
mod paths;

pub use load::{
    load_from_file, load_from_reader, load_multiple_files, LoadError, LoadedKubeconfig,
    LoadedKubeconfigCollection,
};
pub use paths::{
    find_default_kube_dir, find_default_kube_dir_posix, find_default_kube_dir_windows,
    find_default_kubeconfig_file, find_kubeconfig_files, split_kubeconfig_var, PathError,
    PathStat, DEFAULT_KUBECONFIG_FILE_NAME, DEFAULT_KUBE_DIR_NAME, KUBECONFIG_ENV_VAR,
};
