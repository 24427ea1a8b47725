// session/data_dir.rs
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

pub const KUBESEL_DIR_NAME: &str = "kubesel";
pub const SESSIONS_DIR_NAME: &str = "sessions";

/// Returns the user's data directory, following `$XDG_DATA_HOME` when set.
///
/// Command-line tools on macOS behave like they do on Linux, so
/// `~/.local/share` is used there instead of `~/Library/Application Support`.
pub fn find_data_home_dir() -> Option<PathBuf> {
    data_home_dir_from(
        env::var_os("XDG_DATA_HOME"),
        cfg!(target_os = "macos"),
        dirs::home_dir,
        dirs::data_dir,
    )
}

/// Returns `<data>/kubesel`.
pub fn find_kubesel_data_dir() -> Option<PathBuf> {
    find_data_home_dir().map(|dir| dir.join(KUBESEL_DIR_NAME))
}

fn data_home_dir_from(
    xdg_data_home: Option<OsString>,
    is_macos: bool,
    home_dir: impl FnOnce() -> Option<PathBuf>,
    platform_data_dir: impl FnOnce() -> Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(dir) = xdg_data_home.filter(|dir| !dir.is_empty()) {
        return Some(PathBuf::from(dir));
    }

    if is_macos {
        return home_dir().map(|home| home.join(".local").join("share"));
    }

    platform_data_dir()
}
