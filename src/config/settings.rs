// config/settings.rs
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::session::GarbageCollectOptions;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// User settings, stored as JSON in kubesel's data directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    pub background_gc: BackgroundGcSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

/// Opportunistic garbage collection run after ordinary commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BackgroundGcSettings {
    pub enabled: bool,
    /// Runs once every `chance` invocations, on average.
    pub chance: u32,
    pub max_files_to_check: usize,
    pub max_files_to_delete: usize,
}

impl Default for BackgroundGcSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            chance: 20,
            max_files_to_check: 10,
            max_files_to_delete: 5,
        }
    }
}

impl BackgroundGcSettings {
    pub fn options(&self) -> GarbageCollectOptions {
        GarbageCollectOptions::bounded(self.max_files_to_check, self.max_files_to_delete)
    }

    pub fn should_run<R: Rng>(&self, rng: &mut R) -> bool {
        self.enabled && rng.gen_range(0..self.chance.max(1)) == 0
    }
}

impl Settings {
    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(SETTINGS_FILE_NAME)
    }

    pub fn load_from_file(path: &Path) -> io::Result<Self> {
        let settings_str = fs::read_to_string(path)?;
        serde_json::from_str(&settings_str).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Like [`Settings::load_from_file`], but a missing file gives the defaults.
    pub fn load_or_default(path: &Path) -> io::Result<Self> {
        match Self::load_from_file(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            result => result,
        }
    }

    pub fn validate(&self) -> io::Result<()> {
        if self.background_gc.chance == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "background-gc.chance must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_or_default(&Settings::path_in(dir.path())).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.background_gc.enabled);
        assert_eq!(settings.background_gc.chance, 20);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = Settings::path_in(dir.path());
        fs::write(&path, r#"{"background-gc": {"max-files-to-check": 3}, "log-file": "/tmp/kubesel.log"}"#).unwrap();

        let settings = Settings::load_from_file(&path).unwrap();
        assert_eq!(settings.background_gc.max_files_to_check, 3);
        assert_eq!(settings.background_gc.max_files_to_delete, 5);
        assert_eq!(settings.log_file, Some(PathBuf::from("/tmp/kubesel.log")));
    }

    #[test]
    fn malformed_file_is_invalid_data() {
        let dir = TempDir::new().unwrap();
        let path = Settings::path_in(dir.path());
        fs::write(&path, "{not json").unwrap();

        let err = Settings::load_or_default(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn serialized_settings_load_back() {
        let dir = TempDir::new().unwrap();
        let path = Settings::path_in(dir.path());
        let mut settings = Settings::default();
        settings.background_gc.enabled = false;

        let contents = serde_json::to_string_pretty(&settings).unwrap();
        assert!(contents.contains("\"background-gc\""));
        fs::write(&path, contents).unwrap();
        assert_eq!(Settings::load_from_file(&path).unwrap(), settings);
    }

    #[test]
    fn zero_chance_is_rejected() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());
        settings.background_gc.chance = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn background_gc_roll() {
        let mut rng = StepRng::new(0, 0);
        let always = BackgroundGcSettings {
            chance: 1,
            ..Default::default()
        };
        assert!(always.should_run(&mut rng));

        let disabled = BackgroundGcSettings {
            enabled: false,
            chance: 1,
            ..Default::default()
        };
        assert!(!disabled.should_run(&mut rng));

        let options = BackgroundGcSettings::default().options();
        assert_eq!(options, GarbageCollectOptions::bounded(10, 5));
    }
}
