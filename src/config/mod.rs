mod settings;

pub use settings::{BackgroundGcSettings, Settings, SETTINGS_FILE_NAME};
