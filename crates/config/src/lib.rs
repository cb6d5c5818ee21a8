// Configuration loading

pub mod error;
pub mod settings;

pub use error::ConfigError;
pub use settings::{
    FetchSettings, GlazingSettings, PathSettings, Settings, SyncSettings, WindowSettings,
    WorksSettings, ROLLUP_SHEET,
};
