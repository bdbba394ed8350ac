//! Configuration loaded from `guardian.toml`.

pub mod settings;

pub use settings::Settings;
