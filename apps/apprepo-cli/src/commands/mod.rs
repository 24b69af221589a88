pub mod config;
pub mod manifest;

pub use config::ConfigCmd;
pub use manifest::ManifestCmd;
