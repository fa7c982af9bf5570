//! Configuration management for CatalogGen

pub mod config;
pub mod output;
pub mod source;

#[cfg(test)]
mod tests;

pub use config::{Config, CONFIG_VERSION, DEFAULT_CONFIG_FILES};
pub use output::{OutputConfig, OutputFormat};
pub use source::Source;
