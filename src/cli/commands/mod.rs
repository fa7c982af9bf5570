//! CLI command modules

pub mod generate;
pub mod init;
pub mod validate;
