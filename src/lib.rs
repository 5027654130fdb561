pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{http::router, memory::MemoryStore, sqlite::SqliteStore};
pub use config::toml_config::TomlConfig;
pub use crate::core::handler::PatchHandler;
pub use utils::error::{PatchError, Result};
