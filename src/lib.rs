pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::HttpImageDownloader;
pub use config::{cli::LocalStorage, toml_config::TomlConfig, ImagePolicy, PluginOptions};
pub use core::documents_to_nodes::{documents_to_nodes, DocumentsToNodesEnvironment};
pub use core::engine::{parse_documents, SourceEngine, SourceSummary};
pub use core::environment::MemoryEnvironment;
pub use core::normalizers::DefaultNormalizers;
pub use utils::error::{PrismicError, Result};
