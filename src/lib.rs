pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::config::{cli::LocalStorage, toml_config::TomlConfig};
pub use crate::core::{
    catalog::{FieldCatalog, SelectionSet},
    codec::TabularCodec,
    etl::{read_upload, EnrichmentEngine, RunReport},
    lookup::LookupClient,
    pipeline::EnrichmentPipeline,
    status::{JobStatus, JobTracker},
};
pub use crate::utils::error::{EnrichError, Result};
