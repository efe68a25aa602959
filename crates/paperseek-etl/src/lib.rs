//! ETL pipeline stages for paperseek.
//!
//! Implements the load, embed, and index stages as treadle `Stage`
//! implementations, plus the dataset sources and seeded sampling they use.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod dataset;
pub mod embed;
pub mod error;
pub mod index;
pub mod load;
pub mod pipeline;
pub mod resilience;
pub mod sample;
pub mod work_item;

pub use config::Config;
pub use dataset::{DatasetSource, HubDataset, JsonlDataset, RawRow};
pub use embed::EmbedStage;
pub use error::{EtlError, EtlResult};
pub use index::IndexStage;
pub use load::LoadStage;
pub use pipeline::build_pipeline;
pub use work_item::IngestJob;
