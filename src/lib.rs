pub mod aggregator;
pub mod config;
pub mod fetcher;
pub mod normalizer;
pub mod types;
pub mod writer;

pub use aggregator::{Aggregator, DEFAULT_WORKERS};
pub use config::{fill_with_defaults, load_document, parse_document};
pub use fetcher::{FetchSource, Fetcher};
pub use normalizer::Normalizer;
pub use types::*;
pub use writer::write_channel;
