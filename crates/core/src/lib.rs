pub mod config;
pub mod error;
pub mod filters;
pub mod registry;
pub mod tags;
pub mod types;

pub use config::{load_site_config, parse_site_toml};
pub use error::{Error, Result};
pub use registry::{Filter, FilterRegistry};
pub use tags::{DENYLIST, collect_tags, filter_denylist};
pub use types::*;
