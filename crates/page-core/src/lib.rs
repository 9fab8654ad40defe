//! page-core: types shared by the page format library and its CLI
//!
//! - `error`: the four-kind error taxonomy (usage, format, key recovery, integrity)
//! - `config`: `page.toml` schema with per-section defaults

pub mod config;
pub mod error;

pub use config::PageConfig;
pub use error::{ErrorKind, PageError, PageResult};
