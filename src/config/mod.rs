//! Configuration module for the audit engine
//!
//! A single structured configuration value with an enumerated set of
//! recognized options per component. Unknown keys in a config file are
//! ignored; missing keys fall back to documented defaults.

mod parser;
mod types;
mod validation;

pub use parser::load_config;
pub use types::{AuditConfig, CrawlConfig, FilterConfig, HttpConfig, SitemapConfig};
pub use validation::validate;
