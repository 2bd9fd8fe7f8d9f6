//! Scripture reference to printed page number conversion.
//!
//! A free-text reference such as "Matthew 5:1-7:10" is parsed against the
//! 66-book canon, expanded to verse ids, and resolved to pages either from
//! a page dataset or by estimate.

pub mod books;
pub mod canon;
pub mod converter;
pub mod dataset;
pub mod error;
pub mod estimator_config;
pub mod logger;
pub mod models;
pub mod page_map;
pub mod parser;
pub mod resolver;
pub mod schema;
