//! Storage for profiles, topics and topic templates.
//!
//! - [`catalog`] keeps profiles, their topics and devices in memory and
//!   enforces ownership and the single-default-profile rule.
//! - [`template_store`] reads and writes topic template sets as TOML files.

pub mod catalog;
pub mod template_store;

pub use catalog::{Catalog, CatalogError, CatalogResult, UserId};
pub use template_store::{load_templates, save_templates, StoreError, TemplateSet};
