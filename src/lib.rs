//! # Sift
//!
//! Composable boolean filters for data-browsing screens.
//!
//! Sift provides:
//! - Filter trees of AND/OR groups over column-operator-value expressions
//! - Column catalogs that decide which operators each column accepts
//! - A start/modify/finish/discard edit protocol with draft isolation
//! - A project-scoped registry of independent filter slots
//! - JSON search payloads ready for a search backend
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sift::prelude::*;
//!
//! # async fn run() -> FilterResult<()> {
//! let config = SiftConfig::from_file("sift.toml")?;
//! sift::logging::init_from_config(&config.logging);
//!
//! let registry = FilterRegistry::new(config.registry_config());
//! registry.set_project(ProjectId::new(1));
//!
//! let catalogs = StaticCatalogService::new();
//! catalogs.register(1i64, "documents", vec![
//!     ColumnInfo::new("Filename", "filename", OperatorFamily::String).sortable(),
//! ]);
//! registry.load_catalog("documents", &catalogs).await?;
//!
//! registry.slot("documents").with(|slot| -> FilterResult<()> {
//!     slot.start_edit("documents");
//!     slot.finish_edit()?;
//!     Ok(())
//! })?;
//!
//! let request = registry.request("documents", "documents", vec![SortSpec::asc("filename")])?;
//! println!("{}", request.to_json()?);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use sift_query::*;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use sift_query::prelude::*;
    pub use sift_query::{SiftConfig, StaticCatalogService};
}
