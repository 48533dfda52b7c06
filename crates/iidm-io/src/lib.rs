//! # iidm-io: Versioned IIDM Codec
//!
//! Reads and writes [`iidm_core::Network`] documents in the IIDM exchange format, either
//! XML (`.xiidm`) or JSON (`.jiidm`), for every format version from 1.0 to 1.12.
//!
//! ## Quick Start: Convert a Document to an Older Version
//!
//! ```rust,no_run
//! use iidm_io::{read_from_path, write_to_path, ExportOptions, IidmVersion, ImportOptions};
//!
//! fn main() -> iidm_core::IidmResult<()> {
//!     let network = read_from_path("grid.xiidm", &ImportOptions::default())?;
//!     let options = ExportOptions::default().with_version(IidmVersion::V_1_8);
//!     write_to_path(&network, "grid_1_8.xiidm", &options)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Versioning
//!
//! Every attribute or element that was introduced, removed or renamed by a format version is
//! declared once in [`gating`]. Codecs go through those gates, so writing a value that an
//! older version cannot express fails with [`iidm_core::IidmError::UnsupportedVersion`]
//! instead of silently dropping it.
//!
//! ## Module Overview
//!
//! - [`network`] - Document driver, data sources and format detection
//! - [`codec`] - Per-kind element codecs
//! - [`tree`] - XML and JSON tree readers and writers behind one pair of traits
//! - [`extensions`] - Extension codec registry and built-in extensions
//! - [`validate`] - Structural validation against the per-version element rules
//! - [`anonymizer`] - Reversible identifier anonymization
//! - [`options`] - Export and import options

pub mod anonymizer;
pub mod bus_filter;
pub mod codec;
pub mod context;
pub mod deferred;
pub mod extensions;
pub mod gating;
pub mod network;
pub mod options;
pub mod tree;
pub mod validate;
pub mod version;

pub use anonymizer::{Anonymizer, SimpleAnonymizer};
pub use extensions::{ExtensionRegistry, ExtensionSerDe};
pub use network::{
    copy, detect_format, export, export_with_registry, import, import_with_registry, read, read_from_path,
    read_from_path_with_registry, read_with, write, write_to_path, write_to_path_with_registry,
    write_with_registry, DataSource,
};
pub use options::{ExportOptions, ImportOptions, TopologyLevel};
pub use tree::TreeDataFormat;
pub use validate::{validate, validate_path};
pub use version::IidmVersion;
