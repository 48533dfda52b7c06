//! Unified error type for the IIDM model and codec
//!
//! Every fallible operation of the workspace returns [`IidmResult`]. The variants follow
//! the failure taxonomy of a document pass: version incompatibilities, unknown elements,
//! unresolved references, extension namespace problems, missing extension codecs and
//! structural validation failures all abort the pass.
//!
//! # Example
//!
//! ```ignore
//! use iidm_core::{IidmError, IidmResult};
//!
//! fn read_case(path: &str) -> IidmResult<Network> {
//!     let network = iidm_io::read_from_path(path, &ImportOptions::default())?;
//!     Ok(network)
//! }
//! ```

use std::fmt;

use thiserror::Error;

/// One structural violation found while validating a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Slash separated element path, e.g. `network/substation[S1]/voltageLevel`.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Which namespace axis two extension codecs collide on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceAxis {
    Uri,
    Prefix,
}

impl fmt::Display for NamespaceAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamespaceAxis::Uri => write!(f, "URI"),
            NamespaceAxis::Prefix => write!(f, "prefix"),
        }
    }
}

/// Unified error type for all IIDM operations.
#[derive(Error, Debug)]
pub enum IidmError {
    /// I/O errors (file access, pipes)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed document or attribute value
    #[error("Parse error: {0}")]
    Parse(String),

    /// Field or element used outside of its version window
    #[error("{0}")]
    UnsupportedVersion(String),

    /// Unrecognized tag under a known parent
    #[error("Unknown element name '{element}' in '{parent}'")]
    UnknownElement { element: String, parent: String },

    /// A reference that could not be resolved once the whole document was read
    #[error("Dangling reference to '{0}'")]
    DanglingReference(String),

    /// Two extension codecs share a namespace URI or prefix
    #[error("Extension namespace {axis} collision: {value}")]
    NamespaceCollision { axis: NamespaceAxis, value: String },

    /// Extensions without a registered codec
    #[error("Extensions {0:?} not found")]
    MissingExtensionSerializer(Vec<String>),

    /// Document does not conform to the versioned schema
    #[error("Structural validation failed with {} violation(s): {}", .0.len(), join_violations(.0))]
    StructuralValidation(Vec<Violation>),

    /// Anonymized token absent from the mapping
    #[error("Unmapped anonymized identifier '{0}'")]
    UnmappedToken(String),

    /// Network consistency errors (duplicate ids, unknown containers)
    #[error("Network error: {0}")]
    Network(String),

    /// Equipment-local validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using IidmError.
pub type IidmResult<T> = Result<T, IidmError>;

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<anyhow::Error> for IidmError {
    fn from(err: anyhow::Error) -> Self {
        IidmError::Other(err.to_string())
    }
}

impl From<String> for IidmError {
    fn from(s: String) -> Self {
        IidmError::Other(s)
    }
}

impl From<&str> for IidmError {
    fn from(s: &str) -> Self {
        IidmError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for IidmError {
    fn from(err: serde_json::Error) -> Self {
        IidmError::Parse(err.to_string())
    }
}
