//! apiquery protocol types.
//!
//! This crate defines the caller-facing types of the entity access engine.
//!
//! # Modules
//!
//! - [`value`] - Scalar values and primary keys
//! - [`options`] - Typed `get` options
//! - [`result`] - Result entities, keyed maps and counts
//! - [`error`] - Value decoding errors

pub mod error;
pub mod options;
pub mod result;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root
pub use options::{GetOptions, Output, Search, Select, SortOrder, SortSpec};
pub use result::{Entity, EntityMap, FieldValue, GetResult, GroupCount};
pub use value::{Key, Value};

/// Output keyword selecting every column.
pub const OUTPUT_EXTEND: &str = "extend";

/// Output keyword selecting a related-object count.
pub const OUTPUT_COUNT: &str = "count";

/// Column name carrying counts in count-mode rows.
pub const ROWS_COUNT: &str = "rowscount";
