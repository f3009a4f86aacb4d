//! Mapping table: which inbound API paths are converted to which provider,
//! and through which named transforms.

pub mod load;
pub mod schema;
pub mod transform;
pub mod types;

pub use load::*;
pub use schema::*;
pub use transform::*;
pub use types::*;
