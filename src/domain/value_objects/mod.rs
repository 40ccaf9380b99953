//! Value Objects
//!
//! Immutable domain objects defined by their attributes rather than identity.

mod bounding_box;
mod embedding;

pub use bounding_box::*;
pub use embedding::*;
