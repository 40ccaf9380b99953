//! Domain Entities
//!
//! Core business objects with identity and lifecycle.

mod alert_record;
mod face;
mod frame;
mod threat;
mod watchlist_entry;

pub use alert_record::*;
pub use face::*;
pub use frame::*;
pub use threat::*;
pub use watchlist_entry::*;
