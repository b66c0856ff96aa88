//! Common types shared by the store and the connection layer.
//!
//! - [`Value`] - the value kinds a document can hold
//! - [`SortOrder`] - sort direction for cursors
//! - constants for field names, DNS-over-HTTPS defaults and connection defaults

mod constants;
mod sort_order;
mod value;

pub use constants::*;
pub use sort_order::*;
pub use value::*;
