//! Query filters for selecting documents from collections.
//!
//! A filter is either parsed from a query document once at the API boundary
//! or built with the fluent helpers:
//!
//! ```rust,ignore
//! use haven::doc;
//! use haven::filter::{field, text, Filter};
//!
//! let parsed = Filter::parse(&doc! { "status": { "$in": ["draft", "published"] } })?;
//! let fluent = field("status").in_array(vec!["draft", "published"]);
//! assert_eq!(parsed, fluent);
//!
//! let search = text("lighthouse").and(field("status").eq("published"));
//! ```
//!
//! # Supported Operators
//!
//! - **Equality**: literal values and `$eq`
//! - **Membership**: `$in`
//! - **Text**: `$text: {$search: ..}`
//! - **Logical**: `$and`, and implicit conjunction of several fields
//!
//! Anything else is rejected with [`crate::errors::ErrorKind::InvalidFilter`].

#[allow(clippy::module_inception)]
mod filter;
mod fluent;

pub use filter::*;
pub use fluent::*;
