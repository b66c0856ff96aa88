//! The embedded document store.
//!
//! When the remote database cannot be reached, the connection manager falls
//! back to this in-process store. It emulates the collection-level behavior
//! application code relies on: filters, update operators, unique indexes and
//! lazy cursors. Nothing is persisted.
//!
//! - [`EmbeddedDatabase`] - lazily created named collections
//! - [`EmbeddedCollection`] - one lock-guarded collection
//! - [`EmbeddedStoreCache`] - stores tagged with a seed version
//! - [`Seeder`] - populates a freshly built store

mod embedded_collection;
mod embedded_database;
mod seeder;
mod store_cache;

pub use embedded_collection::*;
pub use embedded_database::*;
pub use seeder::*;
pub use store_cache::*;
