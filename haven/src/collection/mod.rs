//! Documents, collections and database handles.
//!
//! # Documents
//!
//! A [`Document`] is an insertion-ordered map from field names to
//! [`crate::common::Value`]s. Nested fields are addressed with dot paths.
//!
//! ```rust,ignore
//! use haven::collection::Document;
//!
//! let mut doc = Document::new();
//! doc.put("name", "Harbor Lights")?;
//! doc.put("stats.views", 10)?;
//! ```
//!
//! # Collections
//!
//! A [`Collection`] is the uniform handle application code uses, whether the
//! data lives in the remote database or in the embedded store:
//!
//! ```rust,ignore
//! use haven::doc;
//! use haven::collection::ReturnDocument;
//!
//! let stories = db.collection("stories")?;
//! let inserted = stories.insert_one(&doc! { "slug": "intro", "views": 0 })?;
//! let after = stories.find_one_and_update(
//!     &doc! { "_id": (inserted.inserted_id) },
//!     &doc! { "$inc": { "views": 1 } },
//!     ReturnDocument::After,
//! )?;
//! ```
//!
//! # Document IDs
//!
//! Each stored document has a unique `_id` field. When a document is inserted
//! without one, a [`DocumentId`] is generated with a Snowflake algorithm.

mod cursor;
mod database;
mod document;
mod document_collection;
mod document_id;
mod find_options;
mod results;
pub(crate) mod snowflake;
mod update;

pub use cursor::*;
pub use database::*;
pub use document::*;
pub use document_collection::*;
pub use document_id::*;
pub use find_options::*;
pub use results::*;
pub use update::*;
