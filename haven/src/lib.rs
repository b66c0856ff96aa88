//! # Haven - a resilient document data layer
//!
//! Haven hands application code a working document database handle even
//! when the normal path to the remote database is blocked or absent.
//!
//! ## Key Features
//!
//! - **DNS-over-HTTPS discovery**: SRV, TXT and A records are resolved over
//!   HTTPS when plain DNS to the database provider is filtered
//! - **Connection-string expansion**: `mongodb+srv://` URIs become direct
//!   multi-host URIs
//! - **Embedded fallback**: an in-process document store with filters,
//!   update operators, unique indexes and lazy cursors
//! - **One entry point**: concurrent callers share a single connection
//!   attempt and receive the same handle
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use haven::connection::ConnectionManager;
//! use haven::collection::ReturnDocument;
//! use haven::doc;
//!
//! let manager = ConnectionManager::builder()
//!     .database_uri("mongodb+srv://cluster0.abc.mongodb.net/")
//!     .database_name("stories")
//!     .open()?;
//!
//! let db = manager.get_database().await;
//! let stories = db.collection("stories")?;
//! stories.insert_one(&doc! { "slug": "intro", "views": 0 })?;
//!
//! let updated = stories.find_one_and_update(
//!     doc! { "slug": "intro" },
//!     doc! { "$inc": { "views": 1 } },
//!     ReturnDocument::After,
//! )?;
//! ```
//!
//! ## Design Pattern
//!
//! Handles such as [`connection::ConnectionManager`],
//! [`collection::Database`] and [`collection::Collection`] follow the PIMPL
//! pattern: a thin public type around an `Arc` of the implementation. Clones
//! are cheap and share state.
//!
//! ## Module Organization
//!
//! - [`collection`] - documents, collection and database handles, cursors
//! - [`common`] - values and constants
//! - [`connection`] - the connection manager and the remote driver seam
//! - [`dns`] - DNS-over-HTTPS resolution and SRV expansion
//! - [`errors`] - error types and result definitions
//! - [`filter`] - query filters
//! - [`index`] - index descriptors and options
//! - [`store`] - the embedded document store
//! - [`haven_builder`] / [`haven_config`] - configuration

use crate::collection::snowflake::SnowflakeIdGenerator;
use std::sync::LazyLock;

pub mod collection;
pub mod common;
pub mod connection;
pub mod dns;
pub mod errors;
pub mod filter;
pub mod haven_builder;
pub mod haven_config;
pub mod index;
pub mod store;

pub(crate) static ID_GENERATOR: LazyLock<SnowflakeIdGenerator> =
    LazyLock::new(SnowflakeIdGenerator::new);
