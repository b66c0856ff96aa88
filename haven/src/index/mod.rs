//! Index declarations for collections.
//!
//! An index covers an ordered list of field paths. Unique indexes are
//! enforced on every insert and update; every collection also carries an
//! implicit unique index on `_id`.
//!
//! ```rust,ignore
//! use haven::index::unique_index;
//!
//! let name = translations.create_index(&["story_id", "locale"], &unique_index())?;
//! assert_eq!(name, "story_id_1_locale_1");
//! ```

mod descriptor;
mod options;
mod unique_index;

pub use descriptor::*;
pub use options::*;
pub(crate) use unique_index::*;
