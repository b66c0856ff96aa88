//! Remote-first connection management with an embedded fallback.
//!
//! [`ConnectionManager`] decides once which database the application talks
//! to. A remote driver plugs in through [`RemoteConnector`]; it receives the
//! (SRV-expanded) connection string and a [`crate::dns::LookupHook`] for its
//! sockets. With the `mongodb` feature, `MongoConnector` is used whenever no
//! other connector is configured. When there is no connector, or the attempt
//! fails or times out, the manager hands out the embedded store instead.

mod manager;
#[cfg(feature = "mongodb")]
mod mongo;
mod remote;
mod state;

pub use manager::*;
#[cfg(feature = "mongodb")]
pub use mongo::MongoConnector;
pub use remote::*;
pub use state::*;
