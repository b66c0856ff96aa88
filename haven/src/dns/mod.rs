//! DNS-over-HTTPS topology discovery.
//!
//! Some networks filter the plain DNS lookups a database driver performs
//! for hosted clusters. This module resolves the records a driver needs
//! over HTTPS instead:
//!
//! - [`DohResolver`] queries A, SRV and TXT records against a DNS JSON
//!   endpoint, following CNAME chains for A lookups.
//! - [`SrvExpander`] turns a `mongodb+srv://` connection string into a direct
//!   multi-host `mongodb://` one.
//! - [`LookupHook`] resolves socket hosts, preferring DoH for the managed
//!   domain and falling back to the platform resolver.
//!
//! The HTTP layer is the [`DohTransport`] trait; [`HttpsTransport`] is the
//! production implementation.

mod doh;
mod gai;
mod lookup;
mod message;
#[cfg(test)]
pub(crate) mod mock_transport;
mod resolve;
mod srv;
mod transport;

pub use doh::*;
pub use gai::*;
pub use lookup::*;
pub use message::*;
pub use resolve::*;
pub use srv::*;
pub use transport::*;
