use crate::collection::Database;
use crate::dns::LookupHook;
use crate::errors::HavenResult;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Everything a remote driver needs for one connection attempt.
#[derive(Clone)]
pub struct ConnectOptions {
    /// The connection string, already expanded if it was SRV-style.
    pub uri: String,
    pub database_name: String,
    /// Host resolution the driver should use for its sockets.
    pub lookup: LookupHook,
    pub connect_timeout: Duration,
    pub selection_timeout: Duration,
}

impl std::fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("database_name", &self.database_name)
            .field("connect_timeout", &self.connect_timeout)
            .field("selection_timeout", &self.selection_timeout)
            .finish_non_exhaustive()
    }
}

/// The future returned by a [RemoteConnector].
pub type Connecting = Pin<Box<dyn Future<Output = HavenResult<Database>> + Send>>;

/// Plugs a remote database driver into the connection manager.
///
/// A connector builds a client from the given options and resolves with a
/// [Database] once the server is reachable. Any error makes the manager fall
/// back to the embedded store.
///
/// Closures returning a future implement this trait:
///
/// ```rust,ignore
/// let connector = |options: ConnectOptions| async move {
///     let client = MyDriver::connect(&options.uri, options.lookup).await?;
///     Ok(Database::new(MyDriverDatabase::new(client, &options.database_name)))
/// };
/// ```
pub trait RemoteConnector: Send + Sync {
    fn connect(&self, options: ConnectOptions) -> Connecting;
}

impl<F, Fut> RemoteConnector for F
where
    F: Fn(ConnectOptions) -> Fut + Send + Sync,
    Fut: Future<Output = HavenResult<Database>> + Send + 'static,
{
    fn connect(&self, options: ConnectOptions) -> Connecting {
        Box::pin(self(options))
    }
}
