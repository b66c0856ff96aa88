use std::fmt::{Display, Formatter};

/// Where a [`super::ConnectionManager`] stands in its connection decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No attempt has been made yet.
    #[default]
    Unresolved,
    /// An attempt is in flight; callers wait on it.
    Pending,
    /// The remote database is connected and memoized.
    ConnectedRemote,
    /// The last attempt fell back to the embedded store.
    ConnectedEmbedded,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            ConnectionState::ConnectedRemote | ConnectionState::ConnectedEmbedded
        )
    }
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Unresolved => write!(f, "unresolved"),
            ConnectionState::Pending => write!(f, "pending"),
            ConnectionState::ConnectedRemote => write!(f, "connected (remote)"),
            ConnectionState::ConnectedEmbedded => write!(f, "connected (embedded)"),
        }
    }
}
