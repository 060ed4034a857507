/// The core application state that holds configuration and the stored
/// notifications.
///
/// It is designed to be wrapped in thread-safe, async-friendly concurrency
/// primitives (see [`SharedState`]) to allow safe concurrent reads and
/// occasional writes from multiple tasks.
#[derive(Debug, Clone, Default)]
pub struct State {
    /// The loaded application configuration.
    pub config: carecrew_bridge::config::Config,
    /// Rows written to the watched notifications table.
    pub notifications: crate::store::NotificationTable,
}

/// Thread-safe, async-friendly shared reference to the application [`State`].
pub type SharedState = std::sync::Arc<tokio::sync::RwLock<State>>;
