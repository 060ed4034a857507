//! Contract of the change-data-capture stream offered by the data platform.
//!
//! A [`ChangeFeed`] hands out [`Subscription`]s scoped by a [`ChangeFilter`].
//! Each subscription owns a receiver carrying [`FeedMessage`]s: row changes
//! matching the filter, interleaved with status updates about the connection.

use std::{fmt, future::Future};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::Receiver;

/// Kind of row change reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Selects which changes a subscription receives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeFilter {
    pub schema: String,
    pub table: String,
    pub kind: ChangeKind,
}

impl ChangeFilter {
    /// Filter for row insertions on `schema.table`.
    pub fn inserts(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            kind: ChangeKind::Insert,
        }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        self.kind == event.kind && self.schema == event.schema && self.table == event.table
    }
}

impl fmt::Display for ChangeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} on {}.{}", self.kind, self.schema, self.table)
    }
}

/// One row change delivered by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub schema: String,
    pub table: String,
    pub kind: ChangeKind,
    /// The new row for inserts and updates, the old row for deletes.
    pub record: Value,
}

impl ChangeEvent {
    pub fn insert(schema: impl Into<String>, table: impl Into<String>, record: Value) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            kind: ChangeKind::Insert,
            record,
        }
    }

    /// Reads a string column of the record. Missing, null and non-string
    /// columns all read as `None`.
    pub fn text(&self, column: &str) -> Option<&str> {
        self.record.get(column).and_then(Value::as_str)
    }
}

/// Connection state of a subscription, reported through its stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// The platform acknowledged the subscription.
    Subscribed,
    /// The platform did not acknowledge the subscription in time.
    TimedOut,
    /// The connection failed; carries the platform's reason.
    ChannelError(String),
    /// The subscription was closed and will not deliver anything else.
    Closed,
}

impl SubscriptionStatus {
    /// Whether the subscription can no longer deliver events.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubscriptionStatus::Subscribed)
    }
}

/// Item carried by a subscription stream.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    Change(ChangeEvent),
    Status(SubscriptionStatus),
}

/// Identifier the platform assigns to an open subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// An acknowledged subscription and the stream of its messages.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub filter: ChangeFilter,
    pub messages: Receiver<FeedMessage>,
}

/// Errors reported by a [`ChangeFeed`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    /// The platform could not be reached or refused the subscription.
    #[error("failed to open subscription: {0}")]
    Open(String),
    /// The subscription id is not known to the platform.
    #[error("unknown subscription {0}")]
    UnknownSubscription(SubscriptionId),
    /// The platform is shutting down.
    #[error("change feed is closed")]
    Closed,
}

/// A source of row changes that clients can subscribe to.
pub trait ChangeFeed: Send + Sync + 'static {
    /// Opens a subscription for changes matching `filter`. Resolves once the
    /// platform acknowledges it.
    fn subscribe(
        &self,
        filter: ChangeFilter,
    ) -> impl Future<Output = Result<Subscription, FeedError>> + Send;

    /// Closes a subscription. Its stream receives [`SubscriptionStatus::Closed`]
    /// and then ends.
    fn unsubscribe(&self, id: SubscriptionId) -> impl Future<Output = Result<(), FeedError>> + Send;
}
