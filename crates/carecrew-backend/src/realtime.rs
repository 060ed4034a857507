//! In-process change feed standing in for the hosted data platform.
//!
//! Every subscription gets its own bounded channel. Publishing fans an event
//! out to the subscriptions whose filter matches it; subscribers that went
//! away are pruned on the next publish.

use std::collections::HashMap;

use carecrew_bridge::realtime::{
    ChangeEvent, ChangeFeed, ChangeFilter, FeedError, FeedMessage, Subscription, SubscriptionId,
    SubscriptionStatus,
};
use tokio::sync::{
    RwLock,
    mpsc::{self, Sender},
};

#[derive(Debug)]
struct Subscriber {
    filter: ChangeFilter,
    tx: Sender<FeedMessage>,
}

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    subscribers: HashMap<SubscriptionId, Subscriber>,
    closed: bool,
}

/// A [`ChangeFeed`] that lives inside the application process.
#[derive(Debug)]
pub struct LocalChangeFeed {
    registry: RwLock<Registry>,
    buffer: usize,
}

impl LocalChangeFeed {
    /// Creates a feed whose subscriptions buffer up to `buffer` messages.
    pub fn new(buffer: usize) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            buffer: buffer.max(1),
        }
    }

    /// Delivers `event` to every matching subscription and returns how many
    /// received it.
    pub async fn publish(&self, event: ChangeEvent) -> usize {
        let targets: Vec<(SubscriptionId, Sender<FeedMessage>)> = {
            let registry = self.registry.read().await;
            registry
                .subscribers
                .iter()
                .filter(|(_, subscriber)| subscriber.filter.matches(&event))
                .map(|(id, subscriber)| (*id, subscriber.tx.clone()))
                .collect()
        };

        let mut delivered = 0;
        let mut gone = Vec::new();
        for (id, tx) in targets {
            match tx.send(FeedMessage::Change(event.clone())).await {
                Ok(()) => delivered += 1,
                Err(_) => gone.push(id),
            }
        }

        if !gone.is_empty() {
            let mut registry = self.registry.write().await;
            for id in gone {
                log::debug!("Pruning {id}, its receiver was dropped");
                registry.subscribers.remove(&id);
            }
        }

        delivered
    }

    /// Number of open subscriptions.
    pub async fn subscriber_count(&self) -> usize {
        self.registry.read().await.subscribers.len()
    }

    /// Closes every subscription and rejects new ones.
    pub async fn close(&self) {
        let mut registry = self.registry.write().await;
        registry.closed = true;
        for (id, subscriber) in registry.subscribers.drain() {
            log::debug!("Closing {id} on feed shutdown");
            let _ = subscriber
                .tx
                .try_send(FeedMessage::Status(SubscriptionStatus::Closed));
        }
    }
}

impl Default for LocalChangeFeed {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ChangeFeed for LocalChangeFeed {
    async fn subscribe(&self, filter: ChangeFilter) -> Result<Subscription, FeedError> {
        let mut registry = self.registry.write().await;
        if registry.closed {
            return Err(FeedError::Closed);
        }

        registry.next_id += 1;
        let id = SubscriptionId(registry.next_id);
        let (tx, rx) = mpsc::channel(self.buffer);
        registry.subscribers.insert(
            id,
            Subscriber {
                filter: filter.clone(),
                tx,
            },
        );
        log::info!("Opened {id} for {filter}");

        Ok(Subscription {
            id,
            filter,
            messages: rx,
        })
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), FeedError> {
        let subscriber = self
            .registry
            .write()
            .await
            .subscribers
            .remove(&id)
            .ok_or(FeedError::UnknownSubscription(id))?;

        // the stream ends once `tx` is dropped
        let _ = subscriber
            .tx
            .try_send(FeedMessage::Status(SubscriptionStatus::Closed));
        log::info!("Closed {id}");
        Ok(())
    }
}
