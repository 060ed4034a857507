//! Test doubles for the overlay renderer and the change feed.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use carecrew_bridge::realtime::{
    ChangeEvent, ChangeFeed, ChangeFilter, FeedError, FeedMessage, Subscription, SubscriptionId,
    SubscriptionStatus,
};
use serde_json::Value;
use tokio::sync::mpsc::{self, Sender};

use crate::overlay::{DismissReason, OverlayRenderer, OverlayView, RenderTarget};

/// Lets every task that is ready run, without moving the paused clock.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Default)]
pub struct RecordingRenderer {
    mounted: Mutex<Vec<(RenderTarget, OverlayView)>>,
    unmounted: Mutex<Vec<(RenderTarget, DismissReason)>>,
}

impl RecordingRenderer {
    pub fn mounted(&self) -> Vec<(RenderTarget, OverlayView)> {
        self.mounted.lock().unwrap().clone()
    }

    pub fn unmounted(&self) -> Vec<(RenderTarget, DismissReason)> {
        self.unmounted.lock().unwrap().clone()
    }
}

impl OverlayRenderer for RecordingRenderer {
    fn mount(&self, target: &RenderTarget, view: &OverlayView) {
        self.mounted
            .lock()
            .unwrap()
            .push((target.clone(), view.clone()));
    }

    fn unmount(&self, target: &RenderTarget, reason: DismissReason) {
        self.unmounted.lock().unwrap().push((target.clone(), reason));
    }
}

#[derive(Debug, Default)]
struct FeedState {
    next_id: u64,
    open: HashMap<SubscriptionId, (ChangeFilter, Sender<FeedMessage>)>,
    subscribe_calls: usize,
    unsubscribed: Vec<SubscriptionId>,
}

/// Change feed whose rows and failures are driven by the test.
#[derive(Debug, Default)]
pub struct TestFeed {
    state: Mutex<FeedState>,
    refuse_with: Option<String>,
}

impl TestFeed {
    /// A feed that refuses every subscription.
    pub fn refusing(reason: &str) -> Self {
        Self {
            refuse_with: Some(reason.to_string()),
            ..Self::default()
        }
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap()
    }

    /// Inserts `record` into `public.notifications`; returns how many
    /// subscriptions received it.
    pub fn insert(&self, record: Value) -> usize {
        let event = ChangeEvent::insert("public", "notifications", record);
        self.state()
            .open
            .values()
            .filter(|(filter, _)| filter.matches(&event))
            .filter(|(_, tx)| tx.try_send(FeedMessage::Change(event.clone())).is_ok())
            .count()
    }

    /// Pushes a status update to every open subscription.
    pub fn push_status(&self, status: SubscriptionStatus) {
        for (_, tx) in self.state().open.values() {
            let _ = tx.try_send(FeedMessage::Status(status.clone()));
        }
    }

    pub fn open_count(&self) -> usize {
        self.state().open.len()
    }

    pub fn subscribe_calls(&self) -> usize {
        self.state().subscribe_calls
    }

    pub fn unsubscribed(&self) -> Vec<SubscriptionId> {
        self.state().unsubscribed.clone()
    }
}

impl ChangeFeed for TestFeed {
    async fn subscribe(&self, filter: ChangeFilter) -> Result<Subscription, FeedError> {
        let mut state = self.state();
        state.subscribe_calls += 1;
        if let Some(reason) = &self.refuse_with {
            return Err(FeedError::Open(reason.clone()));
        }

        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        let (tx, messages) = mpsc::channel(16);
        state.open.insert(id, (filter.clone(), tx));
        Ok(Subscription {
            id,
            filter,
            messages,
        })
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), FeedError> {
        let mut state = self.state();
        state.unsubscribed.push(id);
        match state.open.remove(&id) {
            Some(_) => Ok(()),
            None => Err(FeedError::UnknownSubscription(id)),
        }
    }
}
