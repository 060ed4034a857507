//! Live subscription to inserted notification rows.
//!
//! A [`ChangeSubscriptionManager`] holds at most one subscription at a time
//! and moves through three states:
//!
//! ```text
//! Idle --activate--> Subscribing --acknowledged--> Active --deactivate--> Idle
//! ```
//!
//! Activating while Subscribing or Active does nothing. A failed open or a
//! failed stream returns the manager to Idle; it stays there until the next
//! explicit activation. Each activation cycle is tagged with an epoch so that
//! work started by an earlier cycle can tell it has been superseded.

use std::{
    fmt, mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use carecrew_bridge::{
    alert::{AlertKind, AlertPayload, DATABASE_ALERT_DURATION},
    realtime::{
        ChangeEvent, ChangeFeed, ChangeFilter, ChangeKind, FeedError, FeedMessage, Subscription,
        SubscriptionId, SubscriptionStatus,
    },
};
use tokio::{runtime::Handle, sync::mpsc::Receiver, task::JoinHandle};

use crate::dispatcher::AlertDispatcher;

/// Callback receiving every status change of the subscription.
pub type StatusObserver = Arc<dyn Fn(&SubscriptionStatus) + Send + Sync>;

/// Observable state of a [`ChangeSubscriptionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Idle,
    Subscribing,
    Active,
}

/// Builds the alert shown for an inserted notification row. Missing columns
/// read as empty text and an unknown `type` reads as info.
pub fn alert_from_row(event: &ChangeEvent, duration: Duration) -> AlertPayload {
    AlertPayload::new(
        event.text("title").unwrap_or_default(),
        event.text("message").unwrap_or_default(),
    )
    .with_kind(AlertKind::from_lenient(event.text("type")))
    .with_duration(duration)
}

enum Phase {
    Idle,
    Subscribing,
    Active {
        id: SubscriptionId,
        pump: JoinHandle<()>,
    },
}

struct Shared {
    phase: Phase,
    epoch: u64,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything the spawned open and pump tasks need.
struct Link<F> {
    feed: Arc<F>,
    filter: ChangeFilter,
    dispatcher: AlertDispatcher,
    alert_duration: Duration,
    observer: Option<StatusObserver>,
    shared: Arc<Mutex<Shared>>,
}

impl<F> Clone for Link<F> {
    fn clone(&self) -> Self {
        Self {
            feed: self.feed.clone(),
            filter: self.filter.clone(),
            dispatcher: self.dispatcher.clone(),
            alert_duration: self.alert_duration,
            observer: self.observer.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<F: ChangeFeed> Link<F> {
    fn report(&self, status: &SubscriptionStatus) {
        match status {
            SubscriptionStatus::Subscribed => log::info!("Subscribed to {}", self.filter),
            SubscriptionStatus::TimedOut => {
                log::error!("Subscription to {} timed out", self.filter)
            }
            SubscriptionStatus::ChannelError(reason) => {
                log::error!("Subscription to {} failed: {reason}", self.filter)
            }
            SubscriptionStatus::Closed => log::info!("Subscription to {} closed", self.filter),
        }
        if let Some(observer) = &self.observer {
            observer(status);
        }
    }

    /// Returns to Idle, unless a newer activation cycle took over. Returns
    /// whether this cycle was still current.
    fn retire(&self, epoch: u64) -> bool {
        let mut shared = lock(&self.shared);
        let current = shared.epoch == epoch;
        if current {
            shared.phase = Phase::Idle;
        }
        current
    }

    /// Ends a cycle whose stream failed or ended on the feed side. A cycle
    /// already superseded was closed by `deactivate`.
    async fn release(&self, epoch: u64, id: SubscriptionId) {
        if !self.retire(epoch) {
            return;
        }
        match self.feed.unsubscribe(id).await {
            Ok(()) => log::debug!("Closed failed {id}"),
            Err(FeedError::UnknownSubscription(_) | FeedError::Closed) => {
                log::debug!("{id} was already gone from the feed")
            }
            Err(error) => log::warn!("Failed to close {id}: {error}"),
        }
    }

    async fn open(self, epoch: u64) {
        let Subscription { id, messages, .. } = match self.feed.subscribe(self.filter.clone()).await
        {
            Ok(subscription) => subscription,
            Err(error) => {
                self.retire(epoch);
                self.report(&SubscriptionStatus::ChannelError(error.to_string()));
                return;
            }
        };

        let accepted = {
            let mut shared = lock(&self.shared);
            let current = shared.epoch == epoch && matches!(shared.phase, Phase::Subscribing);
            if current {
                let pump = tokio::spawn(self.clone().pump(epoch, id, messages));
                shared.phase = Phase::Active { id, pump };
            }
            current
        };

        if accepted {
            self.report(&SubscriptionStatus::Subscribed);
            return;
        }

        log::info!("Activation was cancelled before {id} was acknowledged, closing it");
        if let Err(error) = self.feed.unsubscribe(id).await {
            log::warn!("Failed to close cancelled {id}: {error}");
        }
    }

    async fn pump(
        self,
        epoch: u64,
        id: SubscriptionId,
        mut messages: Receiver<FeedMessage>,
    ) {
        while let Some(message) = messages.recv().await {
            match message {
                FeedMessage::Change(event) if event.kind == ChangeKind::Insert => {
                    let alert = alert_from_row(&event, self.alert_duration);
                    let shared = lock(&self.shared);
                    if shared.epoch != epoch {
                        return;
                    }
                    self.dispatcher.dispatch(alert);
                }
                FeedMessage::Change(event) => {
                    log::debug!("Ignoring {:?} on {}", event.kind, event.table);
                }
                FeedMessage::Status(status) => {
                    self.report(&status);
                    if status.is_terminal() {
                        self.release(epoch, id).await;
                        return;
                    }
                }
            }
        }

        self.report(&SubscriptionStatus::Closed);
        self.release(epoch, id).await;
    }
}

/// Owns the single live subscription to inserted rows of the watched table
/// and turns each row into an alert.
pub struct ChangeSubscriptionManager<F: ChangeFeed> {
    link: Link<F>,
}

impl<F: ChangeFeed> ChangeSubscriptionManager<F> {
    pub fn new(feed: Arc<F>, filter: ChangeFilter, dispatcher: AlertDispatcher) -> Self {
        Self {
            link: Link {
                feed,
                filter,
                dispatcher,
                alert_duration: DATABASE_ALERT_DURATION,
                observer: None,
                shared: Arc::new(Mutex::new(Shared {
                    phase: Phase::Idle,
                    epoch: 0,
                })),
            },
        }
    }

    /// Sets how long alerts raised by inserted rows stay on screen.
    pub fn with_alert_duration(mut self, duration: Duration) -> Self {
        self.link.alert_duration = duration;
        self
    }

    pub fn with_status_observer(mut self, observer: StatusObserver) -> Self {
        self.link.observer = Some(observer);
        self
    }

    pub fn state(&self) -> SubscriptionState {
        match lock(&self.link.shared).phase {
            Phase::Idle => SubscriptionState::Idle,
            Phase::Subscribing => SubscriptionState::Subscribing,
            Phase::Active { .. } => SubscriptionState::Active,
        }
    }

    /// Starts opening the subscription unless one is already open or being
    /// opened. Returns whether a new subscription was started. Never blocks.
    pub fn activate(&self) -> bool {
        let Ok(runtime) = Handle::try_current() else {
            log::error!("Cannot subscribe to {} outside a runtime", self.link.filter);
            return false;
        };

        let epoch = {
            let mut shared = lock(&self.link.shared);
            if !matches!(shared.phase, Phase::Idle) {
                log::debug!("Already subscribed to {}, ignoring activation", self.link.filter);
                return false;
            }
            shared.epoch += 1;
            shared.phase = Phase::Subscribing;
            shared.epoch
        };

        log::info!("Subscribing to {}", self.link.filter);
        runtime.spawn(self.link.clone().open(epoch));
        true
    }

    /// Stops event delivery and closes the subscription. A pending open is
    /// cancelled. Returns `false` if there was nothing to stop.
    pub fn deactivate(&self) -> bool {
        let previous = {
            let mut shared = lock(&self.link.shared);
            let previous = mem::replace(&mut shared.phase, Phase::Idle);
            if !matches!(previous, Phase::Idle) {
                shared.epoch += 1;
            }
            previous
        };

        match previous {
            Phase::Idle => false,
            Phase::Subscribing => {
                log::info!("Cancelling pending subscription to {}", self.link.filter);
                true
            }
            Phase::Active { id, pump } => {
                pump.abort();
                log::info!("Unsubscribing {id} from {}", self.link.filter);
                match Handle::try_current() {
                    Ok(runtime) => {
                        let feed = self.link.feed.clone();
                        runtime.spawn(async move {
                            if let Err(error) = feed.unsubscribe(id).await {
                                log::warn!("Failed to unsubscribe {id}: {error}");
                            }
                        });
                    }
                    Err(_) => log::warn!("No runtime left to unsubscribe {id}"),
                }
                true
            }
        }
    }
}

impl<F: ChangeFeed> fmt::Debug for ChangeSubscriptionManager<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSubscriptionManager")
            .field("filter", &self.link.filter)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use carecrew_bridge::{
        alert::DEFAULT_ALERT_DURATION,
        config::OverlayConfig,
    };
    use serde_json::json;

    use super::*;
    use crate::{
        dispatcher,
        overlay::{AlertStyle, OverlayHost},
        testing::{RecordingRenderer, TestFeed, settle},
    };

    struct Harness {
        feed: Arc<TestFeed>,
        renderer: Arc<RecordingRenderer>,
        host: OverlayHost,
        manager: ChangeSubscriptionManager<TestFeed>,
    }

    fn harness(feed: TestFeed) -> Harness {
        let feed = Arc::new(feed);
        let renderer = Arc::new(RecordingRenderer::default());
        let host = OverlayHost::new(
            renderer.clone(),
            DEFAULT_ALERT_DURATION,
            OverlayConfig::default(),
        );
        let (dispatcher, queue) = dispatcher::channel();
        tokio::spawn(host.clone().serve(queue));
        let manager = ChangeSubscriptionManager::new(
            feed.clone(),
            ChangeFilter::inserts("public", "notifications"),
            dispatcher,
        );
        Harness {
            feed,
            renderer,
            host,
            manager,
        }
    }

    fn training_completed() -> serde_json::Value {
        json!({
            "title": "Training Completed",
            "message": "28 workers certified",
            "type": "success",
        })
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn inserted_row_becomes_a_five_second_overlay() {
        let h = harness(TestFeed::default());
        assert!(h.manager.activate());
        assert_eq!(h.manager.state(), SubscriptionState::Subscribing);
        settle().await;
        assert_eq!(h.manager.state(), SubscriptionState::Active);

        assert_eq!(h.feed.insert(training_completed()), 1);
        settle().await;

        let mounted = h.renderer.mounted();
        assert_eq!(mounted.len(), 1);
        let view = &mounted[0].1;
        assert_eq!(view.title, "Training Completed");
        assert_eq!(view.description, "28 workers certified");
        assert_eq!(view.style, AlertStyle::for_kind(AlertKind::Success));
        assert_eq!(view.duration, Duration::from_millis(5000));

        tokio::time::advance(Duration::from_millis(4999)).await;
        settle().await;
        assert_eq!(h.host.len(), 1);

        tokio::time::advance(Duration::from_millis(2)).await;
        settle().await;
        assert!(h.host.is_empty());
        assert_eq!(h.renderer.unmounted().len(), 1);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn repeated_activation_keeps_one_subscription() {
        let h = harness(TestFeed::default());
        assert!(h.manager.activate());
        assert!(!h.manager.activate());
        settle().await;
        assert!(!h.manager.activate());

        assert_eq!(h.feed.subscribe_calls(), 1);
        assert_eq!(h.feed.insert(training_completed()), 1);
        settle().await;
        assert_eq!(h.renderer.mounted().len(), 1);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn deactivation_stops_delivery() {
        let h = harness(TestFeed::default());
        h.manager.activate();
        settle().await;

        assert!(h.manager.deactivate());
        assert_eq!(h.manager.state(), SubscriptionState::Idle);
        settle().await;

        assert_eq!(h.feed.open_count(), 0);
        assert_eq!(h.feed.insert(training_completed()), 0);
        settle().await;
        assert!(h.renderer.mounted().is_empty());

        assert!(!h.manager.deactivate());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn overlays_outlive_deactivation() {
        let h = harness(TestFeed::default());
        h.manager.activate();
        settle().await;
        h.feed.insert(training_completed());
        settle().await;

        h.manager.deactivate();
        settle().await;
        assert_eq!(h.host.len(), 1);

        tokio::time::advance(Duration::from_millis(5001)).await;
        settle().await;
        assert!(h.host.is_empty());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn deactivation_while_subscribing_closes_the_late_subscription() {
        let h = harness(TestFeed::default());
        h.manager.activate();
        assert!(h.manager.deactivate());
        settle().await;

        assert_eq!(h.manager.state(), SubscriptionState::Idle);
        assert_eq!(h.feed.subscribe_calls(), 1);
        assert_eq!(h.feed.open_count(), 0);
        assert_eq!(h.feed.unsubscribed().len(), 1);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn refused_subscription_is_reported_and_returns_to_idle() {
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let observed = statuses.clone();
        let h = harness(TestFeed::refusing("realtime disabled"));
        let manager = h.manager.with_status_observer(Arc::new(move |status: &SubscriptionStatus| {
            observed.lock().unwrap().push(status.clone());
        }));

        manager.activate();
        settle().await;

        assert_eq!(manager.state(), SubscriptionState::Idle);
        assert_eq!(
            *statuses.lock().unwrap(),
            [SubscriptionStatus::ChannelError(
                "failed to open subscription: realtime disabled".to_string()
            )]
        );

        // no retry until activated again
        assert_eq!(h.feed.subscribe_calls(), 1);
        manager.activate();
        settle().await;
        assert_eq!(h.feed.subscribe_calls(), 2);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn stream_error_returns_to_idle_until_reactivated() {
        let h = harness(TestFeed::default());
        h.manager.activate();
        settle().await;

        h.feed
            .push_status(SubscriptionStatus::ChannelError("socket reset".to_string()));
        settle().await;
        assert_eq!(h.manager.state(), SubscriptionState::Idle);
        assert_eq!(h.feed.open_count(), 0);
        assert_eq!(h.feed.unsubscribed(), [SubscriptionId(1)]);

        assert!(h.manager.activate());
        settle().await;
        assert_eq!(h.manager.state(), SubscriptionState::Active);
        assert_eq!(h.feed.subscribe_calls(), 2);
        assert_eq!(h.feed.open_count(), 1);

        // one row, one overlay
        assert_eq!(h.feed.insert(training_completed()), 1);
        settle().await;
        assert_eq!(h.renderer.mounted().len(), 1);
    }

    #[test]
    fn malformed_rows_degrade_to_empty_info_alerts() {
        let event = ChangeEvent::insert(
            "public",
            "notifications",
            json!({ "title": null, "type": "urgent" }),
        );
        let alert = alert_from_row(&event, DATABASE_ALERT_DURATION);
        assert_eq!(alert.title, "");
        assert_eq!(alert.description, "");
        assert_eq!(alert.kind, AlertKind::Info);
        assert_eq!(alert.duration, Some(DATABASE_ALERT_DURATION));
    }

    #[test]
    fn null_type_renders_like_info() {
        let event = ChangeEvent::insert(
            "public",
            "notifications",
            json!({ "title": "Roster", "message": "Published", "type": null }),
        );
        let alert = alert_from_row(&event, DATABASE_ALERT_DURATION);
        assert_eq!(
            AlertStyle::for_kind(alert.kind),
            AlertStyle::for_kind(AlertKind::Info)
        );
    }

    #[test]
    fn activation_outside_a_runtime_is_refused() {
        let (dispatcher, _queue) = dispatcher::channel();
        let manager = ChangeSubscriptionManager::new(
            Arc::new(TestFeed::default()),
            ChangeFilter::inserts("public", "notifications"),
            dispatcher,
        );
        assert!(!manager.activate());
        assert_eq!(manager.state(), SubscriptionState::Idle);
    }
}
