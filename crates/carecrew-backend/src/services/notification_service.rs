use carecrew_bridge::{
    MessageFromBackend, NewNotification, alert::AlertKind, realtime::ChangeEvent,
};

/// Handles an incoming insert request (see
/// [`carecrew_bridge::MessageToBackend::InsertNotification`]). The stored row
/// is published to the change feed as an INSERT on the configured table.
pub async fn handle_insert_notification(
    context: super::AppContextHandle,
    notification: NewNotification,
) {
    let (inserted, realtime) = {
        let mut state = context.state.write().await;
        let realtime = state.config.realtime.clone();
        let inserted = state.notifications.insert(notification);
        log::debug!("Notifications table holds {} row(s)", state.notifications.len());
        (inserted, realtime)
    };

    let row = match inserted {
        Ok(row) => row,
        Err(error) => {
            log::warn!("Rejected notification insert: {error}");
            context
                .send_notification(AlertKind::Error, "Notification not sent", error.to_string())
                .await;
            return;
        }
    };

    let event = ChangeEvent::insert(realtime.schema, realtime.table, row);
    let delivered = context.feed.publish(event).await;
    log::info!("Published notification insert to {delivered} subscription(s)");

    context
        .send_notification(
            AlertKind::Success,
            "Notification sent",
            format!("Delivered to {delivered} live subscriber(s)"),
        )
        .await;
}

/// Handles an incoming list request (see
/// [`carecrew_bridge::MessageToBackend::NotificationsListRequest`]).
pub async fn handle_list_request(context: super::AppContextHandle) {
    let rows = context.state.read().await.notifications.list();
    context
        .send(MessageFromBackend::NotificationsListResponse(rows))
        .await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use carecrew_bridge::realtime::{ChangeFeed, ChangeFilter, FeedMessage};
    use tokio::sync::{RwLock, mpsc};

    use super::*;
    use crate::{app::AppContext, realtime::LocalChangeFeed, state::State};

    fn context() -> (super::super::AppContextHandle, mpsc::Receiver<MessageFromBackend>) {
        let (tx, rx) = mpsc::channel(8);
        let context = Arc::new(AppContext {
            state: Arc::new(RwLock::new(State::default())),
            feed: Arc::new(LocalChangeFeed::default()),
            tx,
        });
        (context, rx)
    }

    fn training_completed() -> NewNotification {
        NewNotification {
            title: "Training Completed".to_string(),
            message: "28 workers certified".to_string(),
            kind: Some("success".to_string()),
        }
    }

    #[tokio::test]
    async fn insert_publishes_the_stored_row() {
        let (context, mut rx) = context();
        let mut subscription = context
            .feed
            .subscribe(ChangeFilter::inserts("public", "notifications"))
            .await
            .unwrap();

        handle_insert_notification(context.clone(), training_completed()).await;

        let Some(FeedMessage::Change(event)) = subscription.messages.recv().await else {
            panic!("expected a change event");
        };
        assert_eq!(event.text("title"), Some("Training Completed"));
        assert_eq!(event.text("message"), Some("28 workers certified"));
        assert_eq!(event.text("type"), Some("success"));

        let Some(MessageFromBackend::NotificationMessage(alert)) = rx.recv().await else {
            panic!("expected a confirmation alert");
        };
        assert_eq!(alert.kind, AlertKind::Success);
        assert_eq!(alert.description, "Delivered to 1 live subscriber(s)");
    }

    #[tokio::test]
    async fn rejected_insert_reports_an_error_and_publishes_nothing() {
        let (context, mut rx) = context();
        let mut subscription = context
            .feed
            .subscribe(ChangeFilter::inserts("public", "notifications"))
            .await
            .unwrap();

        let blank = NewNotification {
            title: String::new(),
            ..training_completed()
        };
        handle_insert_notification(context.clone(), blank).await;

        let Some(MessageFromBackend::NotificationMessage(alert)) = rx.recv().await else {
            panic!("expected an error alert");
        };
        assert_eq!(alert.kind, AlertKind::Error);
        assert!(subscription.messages.try_recv().is_err());
        assert_eq!(context.state.read().await.notifications.len(), 0);
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let (context, mut rx) = context();
        handle_insert_notification(context.clone(), training_completed()).await;
        let second = NewNotification {
            title: "Deployment confirmed".to_string(),
            ..training_completed()
        };
        handle_insert_notification(context.clone(), second).await;
        handle_list_request(context.clone()).await;

        let mut rows = None;
        while let Some(message) = rx.recv().await {
            if let MessageFromBackend::NotificationsListResponse(list) = message {
                rows = Some(list);
                break;
            }
        }
        let rows = rows.expect("list response");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["title"], "Deployment confirmed");
    }
}
