//! Application context and message dispatching utilities.
//!
//! The context contains the shared state and provides helpers for sending
//! responses and notifications back to the frontend bridge.

use std::sync::Arc;

use carecrew_bridge::{
    MessageFromBackend, MessageToBackend,
    alert::{AlertKind, AlertPayload},
};
use tokio::sync::mpsc::{Receiver, Sender};

use crate::realtime::LocalChangeFeed;
use crate::services;
use crate::state::SharedState;

/// Shared application context passed to services and message handlers.
pub(crate) struct AppContext {
    /// Mutable runtime application state shared across services.
    pub state: SharedState,
    /// Change feed that inserted rows are published to.
    pub feed: Arc<LocalChangeFeed>,
    /// Outbound channel to the frontend bridge.
    pub tx: Sender<MessageFromBackend>,
}

impl AppContext {
    /// Read and dispatch messages from the frontend bridge until it closes.
    pub async fn consume_bridge_messages(self: &Arc<Self>, mut rx: Receiver<MessageToBackend>) {
        while let Some(message) = rx.recv().await {
            log::debug!("Got a frontend message: {message:?}");
            self.dispatch_message(message).await;
        }
        log::info!("Frontend bridge closed, shutting the change feed down");
        self.feed.close().await;
    }

    /// Dispatches the received message from frontend down to individual
    /// service handlers.
    async fn dispatch_message(self: &Arc<Self>, message: MessageToBackend) {
        match message {
            MessageToBackend::ConfigurationRequest => {
                services::config_service::handle_config_request(self.clone()).await;
            }
            MessageToBackend::InsertNotification(notification) => {
                services::notification_service::handle_insert_notification(
                    self.clone(),
                    notification,
                )
                .await;
            }
            MessageToBackend::NotificationsListRequest => {
                services::notification_service::handle_list_request(self.clone()).await;
            }
        }
    }

    /// Send a message to the frontend bridge.
    pub async fn send(&self, message: MessageFromBackend) {
        if let Err(error) = self.tx.send(message).await {
            log::warn!("Frontend is gone, dropping {:?}", error.0);
        }
    }

    /// Send an alert to the frontend bridge. The frontend applies its default
    /// duration.
    pub async fn send_notification(
        &self,
        kind: AlertKind,
        title: impl Into<String>,
        description: impl Into<String>,
    ) {
        self.send(MessageFromBackend::NotificationMessage(
            AlertPayload::new(title, description).with_kind(kind),
        ))
        .await;
    }
}
