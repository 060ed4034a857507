//! Communication bridge between frontend and backend.
//!
//! This crate defines the types and protocols used to connect the dashboard
//! shell with the asynchronous backend that talks to the data platform.
//!
//! The design is deliberately lightweight and unidirectional:
//! - The frontend sends commands (e.g., insert a notification, request
//!   config).
//! - The backend pushes events (e.g., configuration, alerts, stored rows).
//!
//! Communication happens over bounded [`tokio::sync::mpsc`] channels wrapped
//! in [`BridgeChannels`]. Live row changes do not travel through the bridge;
//! they are delivered by a [`realtime::ChangeFeed`].

pub mod alert;
pub mod config;
pub mod realtime;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::{self, Receiver, Sender};

/// A notification row to be written into the watched table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    /// Kind name as stored in the `type` column; may be anything.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Messages emitted by the backend to inform the frontend of state updates.
#[derive(Debug, Clone)]
pub enum MessageFromBackend {
    /// Generic message for all alerts raised by the backend.
    NotificationMessage(alert::AlertPayload),
    /// Response to the configuration request from the frontend.
    ConfigurationResponse(config::Config),
    /// Rows of the notifications table, newest first.
    NotificationsListResponse(Vec<Value>),
}

/// Commands issued by the frontend to control or query the backend.
#[derive(Debug, Clone)]
pub enum MessageToBackend {
    /// Request for the application configuration.
    ConfigurationRequest,
    /// Request to insert a row into the notifications table.
    InsertNotification(NewNotification),
    /// Request for the stored notifications.
    NotificationsListRequest,
}

/// Paired `tokio::mpsc` channels for bidirectional communication between
/// frontend and backend.
pub struct BridgeChannels {
    /// Receiver used by the frontend to get messages from the backend.
    pub frontend_rx: Receiver<MessageFromBackend>,
    /// Sender used by the frontend to send commands to the backend.
    pub frontend_tx: Sender<MessageToBackend>,

    /// Receiver used by the backend to get commands from the frontend.
    pub backend_rx: Receiver<MessageToBackend>,
    /// Sender used by the backend to send events/responses to the frontend.
    pub backend_tx: Sender<MessageFromBackend>,
}

impl BridgeChannels {
    /// Creates a new pair of bridged channels with the given buffer capacity.
    pub fn new(buffer: usize) -> Self {
        let (to_backend_tx, to_backend_rx) = mpsc::channel(buffer);
        let (to_frontend_tx, to_frontend_rx) = mpsc::channel(buffer);
        Self {
            frontend_tx: to_backend_tx,
            frontend_rx: to_frontend_rx,
            backend_rx: to_backend_rx,
            backend_tx: to_frontend_tx,
        }
    }
}

impl Default for BridgeChannels {
    fn default() -> Self {
        Self::new(64)
    }
}
