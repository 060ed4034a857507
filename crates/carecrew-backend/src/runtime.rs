//! Backend runtime setup and orchestration.
//!
//! This module wires together configuration, shared state, and the message
//! dispatch loop that listens to frontend bridge requests.

use std::{io, sync::Arc, thread};

use carecrew_bridge::{MessageFromBackend, MessageToBackend};
use tokio::sync::{
    RwLock,
    mpsc::{Receiver, Sender},
};

use crate::app::AppContext;
use crate::realtime::LocalChangeFeed;
use crate::services;
use crate::state::State;

/// Initialize backend state and start processing frontend messages.
async fn setup_backend(
    rx: Receiver<MessageToBackend>,
    tx: Sender<MessageFromBackend>,
    feed: Arc<LocalChangeFeed>,
) {
    let state = Arc::new(RwLock::new(State::default()));
    let context = Arc::new(AppContext { state, feed, tx });

    services::config_service::initialize(context.clone()).await;
    context.consume_bridge_messages(rx).await;
}

/// Spawn the backend runtime on its own thread and begin processing bridge
/// messages. Inserted notifications are published to `feed`.
pub fn run(
    rx: Receiver<MessageToBackend>,
    tx: Sender<MessageFromBackend>,
    feed: Arc<LocalChangeFeed>,
) -> io::Result<thread::JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("carecrew-backend")
        .build()?;

    thread::Builder::new()
        .name("carecrew-backend".to_string())
        .spawn(move || runtime.block_on(setup_backend(rx, tx, feed)))
}
