//! Dashboard shell: screens, console commands and the live notification
//! pipeline.
//!
//! Inserted notification rows travel from a [`ChangeFeed`] through the
//! [`subscription::ChangeSubscriptionManager`] owned by the dashboard screen,
//! into the [`dispatcher::AlertDispatcher`] queue, and are mounted by the
//! [`overlay::OverlayHost`] as self-dismissing overlays.

use std::sync::Arc;

use anyhow::Context as _;
use carecrew_bridge::{
    MessageFromBackend, MessageToBackend, NewNotification,
    alert::{AlertKind, AlertPayload},
    config::Config,
    realtime::ChangeFeed,
};
use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

use crate::{
    commands::{CommandError, ConsoleCommand},
    dispatcher::AlertDispatcher,
    overlay::OverlayHost,
    renderer::TerminalRenderer,
    views::FrontendUi,
};

pub mod commands;
pub mod dispatcher;
pub mod lifecycle;
pub mod overlay;
pub mod renderer;
pub mod subscription;
pub mod views;

#[cfg(test)]
mod testing;

#[derive(Clone)]
pub struct BackendBridge {
    pub to_backend: mpsc::Sender<MessageToBackend>,
}

impl BackendBridge {
    pub async fn request_config(&self) -> anyhow::Result<()> {
        self.to_backend
            .send(MessageToBackend::ConfigurationRequest)
            .await
            .context("failed to request config")
    }

    pub async fn insert_notification(&self, notification: NewNotification) -> anyhow::Result<()> {
        self.to_backend
            .send(MessageToBackend::InsertNotification(notification))
            .await
            .context("failed to request notification insert")
    }

    pub async fn request_notifications(&self) -> anyhow::Result<()> {
        self.to_backend
            .send(MessageToBackend::NotificationsListRequest)
            .await
            .context("failed to request notifications list")
    }
}

/// Waits for the backend's configuration. Alerts that arrive first are kept so
/// they can be shown once the overlay host exists.
async fn receive_config(
    rx: &mut mpsc::Receiver<MessageFromBackend>,
    early: &mut Vec<MessageFromBackend>,
) -> anyhow::Result<Config> {
    while let Some(message) = rx.recv().await {
        match message {
            MessageFromBackend::ConfigurationResponse(config) => return Ok(config),
            other => early.push(other),
        }
    }
    anyhow::bail!("backend closed before sending its configuration")
}

fn print_notifications(rows: &[Value]) {
    if rows.is_empty() {
        println!("no notifications stored");
        return;
    }
    for row in rows {
        let text = |column: &str| row.get(column).and_then(Value::as_str).unwrap_or_default();
        println!(
            "#{} [{}] {}: {}",
            row.get("id").unwrap_or(&Value::Null),
            AlertKind::from_lenient(row.get("type").and_then(Value::as_str)),
            text("title"),
            text("message"),
        );
    }
}

fn handle_backend_message(message: MessageFromBackend, dispatcher: &AlertDispatcher) {
    match message {
        MessageFromBackend::NotificationMessage(alert) => dispatcher.dispatch(alert),
        MessageFromBackend::ConfigurationResponse(_) => {
            log::debug!("Ignoring configuration update, it applies on restart");
        }
        MessageFromBackend::NotificationsListResponse(rows) => print_notifications(&rows),
    }
}

/// Runs the dashboard shell on the calling thread until `quit`, end of input,
/// or until the backend goes away.
pub fn run<F: ChangeFeed>(
    rx: mpsc::Receiver<MessageFromBackend>,
    tx: mpsc::Sender<MessageToBackend>,
    feed: Arc<F>,
) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build the frontend runtime")?;
    let result = runtime.block_on(run_shell(rx, tx, feed));
    // a pending stdin read would otherwise hold the runtime open
    runtime.shutdown_background();
    result
}

async fn run_shell<F: ChangeFeed>(
    mut rx: mpsc::Receiver<MessageFromBackend>,
    tx: mpsc::Sender<MessageToBackend>,
    feed: Arc<F>,
) -> anyhow::Result<()> {
    let bridge = BackendBridge { to_backend: tx };
    bridge.request_config().await?;

    let mut early = Vec::new();
    let config = receive_config(&mut rx, &mut early).await?;

    let host = OverlayHost::new(
        Arc::new(TerminalRenderer::stdout()),
        config.alerts.default_duration(),
        config.overlay.clone(),
    );
    let (dispatcher, queue) = dispatcher::channel();
    let host_task = tokio::spawn(host.clone().serve(queue));
    for message in early {
        handle_backend_message(message, &dispatcher);
    }

    let mut ui = FrontendUi::new(feed, &config, dispatcher.clone());
    println!("{}", commands::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(message) => handle_backend_message(message, &dispatcher),
                None => {
                    log::warn!("Backend closed the bridge");
                    break;
                }
            },
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read console input")? else {
                    break;
                };
                match commands::parse(&line) {
                    Ok(ConsoleCommand::Quit) => break,
                    Ok(ConsoleCommand::Help) => println!("{}", commands::HELP),
                    Ok(ConsoleCommand::List) => bridge.request_notifications().await?,
                    Ok(ConsoleCommand::Notify(notification)) => {
                        bridge.insert_notification(notification).await?
                    }
                    Ok(ConsoleCommand::Toast(alert)) => dispatcher.dispatch(alert),
                    Ok(ConsoleCommand::Page(page)) => {
                        ui.change_page(page);
                        println!("now showing {}", ui.active_page());
                    }
                    Err(CommandError::Empty) => {}
                    Err(error) => dispatcher.dispatch(
                        AlertPayload::new("Command not understood", error.to_string())
                            .with_kind(AlertKind::Warning),
                    ),
                }
            }
        }
    }

    ui.shutdown().await;
    log::info!("Shutting down with {} overlay(s) on screen", host.len());
    host_task.abort();
    Ok(())
}
