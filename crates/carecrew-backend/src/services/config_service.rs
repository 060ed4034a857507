use carecrew_bridge::{MessageFromBackend, alert::AlertKind};

/// Loads the configuration from disk into the shared state. A missing or
/// broken file leaves the defaults in place and raises an error alert.
pub async fn initialize(context: super::AppContextHandle) {
    match crate::config::load_config().await {
        Ok(config) => {
            context.state.write().await.config = config;
        }
        Err(error) => {
            log::error!("Falling back to the default configuration: {error}");
            context
                .send_notification(
                    AlertKind::Error,
                    "Configuration not loaded",
                    format!("Using defaults: {error}"),
                )
                .await;
        }
    }
}

/// Handles an incoming configuration request (see
/// [`carecrew_bridge::MessageToBackend::ConfigurationRequest`]).
pub async fn handle_config_request(context: super::AppContextHandle) {
    let config = context.state.read().await.config.clone();
    context
        .send(MessageFromBackend::ConfigurationResponse(config))
        .await;
}
