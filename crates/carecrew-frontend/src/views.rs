use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use carecrew_bridge::{
    config::Config,
    realtime::{ChangeFeed, ChangeFilter},
};

use crate::{
    dispatcher::AlertDispatcher, lifecycle::LiveNotificationsBinding,
    subscription::ChangeSubscriptionManager,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageUi {
    Dashboard,
    Personnel,
    Deployments,
    Trainings,
    Documents,
}

impl PageUi {
    pub const ALL: [PageUi; 5] = [
        PageUi::Dashboard,
        PageUi::Personnel,
        PageUi::Deployments,
        PageUi::Trainings,
        PageUi::Documents,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PageUi::Dashboard => "dashboard",
            PageUi::Personnel => "personnel",
            PageUi::Deployments => "deployments",
            PageUi::Trainings => "trainings",
            PageUi::Documents => "documents",
        }
    }

    /// Whether the screen shows live notifications.
    pub fn is_live(&self) -> bool {
        matches!(self, PageUi::Dashboard)
    }
}

impl FromStr for PageUi {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        PageUi::ALL
            .into_iter()
            .find(|page| page.name().eq_ignore_ascii_case(value.trim()))
            .ok_or(())
    }
}

impl fmt::Display for PageUi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The dashboard shell: tracks the active screen and mounts the live
/// notification binding while a live screen is shown.
pub struct FrontendUi<F: ChangeFeed> {
    feed: Arc<F>,
    filter: ChangeFilter,
    dispatcher: AlertDispatcher,
    alert_duration: Duration,
    active_page: PageUi,
    live_binding: Option<LiveNotificationsBinding<F>>,
}

impl<F: ChangeFeed> FrontendUi<F> {
    /// Builds the shell and mounts the dashboard.
    pub fn new(feed: Arc<F>, config: &Config, dispatcher: AlertDispatcher) -> Self {
        let mut ui = Self {
            feed,
            filter: ChangeFilter::inserts(&config.realtime.schema, &config.realtime.table),
            dispatcher,
            alert_duration: config.alerts.database_duration(),
            active_page: PageUi::Dashboard,
            live_binding: None,
        };
        ui.mount_active_page();
        ui
    }

    pub fn active_page(&self) -> PageUi {
        self.active_page
    }

    pub fn live_binding(&self) -> Option<&LiveNotificationsBinding<F>> {
        self.live_binding.as_ref()
    }

    pub fn change_page(&mut self, page: PageUi) {
        if page == self.active_page {
            return;
        }
        log::info!("Switching from {} to {page}", self.active_page);
        self.unmount_active_page();
        self.active_page = page;
        self.mount_active_page();
    }

    /// Unmounts the active screen and gives its unsubscribe a turn to run
    /// before the caller tears the runtime down.
    pub async fn shutdown(mut self) {
        self.unmount_active_page();
        tokio::task::yield_now().await;
    }

    fn mount_active_page(&mut self) {
        if !self.active_page.is_live() {
            return;
        }
        let manager = ChangeSubscriptionManager::new(
            self.feed.clone(),
            self.filter.clone(),
            self.dispatcher.clone(),
        )
        .with_alert_duration(self.alert_duration);
        let mut binding = LiveNotificationsBinding::new(manager);
        binding.mount();
        self.live_binding = Some(binding);
    }

    fn unmount_active_page(&mut self) {
        if let Some(mut binding) = self.live_binding.take() {
            binding.unmount();
        }
    }
}
