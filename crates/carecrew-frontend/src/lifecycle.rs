use carecrew_bridge::realtime::ChangeFeed;

use crate::subscription::ChangeSubscriptionManager;

/// Ties a [`ChangeSubscriptionManager`] to the mount and unmount of the screen
/// showing live notifications. Renders nothing.
///
/// Activation happens once per mount no matter how often the screen is
/// re-rendered; the subscription is released on unmount or when the binding
/// is dropped while still mounted.
#[derive(Debug)]
pub struct LiveNotificationsBinding<F: ChangeFeed> {
    manager: ChangeSubscriptionManager<F>,
    mounted: bool,
}

impl<F: ChangeFeed> LiveNotificationsBinding<F> {
    pub fn new(manager: ChangeSubscriptionManager<F>) -> Self {
        Self {
            manager,
            mounted: false,
        }
    }

    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        self.manager.activate();
    }

    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.manager.deactivate();
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn manager(&self) -> &ChangeSubscriptionManager<F> {
        &self.manager
    }
}

impl<F: ChangeFeed> Drop for LiveNotificationsBinding<F> {
    fn drop(&mut self) {
        self.unmount();
    }
}
