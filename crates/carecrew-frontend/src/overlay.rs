//! Transient overlays rendered outside the page layout.
//!
//! The [`OverlayHost`] owns the always-mounted overlay document. Every
//! [`OverlayHost::show`] call allocates a fresh [`RenderTarget`] (ids are never
//! reused), mounts the alert through an [`OverlayRenderer`] and arms a
//! single-shot timer. The overlay is torn down exactly once, either when the
//! timer fires or when its [`OverlayHandle`] is closed, whichever comes first.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use carecrew_bridge::{
    alert::{AlertKind, AlertPayload},
    config::OverlayConfig,
};
use tokio::{
    task::JoinHandle,
    time::{Instant, sleep_until},
};

use crate::dispatcher::OverlayQueue;

/// Identifier of a render target inside the overlay document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(u64);

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "overlay-{}", self.0)
    }
}

/// Fixed screen position, measured from the top-right corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayPosition {
    pub top: u32,
    pub right: u32,
}

/// The isolated node an overlay is rendered into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTarget {
    pub id: OverlayId,
    pub position: OverlayPosition,
}

/// 24-bit colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Icon, label and colour used to draw an alert of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertStyle {
    pub icon: &'static str,
    pub label: &'static str,
    pub color: Rgb,
}

impl AlertStyle {
    pub fn for_kind(kind: AlertKind) -> Self {
        match kind {
            AlertKind::Success => Self {
                icon: "✔",
                label: "Success",
                color: Rgb(0x16, 0xa3, 0x4a),
            },
            AlertKind::Error => Self {
                icon: "✖",
                label: "Error",
                color: Rgb(0xdc, 0x26, 0x26),
            },
            AlertKind::Warning => Self {
                icon: "⚠",
                label: "Warning",
                color: Rgb(0xd9, 0x77, 0x06),
            },
            AlertKind::Info => Self {
                icon: "ℹ",
                label: "Info",
                color: Rgb(0x25, 0x63, 0xeb),
            },
        }
    }
}

/// Everything a renderer needs to draw one overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayView {
    pub title: String,
    pub description: String,
    pub style: AlertStyle,
    pub duration: Duration,
}

/// Why an overlay was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    /// Its countdown elapsed.
    Expired,
    /// It was closed through its handle.
    Closed,
}

/// Draws and removes overlays. Implementations must not call back into the
/// host.
pub trait OverlayRenderer: Send + Sync + 'static {
    fn mount(&self, target: &RenderTarget, view: &OverlayView);

    fn unmount(&self, target: &RenderTarget, reason: DismissReason);
}

#[derive(Debug)]
struct MountedOverlay {
    target: RenderTarget,
    slot: u32,
    timer: Option<JoinHandle<()>>,
}

struct HostInner {
    document: Mutex<BTreeMap<OverlayId, MountedOverlay>>,
    renderer: Arc<dyn OverlayRenderer>,
    next_id: AtomicU64,
    default_duration: Duration,
    layout: OverlayConfig,
}

impl HostInner {
    fn document(&self) -> MutexGuard<'_, BTreeMap<OverlayId, MountedOverlay>> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes the overlay and unmounts it. Returns `false` if it was already
    /// gone.
    fn dispose(&self, id: OverlayId, reason: DismissReason) -> bool {
        let Some(overlay) = self.document().remove(&id) else {
            return false;
        };

        // an expiring timer is the task running this call
        if reason == DismissReason::Closed
            && let Some(timer) = overlay.timer
        {
            timer.abort();
        }

        self.renderer.unmount(&overlay.target, reason);
        true
    }
}

/// Service that mounts transient overlays into the application's overlay
/// document.
#[derive(Clone)]
pub struct OverlayHost {
    inner: Arc<HostInner>,
}

impl OverlayHost {
    /// Creates a host. Alerts without a duration stay for `default_duration`.
    pub fn new(
        renderer: Arc<dyn OverlayRenderer>,
        default_duration: Duration,
        layout: OverlayConfig,
    ) -> Self {
        Self {
            inner: Arc::new(HostInner {
                document: Mutex::new(BTreeMap::new()),
                renderer,
                next_id: AtomicU64::new(1),
                default_duration,
                layout,
            }),
        }
    }

    /// Mounts `payload` as a new overlay and schedules its removal. Must be
    /// called from within a tokio runtime.
    pub fn show(&self, payload: AlertPayload) -> OverlayHandle {
        let duration = payload.effective_duration(self.inner.default_duration);
        let deadline = Instant::now() + duration;
        let id = OverlayId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));

        let target = {
            let mut document = self.inner.document();
            // lowest stacking slot no mounted overlay occupies
            let slot = (0u32..)
                .find(|slot| document.values().all(|overlay| overlay.slot != *slot))
                .unwrap_or_default();
            let target = RenderTarget {
                id,
                position: OverlayPosition {
                    top: self.inner.layout.top + slot * self.inner.layout.spacing,
                    right: self.inner.layout.right,
                },
            };
            document.insert(
                id,
                MountedOverlay {
                    target: target.clone(),
                    slot,
                    timer: None,
                },
            );
            target
        };

        let view = OverlayView {
            title: payload.title,
            description: payload.description,
            style: AlertStyle::for_kind(payload.kind),
            duration,
        };
        self.inner.renderer.mount(&target, &view);

        let host = Arc::downgrade(&self.inner);
        let timer = tokio::spawn(async move {
            sleep_until(deadline).await;
            if let Some(host) = host.upgrade() {
                host.dispose(id, DismissReason::Expired);
            }
        });
        if let Some(overlay) = self.inner.document().get_mut(&id) {
            overlay.timer = Some(timer);
        }

        OverlayHandle {
            id,
            host: Arc::downgrade(&self.inner),
        }
    }

    /// Shows every alert arriving on `queue` until all dispatchers are gone.
    pub async fn serve(self, mut queue: OverlayQueue) {
        while let Some(payload) = queue.recv().await {
            let handle = self.show(payload);
            log::debug!("Mounted {}", handle.id());
        }
        log::debug!("Alert queue closed, {} overlay(s) still mounted", self.len());
    }

    /// Number of overlays currently mounted.
    pub fn len(&self) -> usize {
        self.inner.document().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render targets currently mounted, oldest first.
    pub fn targets(&self) -> Vec<RenderTarget> {
        self.inner
            .document()
            .values()
            .map(|overlay| overlay.target.clone())
            .collect()
    }
}

/// Handle to one mounted overlay, used only to close it early.
#[derive(Clone)]
pub struct OverlayHandle {
    id: OverlayId,
    host: Weak<HostInner>,
}

impl OverlayHandle {
    pub fn id(&self) -> OverlayId {
        self.id
    }

    /// Tears the overlay down now. Returns `false` if it was already gone.
    pub fn close(&self) -> bool {
        self.host
            .upgrade()
            .is_some_and(|host| host.dispose(self.id, DismissReason::Closed))
    }

    pub fn is_open(&self) -> bool {
        self.host
            .upgrade()
            .is_some_and(|host| host.document().contains_key(&self.id))
    }
}

impl fmt::Debug for OverlayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayHandle").field("id", &self.id).finish()
    }
}
