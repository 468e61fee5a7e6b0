//! Viewport change notifications.

use crate::model::geo::{encode_geohash, GeoPoint};
use log::warn;
use std::sync::Arc;

/// Visible map region as reported by scroll/zoom events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: GeoPoint,
    pub zoom: u8,
}

impl Viewport {
    /// Geohash of the center, `None` when the center is out of range.
    pub fn center_geohash(&self, precision: usize) -> Option<String> {
        encode_geohash(self.center, precision)
    }
}

/// Collaborator interested in map movement (e.g. block prefetching).
pub trait ViewportListener: Send + Sync {
    fn on_viewport_changed(&self, viewport: &Viewport, center_block: &str);
}

#[derive(Default)]
pub struct ViewportNotifier {
    listeners: Vec<Arc<dyn ViewportListener>>,
}

impl ViewportNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Arc<dyn ViewportListener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Notifies every listener in subscription order.
    pub fn notify(&self, viewport: &Viewport, block_precision: usize) {
        if self.listeners.is_empty() {
            return;
        }
        let Some(block) = viewport.center_geohash(block_precision) else {
            warn!(
                "event=viewport_notify module=map status=skip reason=center_out_of_range latitude={} longitude={}",
                viewport.center.latitude, viewport.center.longitude
            );
            return;
        };
        for listener in &self.listeners {
            listener.on_viewport_changed(viewport, &block);
        }
    }
}
