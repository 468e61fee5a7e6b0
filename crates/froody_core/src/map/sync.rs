//! Resynchronization of the active cluster overlay.
//!
//! # Responsibility
//! - Queue one render job that snapshots the marker store, rebuilds the
//!   cluster overlay and swaps it in.
//!
//! # Invariants
//! - Snapshot, overlay build and swap happen inside the same render job.
//! - Without an attached render queue the resync is skipped, never fatal.
//! - Queued resyncs are not cancelled; the last one to run wins.

use crate::map::cluster::ClusterBuilder;
use crate::map::marker::SharedMarkerStore;
use crate::map::scheduler::RenderScheduler;
use log::{debug, warn};
use std::sync::Arc;

pub struct ViewSynchronizer {
    builder: Arc<dyn ClusterBuilder>,
    scheduler: Option<Arc<dyn RenderScheduler>>,
}

impl ViewSynchronizer {
    pub fn new(builder: Arc<dyn ClusterBuilder>) -> Self {
        Self {
            builder,
            scheduler: None,
        }
    }

    pub fn attach(&mut self, scheduler: Arc<dyn RenderScheduler>) {
        self.scheduler = Some(scheduler);
    }

    pub fn detach(&mut self) -> Option<Arc<dyn RenderScheduler>> {
        self.scheduler.take()
    }

    pub fn scheduler(&self) -> Option<&Arc<dyn RenderScheduler>> {
        self.scheduler.as_ref()
    }

    /// Schedules a rebuild-and-swap from the contents of `store` at run time.
    ///
    /// Returns whether a render job was queued.
    pub fn resync(&self, store: &SharedMarkerStore) -> bool {
        let Some(scheduler) = self.scheduler.as_ref() else {
            warn!("event=map_resync module=map status=skip reason=map_view_missing");
            return false;
        };

        let builder = Arc::clone(&self.builder);
        let store = store.clone();
        let posted = scheduler.post(Box::new(move |canvas| {
            let snapshot = store.snapshot();
            let overlay = Arc::new(builder.build(&snapshot));
            debug!(
                "event=map_resync module=render status=ok markers={} clusters={}",
                overlay.marker_count(),
                overlay.clusters.len()
            );
            canvas.swap_cluster_overlay(overlay);
        }));

        match posted {
            Ok(()) => {
                debug!("event=map_resync module=map status=scheduled");
                true
            }
            Err(err) => {
                warn!(
                    "event=map_resync module=map status=error error_code=render_queue_closed error={err}"
                );
                false
            }
        }
    }
}
