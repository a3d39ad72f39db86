//! Background scheduling of forecast syncs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use sunshine_data::preferences::{PREF_LOCATION, PREF_UNITS};
use sunshine_data::weather_uri;

use crate::error::SyncError;
use crate::task::{SyncOutcome, SyncTask};

pub type SyncHandle = JoinHandle<Result<SyncOutcome, SyncError>>;

pub struct SyncService {
    task: Arc<SyncTask>,
    initialized: AtomicBool,
}

impl SyncService {
    pub fn new(task: Arc<SyncTask>) -> Self {
        Self {
            task,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn task(&self) -> &Arc<SyncTask> {
        &self.task
    }

    /// First-run check. Only the first call does anything: when no rows from
    /// today onwards are stored, an immediate sync is started and returned.
    ///
    /// A failed check leaves the service uninitialized so the next call
    /// tries again.
    pub fn initialize(&self) -> Result<Option<SyncHandle>, SyncError> {
        if self.initialized.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let upcoming = self.task.provider().count_from_today(&Local::now())?;
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }

        if upcoming > 0 {
            tracing::debug!("{} upcoming days already stored", upcoming);
            return Ok(None);
        }

        tracing::info!("No current forecast stored, syncing now");
        Ok(Some(self.start_immediate_sync()))
    }

    /// Run a sync in the background. Failures are logged and returned
    /// through the handle.
    pub fn start_immediate_sync(&self) -> SyncHandle {
        let task = Arc::clone(&self.task);
        tokio::spawn(async move {
            let result = task.sync_weather().await;
            log_result(&result);
            result
        })
    }

    /// Sync every `interval` until `cancel` fires. The first sync happens one
    /// interval from now.
    pub fn schedule_periodic(
        &self,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let task = Arc::clone(&self.task);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval() completes its first tick immediately
            ticker.tick().await;

            tracing::info!("Periodic sync every {:?}", interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("Periodic sync stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let result = task.sync_weather().await;
                        log_result(&result);
                    }
                }
            }
        })
    }

    /// React to a preference write.
    ///
    /// A new location triggers a sync; [`Preferences::set_location`] has
    /// already cleared the old coordinates. A units change leaves the rows
    /// alone but observers must redraw.
    ///
    /// [`Preferences::set_location`]: sunshine_data::Preferences::set_location
    pub fn on_preference_changed(&self, key: &str) -> Result<Option<SyncHandle>, SyncError> {
        match key {
            PREF_LOCATION => Ok(Some(self.start_immediate_sync())),
            PREF_UNITS => {
                self.task.provider().notify_change(&weather_uri());
                Ok(None)
            }
            _ => Ok(None),
        }
    }
}

fn log_result(result: &Result<SyncOutcome, SyncError>) {
    match result {
        Ok(SyncOutcome::Updated(rows)) => tracing::info!("Sync finished, {} days stored", rows),
        Ok(SyncOutcome::NoData) => tracing::info!("Sync finished without new data"),
        Err(e) => tracing::error!("Sync failed, keeping stored forecast: {}", e),
    }
}
