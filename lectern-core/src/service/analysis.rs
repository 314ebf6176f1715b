//! Audience analysis aggregation
//!
//! Averages the per-listener affect samples the external analyzer writes,
//! appends the aggregate to the room's analysis log, and maintains the
//! room's attendee high-water mark. Runs on a detached interval on the
//! speaker's side; a session operation never blocks on it and aggregation
//! failures never propagate.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::models::{AnalysisLogEntry, EmotionSummary, RoomId};
use crate::store::{AnalysisStore, RoomStore};
use crate::Result;

#[derive(Clone)]
pub struct AnalysisService {
    rooms: Arc<dyn RoomStore>,
    analysis: Arc<dyn AnalysisStore>,
}

impl std::fmt::Debug for AnalysisService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisService").finish()
    }
}

impl AnalysisService {
    pub fn new(rooms: Arc<dyn RoomStore>, analysis: Arc<dyn AnalysisStore>) -> Self {
        Self { rooms, analysis }
    }

    /// Aggregate the samples present right now.
    ///
    /// With no samples, nothing is logged and `None` is returned. Otherwise
    /// the aggregate is appended to the analysis log and the attendee
    /// high-water mark raised if exceeded.
    pub async fn aggregate_once(&self, room_id: &RoomId) -> Result<Option<EmotionSummary>> {
        let samples = self.analysis.fetch_all(room_id).await?;
        let Some(summary) = EmotionSummary::from_samples(&samples) else {
            return Ok(None);
        };

        self.analysis
            .append_log(room_id, AnalysisLogEntry::new(summary.clone(), samples.len()))
            .await?;
        self.rooms
            .set_max_attendees(room_id, samples.len())
            .await?;

        Ok(Some(summary))
    }

    /// Run [`aggregate_once`](Self::aggregate_once) on an interval until the
    /// handle is stopped. Each aggregate is also published into the handle's
    /// summary cell for the speaker UI to read.
    pub fn spawn_aggregator(&self, room_id: RoomId, interval: Duration) -> AggregatorHandle {
        let service = self.clone();
        let token = CancellationToken::new();
        let (summary_tx, summary_rx) = watch::channel(None);

        let task_token = token.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a fresh session
            // does not log an aggregate before any listener sampled.
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        match service.aggregate_once(&room_id).await {
                            Ok(summary) => {
                                if summary.is_some() {
                                    summary_tx.send_replace(summary);
                                }
                            }
                            Err(e) => {
                                tracing::warn!(
                                    error = %e,
                                    room_id = %room_id,
                                    "Audience analysis aggregation failed"
                                );
                            }
                        }
                    }
                }
            }
        });

        AggregatorHandle {
            token,
            task,
            summaries: summary_rx,
        }
    }
}

/// Handle to a running aggregation loop.
pub struct AggregatorHandle {
    token: CancellationToken,
    task: tokio::task::JoinHandle<()>,
    summaries: watch::Receiver<Option<EmotionSummary>>,
}

impl AggregatorHandle {
    /// The most recent aggregate, if any listener has been sampled yet.
    pub fn latest_summary(&self) -> Option<EmotionSummary> {
        self.summaries.borrow().clone()
    }

    /// A feed of aggregates for the speaker UI.
    pub fn summaries(&self) -> watch::Receiver<Option<EmotionSummary>> {
        self.summaries.clone()
    }

    /// Stop the loop. Deterministic: the task observes cancellation at its
    /// next suspension point.
    pub fn stop(&self) {
        self.token.cancel();
    }
}

impl Drop for AggregatorHandle {
    fn drop(&mut self) {
        self.token.cancel();
        self.task.abort();
    }
}

impl std::fmt::Debug for AggregatorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregatorHandle").finish()
    }
}
