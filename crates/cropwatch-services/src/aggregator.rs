//! Dashboard data aggregation: one poll tick fetches the live snapshot and
//! the history series concurrently and merges them with the last good values.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cropwatch_auth::{AuthorizedHttpClient, HttpError};
use cropwatch_core::NetworkError;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::instrument;

use crate::history::HistorySeriesBuffer;
use crate::scheduler::{PollHandle, PollingScheduler};
use crate::telemetry::{DashboardSnapshot, HistoryPoint};

pub const DASHBOARD_PATH: &str = "/api/dashboard";
pub const HISTORY_PATH: &str = "/api/history";

/// Which of the two polled endpoints a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Snapshot,
    History,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Snapshot => f.write_str("dashboard"),
            Signal::History => f.write_str("history"),
        }
    }
}

/// Failure reported by a tick
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// The server rejected the session. The token has already been cleared.
    #[error("Session expired")]
    AuthExpired,

    #[error("{signal} request failed: {error}")]
    NetworkFailure { signal: Signal, error: NetworkError },

    #[error("{signal} request returned {status}")]
    ServerError { signal: Signal, status: u16 },

    #[error("{signal} response was invalid: {message}")]
    InvalidResponse { signal: Signal, message: String },
}

impl ErrorKind {
    fn from_http(signal: Signal, error: HttpError) -> Self {
        match error {
            HttpError::Unauthorized => Self::AuthExpired,
            HttpError::NetworkFailure(error) => Self::NetworkFailure { signal, error },
            HttpError::ServerError { status, .. } => Self::ServerError { signal, status },
            HttpError::InvalidResponse(message) => Self::InvalidResponse { signal, message },
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }

    /// Endpoint that failed; `None` for session expiry.
    pub fn signal(&self) -> Option<Signal> {
        match self {
            Self::AuthExpired => None,
            Self::NetworkFailure { signal, .. }
            | Self::ServerError { signal, .. }
            | Self::InvalidResponse { signal, .. } => Some(*signal),
        }
    }
}

/// Result of one poll tick.
///
/// On a transient failure the value for the failing signal is the one kept
/// from an earlier tick (or `None` if there never was one).
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    pub snapshot: Option<DashboardSnapshot>,
    pub history: Option<HistorySeriesBuffer>,
    pub error: Option<ErrorKind>,
}

impl TickOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.snapshot.is_some() && self.history.is_some()
    }
}

/// Messages sent from the polling tasks to the consumer
#[derive(Debug)]
pub enum DashboardServiceMessage {
    TickDone(TickOutcome),
}

#[derive(Debug, Default)]
struct Retained {
    snapshot: Option<DashboardSnapshot>,
    history: Option<HistorySeriesBuffer>,
}

/// Polls `/api/dashboard` and `/api/history` through the authorized client.
#[derive(Debug)]
pub struct DashboardDataAggregator {
    http: AuthorizedHttpClient,
    retained: Mutex<Retained>,
}

impl DashboardDataAggregator {
    pub fn new(http: AuthorizedHttpClient) -> Self {
        Self {
            http,
            retained: Mutex::new(Retained::default()),
        }
    }

    /// Run one tick: both requests are in flight together and the tick
    /// settles once both have completed.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_tick(&self) -> TickOutcome {
        let (snapshot_result, history_result) =
            tokio::join!(self.fetch_snapshot(), self.fetch_history());

        let unauthorized = matches!(snapshot_result, Err(HttpError::Unauthorized))
            || matches!(history_result, Err(HttpError::Unauthorized));

        if unauthorized {
            // Expiry wins over whatever the other request returned
            if self.http.session().clear() {
                tracing::warn!("Session expired; sign-in required");
            }
            *self.retained.lock() = Retained::default();
            return TickOutcome {
                snapshot: None,
                history: None,
                error: Some(ErrorKind::AuthExpired),
            };
        }

        let mut error = None;
        let mut retained = self.retained.lock();

        match snapshot_result {
            Ok(snapshot) => retained.snapshot = Some(snapshot),
            Err(e) => {
                tracing::warn!("Dashboard fetch failed: {}", e);
                error = Some(ErrorKind::from_http(Signal::Snapshot, e));
            }
        }

        match history_result {
            Ok(history) => retained.history = Some(history),
            Err(e) => {
                tracing::warn!("History fetch failed: {}", e);
                // Report the dashboard failure first when both fail
                error.get_or_insert(ErrorKind::from_http(Signal::History, e));
            }
        }

        TickOutcome {
            snapshot: retained.snapshot.clone(),
            history: retained.history.clone(),
            error,
        }
    }

    /// Last snapshot kept from a successful tick
    pub fn last_snapshot(&self) -> Option<DashboardSnapshot> {
        self.retained.lock().snapshot.clone()
    }

    /// Last history kept from a successful tick
    pub fn last_history(&self) -> Option<HistorySeriesBuffer> {
        self.retained.lock().history.clone()
    }

    async fn fetch_snapshot(&self) -> Result<DashboardSnapshot, HttpError> {
        let snapshot: DashboardSnapshot = self.http.get_json(DASHBOARD_PATH).await?;
        snapshot.validate().map_err(HttpError::InvalidResponse)?;
        tracing::debug!("Dashboard CSI {:.1}", snapshot.csi);
        Ok(snapshot)
    }

    async fn fetch_history(&self) -> Result<HistorySeriesBuffer, HttpError> {
        let points: Vec<HistoryPoint> = self.http.get_json(HISTORY_PATH).await?;
        let buffer = HistorySeriesBuffer::try_from_points(points)
            .map_err(|e| HttpError::InvalidResponse(e.to_string()))?;
        tracing::debug!("History has {} points", buffer.len());
        Ok(buffer)
    }
}

/// Poll the aggregator on `interval` and forward every outcome to `tx`.
///
/// Outcomes that settle after the receiver is gone are dropped.
pub fn spawn_dashboard_polling(
    aggregator: Arc<DashboardDataAggregator>,
    interval: Duration,
    tx: mpsc::UnboundedSender<DashboardServiceMessage>,
) -> PollHandle {
    PollingScheduler::start(
        move || {
            let aggregator = aggregator.clone();
            let tx = tx.clone();
            async move {
                let outcome = aggregator.fetch_tick().await;
                if tx.send(DashboardServiceMessage::TickDone(outcome)).is_err() {
                    tracing::debug!("Dashboard consumer gone; dropping tick result");
                }
            }
        },
        interval,
    )
}
