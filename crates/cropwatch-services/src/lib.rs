pub mod aggregator;
pub mod history;
pub mod scheduler;
pub mod telemetry;

pub use aggregator::{
    spawn_dashboard_polling, DashboardDataAggregator, DashboardServiceMessage, ErrorKind, Signal,
    TickOutcome, DASHBOARD_PATH, HISTORY_PATH,
};
pub use history::{HistoryError, HistorySeriesBuffer, RECENT_WINDOW};
pub use scheduler::{PollHandle, PollingScheduler, DEFAULT_POLL_INTERVAL};
pub use telemetry::{DashboardSnapshot, HistoryPoint, SecurityStatus, SensorValues, StressLevel};
