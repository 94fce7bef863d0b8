//! # RateWatch Core
//!
//! Business logic for metric-rate analysis: the metric filter, the per-metric
//! rate calculator, the bounded-concurrency dispatcher, the result selector
//! and the cycle orchestration that ties them together.
//!
//! Infrastructure concerns (HTTP, config files, schedulers) live behind the
//! [`ports::MetricsBackend`] trait and are implemented in `ratewatch-infra`.

pub mod cycle;
pub mod dispatch;
pub mod filter;
pub mod ports;
pub mod rate;
pub mod select;

pub use cycle::CycleService;
pub use dispatch::{dispatch, BatchOutcome, MetricWorker};
pub use filter::MetricFilter;
pub use ports::{MetricsBackend, Sample};
pub use rate::RateCalculator;
pub use select::{LabelPattern, Selection};
