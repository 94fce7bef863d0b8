//! Refresh scheduling for service mode
//!
//! A single background loop drives discovery → filter → compute → select
//! cycles on an interval and publishes each completed report into an
//! atomically-swapped snapshot slot. Lifecycle rules:
//! - Explicit start/stop with a cancellation token
//! - Join handles for spawned tasks, bounded join on stop
//! - Cycles never overlap; an overrunning cycle absorbs missed ticks

pub mod error;
pub mod refresh_scheduler;
pub mod snapshot;

pub use error::{SchedulerError, SchedulerResult};
pub use refresh_scheduler::{RefreshScheduler, RefreshSchedulerConfig};
pub use snapshot::SnapshotSlot;
