//! Incremental updates
//!
//! The ledger holds the harvest high-water mark; the updater harvests
//! everything changed since then, feeds it through the upsert engine and
//! advances the ledger only when the whole listing went through. The
//! scheduler repeats that daily.

mod ledger;
mod scheduler;
mod updater;

pub use ledger::{fallback_window, UpdateLedger, Watermark, WatermarkSource};
pub use scheduler::{run_daily, DailySchedule, CHECK_INTERVAL, DEFAULT_UPDATE_TIME};
pub use updater::{RunSummary, UpdateError, UpdateOptions, Updater};
