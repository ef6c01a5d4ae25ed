//! Observability for the versioning engine
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Atomic counters
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on trigger outcomes
//! 3. No async or background threads
//! 4. Deterministic output
//! 5. Log lines go to stderr; stdout is reserved for command output
//!
//! # Usage
//!
//! ```ignore
//! use aerodb_periods::observability::{Event, Logger, MetricsRegistry, Severity};
//!
//! let logger = Logger::new(Severity::Info);
//! logger.event(Event::HistoryArchived, &[("table", "public.orders")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_history_rows_archived();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
