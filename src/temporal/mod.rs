//! Temporal type operations for system-time periods
//!
//! Every period is typed by exactly one `TemporalType`. Each type provides:
//! - `now` - the transaction's logical start, projected into the type
//! - `infinity` - the open-ended end marker
//! - `compare` - a total order over values of the type
//!
//! The transaction start is always passed in explicitly through a
//! `TransactionClock`; nothing here reads the wall clock, so every row
//! touched by one transaction receives identical stamps.

mod clock;
mod types;

pub use clock::TransactionClock;
pub use types::{
    TemporalError, TemporalResult, TemporalType, INFINITE_DATE, INFINITE_TIMESTAMP,
    INFINITE_TIMESTAMPTZ,
};
