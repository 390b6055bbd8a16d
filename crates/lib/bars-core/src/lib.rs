//! Core types and collaborator traits for bars-mcp.
//!
//! This crate owns the intraday bar data model, the abstract `BarStore`
//! collaborator the query layers dispatch against, and the injectable clock
//! used for time-based parameter defaulting.

pub mod bar;
pub mod clock;
pub mod store;

pub use bar::{Bar, Granularity, GranularityParseError, strictly_ascending};
pub use clock::{Clock, FixedClock, SystemClock};
pub use store::{BarStore, StoreError};
