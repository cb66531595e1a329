//! tour-planner core
//!
//! Travel-burden estimation and single-day insertion reassignment for
//! agent-led property tour schedules.
//!
//! The crate consumes a normalized tour event list and a
//! property-to-property travel-time matrix, and produces optimized per-day
//! agent assignments, lateness risk reports, and agent-specialization
//! comparisons. Loading spreadsheets, geocoding addresses, and rendering
//! reports are left to surrounding layers.

pub mod lateness;
pub mod matrix;
pub mod model;
pub mod optimizer;
pub mod specialization;
pub mod travel;
