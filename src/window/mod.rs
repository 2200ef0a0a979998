//! Date-window planning
//!
//! Splits the span between a stream's last bookmark and now into the
//! date ranges requested from the API.

mod planner;

pub use planner::{DateWindow, WindowPlan, WindowPlanner, WINDOW_END_FORMAT, WINDOW_START_FORMAT};
