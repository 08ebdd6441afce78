//! Rate calculation and lane-rate analytics for a freight TMS.

pub mod domain;
pub mod infra;
pub mod util;
