//! Canonical domain types shared by every source adapter.

mod data_point;
mod timestamp;

pub use data_point::{DataPoint, Location};
pub use timestamp::UtcDateTime;
