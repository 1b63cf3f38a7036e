//! Generation - procedural creation of stations to simulate

mod station;

pub use station::*;
