// src/shared_data.rs

use crate::simulation_engine::directions::{Direction, Turn};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// One row of the trip log: a single vehicle's pass through the intersection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub vehicle_id: u64,
    pub origin: Direction,
    pub destination: Direction,
    pub turn: Turn,
    /// Time between arriving at the intersection and being admitted.
    pub wait_ms: u64,
    /// Admission time, relative to the start of the run.
    pub entered_at_ms: u64,
}

pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
