use crate::shared_data::{current_timestamp, VehicleRecord};
use crate::simulation_engine::directions::Direction;
use serde::Serialize;
use std::time::Duration;

/// Wait statistics for vehicles arriving from one origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OriginStats {
    pub vehicles: usize,
    pub average_wait_ms: f64,
    pub max_wait_ms: u64,
}

/// Summary of a finished simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub finished_at: u64,
    pub total_vehicles: usize,
    pub violations: usize,
    pub max_concurrent: usize,
    pub elapsed_ms: u64,
    pub average_wait_ms: f64,
    pub max_wait_ms: u64,
    /// Indexed by `Direction::index`.
    pub per_origin: [OriginStats; 4],
}

impl SimulationReport {
    pub fn from_records(
        records: &[VehicleRecord],
        violations: usize,
        max_concurrent: usize,
        elapsed: Duration,
    ) -> Self {
        let mut per_origin: [OriginStats; 4] = Default::default();
        let mut wait_sums = [0u64; 4];
        for record in records {
            let slot = record.origin.index();
            per_origin[slot].vehicles += 1;
            per_origin[slot].max_wait_ms = per_origin[slot].max_wait_ms.max(record.wait_ms);
            wait_sums[slot] += record.wait_ms;
        }
        for (stats, sum) in per_origin.iter_mut().zip(wait_sums) {
            if stats.vehicles > 0 {
                stats.average_wait_ms = sum as f64 / stats.vehicles as f64;
            }
        }

        let total_wait: u64 = wait_sums.iter().sum();
        let average_wait_ms = if records.is_empty() {
            0.0
        } else {
            total_wait as f64 / records.len() as f64
        };

        Self {
            finished_at: current_timestamp(),
            total_vehicles: records.len(),
            violations,
            max_concurrent,
            elapsed_ms: elapsed.as_millis() as u64,
            average_wait_ms,
            max_wait_ms: records.iter().map(|r| r.wait_ms).max().unwrap_or(0),
            per_origin,
        }
    }

    pub fn origin(&self, origin: Direction) -> &OriginStats {
        &self.per_origin[origin.index()]
    }

    pub fn print_summary(&self) {
        println!("Simulation Summary:");
        println!("Vehicles: {}", self.total_vehicles);
        println!("Elapsed: {} ms", self.elapsed_ms);
        println!("Violations: {}", self.violations);
        println!("Max vehicles inside at once: {}", self.max_concurrent);
        println!(
            "Wait: average {:.2} ms, max {} ms",
            self.average_wait_ms, self.max_wait_ms
        );
        for origin in Direction::ALL {
            let stats = self.origin(origin);
            println!(
                "  {}: {} vehicles, average wait {:.2} ms, max wait {} ms",
                origin, stats.vehicles, stats.average_wait_ms, stats.max_wait_ms
            );
        }
    }
}
