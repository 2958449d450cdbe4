// simulation.rs
use crate::monitoring::report::SimulationReport;
use crate::monitoring::traffic_monitoring_system::{write_trip_log, IntersectionMonitor};
use crate::shared_data::VehicleRecord;
use crate::simulation_engine::config::SimulationConfig;
use crate::simulation_engine::intersection_sync::IntersectionSync;
use crate::simulation_engine::vehicles::Vehicle;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::task;

/// Everything a vehicle actor shares with the others.
struct ActorContext {
    config: SimulationConfig,
    controller: Arc<IntersectionSync>,
    monitor: Arc<IntersectionMonitor>,
    started: Instant,
}

/// Drives one actor: sends `vehicles_per_actor` vehicles through the intersection, one at a time.
fn drive_vehicles(actor: usize, ctx: &ActorContext) -> Vec<VehicleRecord> {
    let mut rng = match ctx.config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(actor as u64)),
        None => StdRng::from_os_rng(),
    };
    let crossing_time = Duration::from_millis(ctx.config.crossing_time_ms);
    let mut records = Vec::with_capacity(ctx.config.vehicles_per_actor);

    for i in 0..ctx.config.vehicles_per_actor {
        let id = (actor * ctx.config.vehicles_per_actor + i) as u64;
        let vehicle = Vehicle::random(id, &mut rng);

        let pause = rng.random_range(0..=ctx.config.max_interarrival_ms);
        thread::sleep(Duration::from_millis(pause));

        let arrived = Instant::now();
        ctx.controller.before_entry(vehicle.origin, vehicle.destination);
        let entered = Instant::now();
        ctx.monitor.vehicle_entered(&vehicle);

        thread::sleep(crossing_time);

        ctx.monitor.vehicle_left(&vehicle);
        ctx.controller.after_exit(vehicle.origin, vehicle.destination);

        records.push(VehicleRecord {
            vehicle_id: vehicle.id,
            origin: vehicle.origin,
            destination: vehicle.destination,
            turn: vehicle.turn(),
            wait_ms: entered.duration_since(arrived).as_millis() as u64,
            entered_at_ms: entered.duration_since(ctx.started).as_millis() as u64,
        });
    }
    records
}

/// Runs a full simulation: sets up the intersection controller, lets every actor drive its
/// vehicles through, tears the controller down and reports on the run.
///
/// Actors block inside the controller, so each runs on tokio's blocking pool.
pub async fn run_simulation(config: SimulationConfig) -> Result<SimulationReport, Box<dyn Error>> {
    config.validate()?;
    info!(
        "Starting simulation: {} actors x {} vehicles, crossing {} ms, inter-arrival up to {} ms",
        config.num_actors,
        config.vehicles_per_actor,
        config.crossing_time_ms,
        config.max_interarrival_ms
    );

    let ctx = Arc::new(ActorContext {
        config: config.clone(),
        controller: Arc::new(IntersectionSync::new()),
        monitor: Arc::new(IntersectionMonitor::new()),
        started: Instant::now(),
    });

    let handles: Vec<_> = (0..config.num_actors)
        .map(|actor| {
            let ctx = Arc::clone(&ctx);
            task::spawn_blocking(move || drive_vehicles(actor, &ctx))
        })
        .collect();

    let mut records = Vec::with_capacity(config.total_vehicles());
    for handle in handles {
        records.extend(handle.await?);
    }
    let elapsed = ctx.started.elapsed();

    let ctx = Arc::try_unwrap(ctx).map_err(|_| "simulation context still shared after run")?;
    let controller = Arc::try_unwrap(ctx.controller)
        .map_err(|_| "intersection controller still shared after run")?;
    controller.cleanup();
    ctx.monitor.verify_drained(records.len())?;

    records.sort_by_key(|r| r.entered_at_ms);
    if let Some(path) = &config.trip_log {
        write_trip_log(path, &records)?;
        info!("Trip log written to {}", path.display());
    }

    let report = SimulationReport::from_records(
        &records,
        ctx.monitor.violations(),
        ctx.monitor.max_concurrent(),
        elapsed,
    );
    if report.violations > 0 {
        warn!("{} intersection violations detected", report.violations);
    }
    info!(
        "Simulation finished: {} vehicles in {} ms",
        report.total_vehicles, report.elapsed_ms
    );
    Ok(report)
}
