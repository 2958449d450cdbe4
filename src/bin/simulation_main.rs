// simulation_main.rs
use intersection_sync::simulation_engine::config::SimulationConfig;
use intersection_sync::simulation_engine::simulation::run_simulation;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();

    // Optional first argument: path to a JSON config file.
    let config = match std::env::args().nth(1) {
        Some(path) => match SimulationConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config {}: {}", path, e);
                process::exit(1);
            }
        },
        None => SimulationConfig::default(),
    };

    match run_simulation(config).await {
        Ok(report) => {
            report.print_summary();
            if report.violations > 0 {
                process::exit(2);
            }
        }
        Err(e) => {
            eprintln!("Error in simulation: {}", e);
            process::exit(1);
        }
    }
}
