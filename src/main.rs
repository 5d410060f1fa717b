use lid_driven_cavity::{Config, Runner};
use anyhow::Result;
use log::info;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config = match args.len() {
        1 => {
            info!("No configuration given, using defaults");
            Config::default()
        }
        2 => {
            info!("Loading configuration from: {}", args[1]);
            Config::from_file(&args[1])?
        }
        _ => {
            eprintln!("Usage: {} [config.json]", args[0]);
            eprintln!("  config.json - JSON file containing simulation parameters");
            std::process::exit(1);
        }
    };

    let output_directory = config.output.output_directory.clone();
    let (frames, substeps) = (config.simulation.max_frames, config.simulation.substeps_per_frame);
    let (frequency, format) = (config.output.output_frequency, config.output.output_format);
    let mut runner = Runner::new(config)?.with_progress();

    let simulation = runner.simulation();
    info!("Simulation parameters:");
    info!("  Grid: {}x{}", simulation.resolution(), simulation.resolution());
    info!("  Reynolds number: {}", simulation.reynolds());
    info!("  Viscosity: {}", simulation.viscosity());
    info!("  Frames: {} x {} substeps", frames, substeps);
    info!("  Output: every {} frames as {:?}", frequency, format);

    let summary = runner.run().await?;

    info!("Simulation completed: {} steps, t = {:.4}", summary.steps, summary.simulated_time);
    info!("Final max velocity magnitude: {:.4}", summary.max_magnitude);
    info!("{} output files written to: {}", summary.files_written, output_directory);

    Ok(())
}
