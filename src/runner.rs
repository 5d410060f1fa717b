use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::time::Duration;

use crate::{
    config::{Config, OutputFormat},
    output::{write_ppm, VTKWriter},
    simulation::CavitySimulation,
    Float,
};

/// What a headless run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub frames: usize,
    pub steps: u64,
    pub simulated_time: f64,
    pub max_magnitude: Float,
    pub files_written: usize,
}

/// Headless frame loop: step, then emit a frame every `output_frequency` frames.
///
/// With `frame_interval_ms > 0` frames are paced by a tokio interval, the
/// way an animation callback would pace them; otherwise they run back to back.
pub struct Runner {
    config: Config,
    simulation: CavitySimulation,
    vtk_writer: VTKWriter,
    ppm_frames: usize,
    progress: ProgressBar,
}

impl Runner {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let simulation =
            CavitySimulation::new(config.domain.resolution, config.physics.reynolds_number)?;

        Ok(Self {
            config,
            simulation,
            vtk_writer: VTKWriter::new(),
            ppm_frames: 0,
            progress: ProgressBar::hidden(),
        })
    }

    /// Show a progress bar on stderr while running.
    pub fn with_progress(mut self) -> Self {
        let progress = ProgressBar::new(self.config.simulation.max_frames as u64);
        if let Ok(style) =
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} frames {msg}")
        {
            progress.set_style(style);
        }
        self.progress = progress;
        self
    }

    pub fn simulation(&self) -> &CavitySimulation {
        &self.simulation
    }

    pub async fn run(&mut self) -> Result<RunSummary> {
        let max_frames = self.config.simulation.max_frames;
        let substeps = self.config.simulation.substeps_per_frame;
        info!(
            "Running {} frames x {} substeps (dt = {:.5})",
            max_frames,
            substeps,
            self.simulation.time_step()
        );

        std::fs::create_dir_all(&self.config.output.output_directory)?;
        self.write_output()?;

        let mut ticker = match self.config.simulation.frame_interval_ms {
            0 => None,
            ms => Some(tokio::time::interval(Duration::from_millis(ms))),
        };

        self.simulation.start();
        let mut frames = 0;
        while frames < max_frames {
            if let Some(ticker) = ticker.as_mut() {
                ticker.tick().await;
            }

            self.simulation.tick(substeps)?;
            frames += 1;

            let max_magnitude = self.simulation.field().max_magnitude();
            self.progress.set_position(frames as u64);
            self.progress.set_message(format!("max |u| {:.3}", max_magnitude));

            if !self.simulation.field().is_finite()
                || max_magnitude > self.config.simulation.divergence_limit
            {
                self.progress.abandon();
                warn!("Divergence at step {}", self.simulation.steps_taken());
                self.simulation.pause();
                self.write_collection()?;
                bail!(
                    "simulation diverged after {} steps (max |u| = {})",
                    self.simulation.steps_taken(),
                    max_magnitude
                );
            }

            if frames % self.config.output.output_frequency == 0 {
                self.write_output()?;
            }
        }
        self.simulation.pause();
        self.progress.finish();

        self.write_collection()?;

        Ok(RunSummary {
            frames,
            steps: self.simulation.steps_taken(),
            simulated_time: self.simulation.simulated_time(),
            max_magnitude: self.simulation.field().max_magnitude(),
            files_written: self.files_written(),
        })
    }

    /// Index the VTK frames written so far; PPM runs have no collection.
    fn write_collection(&self) -> Result<()> {
        if self.config.output.output_format != OutputFormat::Vtk {
            return Ok(());
        }
        let collection = format!("{}/cavity.pvd", self.config.output.output_directory);
        self.vtk_writer.write_collection(&collection)?;
        info!("Wrote collection file: {}", collection);
        Ok(())
    }

    fn write_output(&mut self) -> Result<()> {
        let output = &self.config.output;
        let steps = self.simulation.steps_taken();
        let filename = format!(
            "{}/output_{:06}.{}",
            output.output_directory,
            steps,
            output.output_format.extension()
        );

        match output.output_format {
            OutputFormat::Vtk => self.vtk_writer.write(
                &filename,
                self.simulation.field(),
                steps,
                self.simulation.simulated_time(),
            )?,
            OutputFormat::Ppm => {
                write_ppm(&filename, self.simulation.field(), output.image_scale, output.draw_vectors)?;
                self.ppm_frames += 1;
            }
        }

        debug!("Wrote output file: {}", filename);
        Ok(())
    }

    fn files_written(&self) -> usize {
        match self.config.output.output_format {
            OutputFormat::Vtk => self.vtk_writer.file_count(),
            OutputFormat::Ppm => self.ppm_frames,
        }
    }
}
