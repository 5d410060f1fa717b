use log::{debug, info, warn};
use std::ops::RangeInclusive;

use crate::error::Result;
use crate::field::VelocityField;
use crate::solver::{stable_time_step, StepSolver};
use crate::Float;

pub const RESOLUTION_RANGE: RangeInclusive<usize> = 20..=100;
pub const RESOLUTION_STEP: usize = 10;
pub const REYNOLDS_RANGE: RangeInclusive<Float> = 10.0..=1000.0;
pub const REYNOLDS_STEP: Float = 10.0;

pub const DEFAULT_RESOLUTION: usize = 50;
pub const DEFAULT_REYNOLDS: Float = 100.0;

/// One simulation session: the current field plus the controls that drive it.
///
/// The field is replaced wholesale after every step, so readers holding a
/// borrow from [`CavitySimulation::field`] always see a complete grid.
#[derive(Debug, Clone)]
pub struct CavitySimulation {
    field: VelocityField,
    solver: StepSolver,
    resolution: usize,
    reynolds: Float,
    running: bool,
    steps: u64,
    time: f64,
}

impl CavitySimulation {
    pub fn new(resolution: usize, reynolds: Float) -> Result<Self> {
        let resolution = clamp_resolution(resolution);
        let reynolds = clamp_reynolds(reynolds);
        info!("Creating {}x{} cavity at Re = {}", resolution, resolution, reynolds);

        Ok(Self {
            field: VelocityField::create(resolution, resolution)?,
            solver: StepSolver,
            resolution,
            reynolds,
            running: false,
            steps: 0,
            time: 0.0,
        })
    }

    pub fn field(&self) -> &VelocityField {
        &self.field
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn reynolds(&self) -> Float {
        self.reynolds
    }

    /// Kinematic viscosity `1 / Re`.
    pub fn viscosity(&self) -> Float {
        1.0 / self.reynolds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn steps_taken(&self) -> u64 {
        self.steps
    }

    /// Sum of the time steps taken so far. Each step picks its own `dt`,
    /// so this does not grow linearly with the step count once Re changes.
    pub fn simulated_time(&self) -> f64 {
        self.time
    }

    /// Time step the next call to [`CavitySimulation::tick`] will use.
    pub fn time_step(&self) -> Float {
        stable_time_step(self.resolution, self.viscosity())
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn toggle(&mut self) -> bool {
        self.running = !self.running;
        self.running
    }

    /// Pause and start over from a resting cavity.
    pub fn reset(&mut self) -> Result<()> {
        self.running = false;
        self.recreate_field()?;
        info!("Reset {}x{} cavity", self.resolution, self.resolution);
        Ok(())
    }

    fn recreate_field(&mut self) -> Result<()> {
        self.field = VelocityField::create(self.resolution, self.resolution)?;
        self.steps = 0;
        self.time = 0.0;
        Ok(())
    }

    /// Change the grid resolution. A new resting field is created whenever the
    /// clamped value differs from the current one; the running state is kept.
    pub fn set_resolution(&mut self, resolution: usize) -> Result<()> {
        let clamped = clamp_resolution(resolution);
        if clamped != resolution {
            warn!("Resolution {} adjusted to {}", resolution, clamped);
        }
        if clamped == self.resolution {
            return Ok(());
        }
        self.resolution = clamped;
        self.recreate_field()?;
        info!("Resized cavity to {}x{}", clamped, clamped);
        Ok(())
    }

    /// Change the Reynolds number. Takes effect at the next step; the field is kept.
    pub fn set_reynolds(&mut self, reynolds: Float) {
        let clamped = clamp_reynolds(reynolds);
        if clamped != reynolds {
            warn!("Reynolds number {} adjusted to {}", reynolds, clamped);
        }
        self.reynolds = clamped;
    }

    /// Advance `substeps` times when running. Returns whether the field changed.
    pub fn tick(&mut self, substeps: usize) -> Result<bool> {
        if !self.running {
            return Ok(false);
        }

        let nu = self.viscosity();
        let dt = self.time_step();
        for _ in 0..substeps {
            self.field = self.solver.step(&self.field, nu)?;
            self.steps += 1;
            self.time += f64::from(dt);
        }

        debug!(
            "Step {} (t = {:.4}): max |u| = {:.4}",
            self.steps,
            self.time,
            self.field.max_magnitude()
        );
        Ok(substeps > 0)
    }
}

/// Snap to the slider grid: multiples of 10 inside `[20, 100]`.
pub fn clamp_resolution(resolution: usize) -> usize {
    let snapped = resolution.saturating_add(RESOLUTION_STEP / 2) / RESOLUTION_STEP * RESOLUTION_STEP;
    snapped.clamp(*RESOLUTION_RANGE.start(), *RESOLUTION_RANGE.end())
}

/// Snap to the slider grid: multiples of 10 inside `[10, 1000]`.
/// NaN falls back to the default so viscosity stays positive.
pub fn clamp_reynolds(reynolds: Float) -> Float {
    if reynolds.is_nan() {
        return DEFAULT_REYNOLDS;
    }
    let snapped = (reynolds / REYNOLDS_STEP).round() * REYNOLDS_STEP;
    snapped.clamp(*REYNOLDS_RANGE.start(), *REYNOLDS_RANGE.end())
}
