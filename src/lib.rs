pub mod config;
pub mod error;
pub mod field;
pub mod solver;
pub mod simulation;
pub mod output;
pub mod runner;

pub use config::Config;
pub use error::CavityError;
pub use field::VelocityField;
pub use solver::{stable_time_step, step, StepSolver};
pub use simulation::CavitySimulation;
pub use output::VTKWriter;
pub use runner::{RunSummary, Runner};

pub type Float = f32;
