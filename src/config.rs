use serde::{Deserialize, Serialize};
use crate::error::{CavityError, Result};
use crate::simulation::{DEFAULT_RESOLUTION, DEFAULT_REYNOLDS, RESOLUTION_RANGE, REYNOLDS_RANGE};
use crate::Float;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub domain: DomainConfig,
    pub physics: PhysicsConfig,
    pub simulation: SimulationConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Cells per side of the square cavity
    pub resolution: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub reynolds_number: Float,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub max_frames: usize,
    pub substeps_per_frame: usize,
    pub frame_interval_ms: u64, // 0 runs frames back to back
    pub divergence_limit: Float, // abort when max |vel| exceeds this
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_directory: String,
    pub output_frequency: usize,
    pub output_format: OutputFormat,
    pub image_scale: usize, // pixels per cell for ppm frames
    pub draw_vectors: bool, // velocity arrows over ppm frames
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Vtk,
    Ppm,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            reynolds_number: DEFAULT_REYNOLDS,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_frames: 500,
            substeps_per_frame: 10,
            frame_interval_ms: 0,
            divergence_limit: 5.0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_directory: "output".to_string(),
            output_frequency: 50,
            output_format: OutputFormat::Vtk,
            image_scale: 8,
            draw_vectors: true,
        }
    }
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Vtk => "vtk",
            OutputFormat::Ppm => "ppm",
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Kinematic viscosity derived from the Reynolds number.
    pub fn viscosity(&self) -> Float {
        1.0 / self.physics.reynolds_number
    }

    pub fn validate(&self) -> Result<()> {
        let resolution = self.domain.resolution;
        if !RESOLUTION_RANGE.contains(&resolution) {
            return Err(CavityError::invalid(
                "domain.resolution",
                format!(
                    "must be within {}..={}, got {resolution}",
                    RESOLUTION_RANGE.start(),
                    RESOLUTION_RANGE.end()
                ),
            ));
        }
        let re = self.physics.reynolds_number;
        if !REYNOLDS_RANGE.contains(&re) {
            return Err(CavityError::invalid(
                "physics.reynolds_number",
                format!(
                    "must be within {}..={}, got {re}",
                    REYNOLDS_RANGE.start(),
                    REYNOLDS_RANGE.end()
                ),
            ));
        }
        if self.output.output_frequency == 0 {
            return Err(CavityError::invalid("output.output_frequency", "must be non-zero"));
        }
        if self.output.image_scale == 0 {
            return Err(CavityError::invalid("output.image_scale", "must be non-zero"));
        }
        if !(self.simulation.divergence_limit > 0.0) {
            return Err(CavityError::invalid(
                "simulation.divergence_limit",
                "must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.domain.resolution, DEFAULT_RESOLUTION);
        assert_eq!(config.physics.reynolds_number, DEFAULT_REYNOLDS);
        assert_eq!(config.output.output_format, OutputFormat::Vtk);
        assert!((config.viscosity() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn partial_sections_are_merged_with_defaults() {
        let config = Config::from_json(
            r#"{
                "domain": { "resolution": 80 },
                "physics": { "reynolds_number": 400 },
                "output": { "output_format": "ppm", "image_scale": 4 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.domain.resolution, 80);
        assert_eq!(config.physics.reynolds_number, 400.0);
        assert_eq!(config.output.output_format, OutputFormat::Ppm);
        assert_eq!(config.output.output_frequency, 50);
        assert!(config.output.draw_vectors);
        assert_eq!(config.simulation.substeps_per_frame, 10);
    }

    #[test]
    fn rejects_non_positive_reynolds() {
        let err = Config::from_json(r#"{ "physics": { "reynolds_number": 0 } }"#).unwrap_err();
        assert!(matches!(
            err,
            CavityError::InvalidParameter { name: "physics.reynolds_number", .. }
        ));
    }

    #[test]
    fn rejects_values_outside_control_ranges() {
        for json in [
            r#"{ "domain": { "resolution": 7 } }"#,
            r#"{ "domain": { "resolution": 200 } }"#,
        ] {
            let err = Config::from_json(json).unwrap_err();
            assert!(matches!(err, CavityError::InvalidParameter { name: "domain.resolution", .. }));
        }
        for json in [
            r#"{ "physics": { "reynolds_number": 5 } }"#,
            r#"{ "physics": { "reynolds_number": 5000 } }"#,
        ] {
            let err = Config::from_json(json).unwrap_err();
            assert!(matches!(
                err,
                CavityError::InvalidParameter { name: "physics.reynolds_number", .. }
            ));
        }
    }

    #[test]
    fn range_endpoints_are_accepted() {
        let config = Config::from_json(
            r#"{ "domain": { "resolution": 20 }, "physics": { "reynolds_number": 1000 } }"#,
        )
        .unwrap();
        assert_eq!(config.domain.resolution, 20);
        assert!((config.viscosity() - 0.001).abs() < 1e-9);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(Config::from_json("{ nope"), Err(CavityError::Config(_))));
    }
}
