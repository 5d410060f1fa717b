//! Error types for the cavity solver.

use thiserror::Error;

/// Errors raised by field construction, stepping and configuration.
#[derive(Debug, Error)]
pub enum CavityError {
    /// A numerical or grid parameter is outside the range the scheme supports.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The velocity grids could not be allocated.
    #[error("failed to allocate {cells} cells for velocity grid")]
    AllocationFailure {
        /// Requested cell count.
        cells: usize,
    },

    /// Reading configuration or writing output failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON for [`crate::Config`].
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl CavityError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CavityError>;
