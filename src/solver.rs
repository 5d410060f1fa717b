//! Explicit finite-difference step for the lid-driven cavity.
//!
//! Each call advances the momentum equation by one time step:
//! 5-point Laplacian diffusion plus first-order upwind advection on every
//! interior cell, followed by no-slip walls and the moving lid. The previous
//! field is only read; the result is written into fresh buffers.

use crate::error::{CavityError, Result};
use crate::field::{check_dimensions, zeroed, VelocityField, LID_VELOCITY};
use crate::Float;

/// Diffusive stability factor applied to `dx² / ν`.
pub const DIFFUSION_SAFETY: Float = 0.25;

/// Advective limit as a fraction of `dx` (lid speed is 1).
pub const ADVECTION_SAFETY: Float = 0.1;

/// Stateless stepper for [`VelocityField`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StepSolver;

impl StepSolver {
    /// Advance `field` by one stable time step with kinematic viscosity `nu`.
    pub fn step(&self, field: &VelocityField, nu: Float) -> Result<VelocityField> {
        step(field, nu)
    }

    pub fn time_step(&self, field: &VelocityField, nu: Float) -> Float {
        stable_time_step(field.nx(), nu)
    }
}

/// Time step satisfying both the diffusive and advective bounds on a unit square
/// split into `nx` columns.
pub fn stable_time_step(nx: usize, nu: Float) -> Float {
    let dx = 1.0 / nx as Float;
    (DIFFUSION_SAFETY * dx * dx / nu).min(ADVECTION_SAFETY * dx)
}

/// First-order upwind derivative: backward difference when `velocity > 0`,
/// forward difference otherwise.
#[inline]
pub fn upwind(center: Float, left: Float, right: Float, velocity: Float, h: Float) -> Float {
    if velocity > 0.0 {
        (center - left) / h
    } else {
        (right - center) / h
    }
}

/// Compute the field one time step ahead of `field`.
///
/// Fails with [`CavityError::InvalidParameter`] when `nu` is not a positive
/// finite number or the grid has no interior. The input is never modified.
pub fn step(field: &VelocityField, nu: Float) -> Result<VelocityField> {
    if !(nu > 0.0 && nu.is_finite()) {
        return Err(CavityError::invalid(
            "nu",
            format!("viscosity must be positive and finite, got {nu}"),
        ));
    }
    let (nx, ny) = (field.nx(), field.ny());
    check_dimensions(nx, ny)?;

    let dx = 1.0 / nx as Float;
    let dy = 1.0 / ny as Float;
    let dt = stable_time_step(nx, nu);

    let u = field.u();
    let v = field.v();
    let mut new_u = zeroed(u.len())?;
    let mut new_v = zeroed(v.len())?;

    for j in 1..ny - 1 {
        for i in 1..nx - 1 {
            let idx = j * nx + i;
            let left = idx - 1;
            let right = idx + 1;
            let down = idx - nx;
            let up = idx + nx;

            let (uc, vc) = (u[idx], v[idx]);

            let lap_u = (u[left] - 2.0 * uc + u[right]) / (dx * dx)
                + (u[down] - 2.0 * uc + u[up]) / (dy * dy);
            let lap_v = (v[left] - 2.0 * vc + v[right]) / (dx * dx)
                + (v[down] - 2.0 * vc + v[up]) / (dy * dy);

            // Horizontal derivatives follow the sign of u, vertical ones the sign of v.
            let du_dx = upwind(uc, u[left], u[right], uc, dx);
            let du_dy = upwind(uc, u[down], u[up], vc, dy);
            let dv_dx = upwind(vc, v[left], v[right], uc, dx);
            let dv_dy = upwind(vc, v[down], v[up], vc, dy);

            new_u[idx] = uc + dt * (nu * lap_u - uc * du_dx - vc * du_dy);
            new_v[idx] = vc + dt * (nu * lap_v - uc * dv_dx - vc * dv_dy);
        }
    }

    apply_boundaries(nx, ny, &mut new_u, &mut new_v);

    Ok(VelocityField::from_components(nx, ny, new_u, new_v))
}

/// Moving lid on the top row, then no-slip on bottom, left and right.
/// Walls are written last so the top corners hold zero.
pub(crate) fn apply_boundaries(nx: usize, ny: usize, u: &mut [Float], v: &mut [Float]) {
    let top = (ny - 1) * nx;
    for i in 0..nx {
        u[top + i] = LID_VELOCITY;
        v[top + i] = 0.0;
        u[i] = 0.0;
        v[i] = 0.0;
    }
    for j in 0..ny {
        let row = j * nx;
        u[row] = 0.0;
        v[row] = 0.0;
        u[row + nx - 1] = 0.0;
        v[row + nx - 1] = 0.0;
    }
}
