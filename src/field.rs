use crate::error::{CavityError, Result};
use crate::Float;

/// Horizontal velocity imposed on the top row.
pub const LID_VELOCITY: Float = 1.0;

/// Floor for the per-frame maximum magnitude used in display normalization.
pub const MIN_DISPLAY_MAGNITUDE: Float = 0.001;

/// Smallest grid edge that still has an interior cell.
pub const MIN_GRID_SIZE: usize = 3;

/// Discretized 2D velocity state on a uniform grid over the unit square.
///
/// Cells are stored row-major with `idx = j * nx + i`, where `j = 0` is the
/// bottom wall and `j = ny - 1` is the moving lid.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityField {
    nx: usize,
    ny: usize,
    /// Horizontal velocity component
    pub(crate) u: Vec<Float>,
    /// Vertical velocity component
    pub(crate) v: Vec<Float>,
}

impl VelocityField {
    /// Allocate a resting field with the lid row moving at [`LID_VELOCITY`].
    pub fn create(nx: usize, ny: usize) -> Result<Self> {
        check_dimensions(nx, ny)?;
        let cells = nx
            .checked_mul(ny)
            .ok_or(CavityError::AllocationFailure { cells: usize::MAX })?;

        let mut u = zeroed(cells)?;
        let v = zeroed(cells)?;

        let lid = (ny - 1) * nx;
        u[lid..lid + nx].fill(LID_VELOCITY);

        Ok(Self { nx, ny, u, v })
    }

    /// Build a field from raw component grids. Only the solver and tests use this;
    /// outside callers always start from [`VelocityField::create`].
    pub(crate) fn from_components(nx: usize, ny: usize, u: Vec<Float>, v: Vec<Float>) -> Self {
        debug_assert_eq!(u.len(), nx * ny);
        debug_assert_eq!(v.len(), nx * ny);
        Self { nx, ny, u, v }
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn len(&self) -> usize {
        self.u.len()
    }

    pub fn is_empty(&self) -> bool {
        self.u.is_empty()
    }

    pub fn u(&self) -> &[Float] {
        &self.u
    }

    pub fn v(&self) -> &[Float] {
        &self.v
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        j * self.nx + i
    }

    pub fn velocity(&self, i: usize, j: usize) -> [Float; 2] {
        let idx = self.index(i, j);
        [self.u[idx], self.v[idx]]
    }

    pub fn magnitude(&self, i: usize, j: usize) -> Float {
        let [u, v] = self.velocity(i, j);
        (u * u + v * v).sqrt()
    }

    /// Per-cell speed `sqrt(u² + v²)` in storage order.
    pub fn magnitudes(&self) -> Vec<Float> {
        self.u
            .iter()
            .zip(&self.v)
            .map(|(u, v)| (u * u + v * v).sqrt())
            .collect()
    }

    /// Largest speed in the field, never below [`MIN_DISPLAY_MAGNITUDE`].
    /// NaN cells are skipped so a diverged field still yields a usable scale.
    pub fn max_magnitude(&self) -> Float {
        self.u
            .iter()
            .zip(&self.v)
            .map(|(u, v)| (u * u + v * v).sqrt())
            .fold(MIN_DISPLAY_MAGNITUDE, Float::max)
    }

    /// Scalar vorticity `dv/dx - du/dy` from central differences.
    /// Wall and lid cells are left at zero.
    pub fn vorticity(&self) -> Vec<Float> {
        let (nx, ny) = (self.nx, self.ny);
        let dx = 1.0 / nx as Float;
        let dy = 1.0 / ny as Float;
        let mut vorticity = vec![0.0; self.len()];

        for j in 1..ny - 1 {
            for i in 1..nx - 1 {
                let idx = self.index(i, j);
                let dvdx = (self.v[idx + 1] - self.v[idx - 1]) / (2.0 * dx);
                let dudy = (self.u[idx + nx] - self.u[idx - nx]) / (2.0 * dy);
                vorticity[idx] = dvdx - dudy;
            }
        }

        vorticity
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.u.iter().chain(&self.v).all(|x| x.is_finite())
    }
}

pub(crate) fn check_dimensions(nx: usize, ny: usize) -> Result<()> {
    if nx < MIN_GRID_SIZE {
        return Err(CavityError::invalid(
            "nx",
            format!("need at least {MIN_GRID_SIZE} columns, got {nx}"),
        ));
    }
    if ny < MIN_GRID_SIZE {
        return Err(CavityError::invalid(
            "ny",
            format!("need at least {MIN_GRID_SIZE} rows, got {ny}"),
        ));
    }
    Ok(())
}

/// Zero-filled grid whose allocation failure is reported instead of aborting.
pub(crate) fn zeroed(cells: usize) -> Result<Vec<Float>> {
    let mut grid = Vec::new();
    grid.try_reserve_exact(cells)
        .map_err(|_| CavityError::AllocationFailure { cells })?;
    grid.resize(cells, 0.0);
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_sets_only_lid_row() {
        let field = VelocityField::create(6, 5).unwrap();
        assert_eq!(field.u().len(), 30);
        assert_eq!(field.v().len(), 30);

        for j in 0..5 {
            for i in 0..6 {
                let [u, v] = field.velocity(i, j);
                let expected = if j == 4 { 1.0 } else { 0.0 };
                assert_eq!(u, expected, "u at ({i}, {j})");
                assert_eq!(v, 0.0, "v at ({i}, {j})");
            }
        }
    }

    #[test]
    fn create_rejects_grids_without_interior() {
        assert!(matches!(
            VelocityField::create(2, 10),
            Err(CavityError::InvalidParameter { name: "nx", .. })
        ));
        assert!(matches!(
            VelocityField::create(10, 2),
            Err(CavityError::InvalidParameter { name: "ny", .. })
        ));
    }

    #[test]
    fn create_reports_unallocatable_grid() {
        let result = VelocityField::create(usize::MAX / 2, 3);
        assert!(matches!(result, Err(CavityError::AllocationFailure { .. })));
    }

    #[test]
    fn max_magnitude_has_floor() {
        let nx = 4;
        let field = VelocityField::from_components(nx, 4, vec![0.0; 16], vec![0.0; 16]);
        assert_eq!(field.max_magnitude(), MIN_DISPLAY_MAGNITUDE);

        let lid = VelocityField::create(nx, 4).unwrap();
        assert_eq!(lid.max_magnitude(), 1.0);
    }

    #[test]
    fn magnitude_combines_components() {
        let mut u = vec![0.0; 9];
        let mut v = vec![0.0; 9];
        u[4] = 3.0;
        v[4] = 4.0;
        let field = VelocityField::from_components(3, 3, u, v);
        assert_eq!(field.magnitude(1, 1), 5.0);
        assert_eq!(field.magnitudes()[4], 5.0);
    }

    #[test]
    fn vorticity_of_lid_field_is_negative_below_lid() {
        let field = VelocityField::create(5, 5).unwrap();
        let vorticity = field.vorticity();
        // du/dy > 0 just under the lid gives clockwise (negative) rotation.
        assert!(vorticity[field.index(2, 3)] < 0.0);
        assert_eq!(vorticity[field.index(2, 1)], 0.0);
        assert_eq!(vorticity[field.index(0, 3)], 0.0);
    }
}
