//! Trajectory store: raw per-atom, per-timestep positions plus the periodic
//! box they were recorded in.
//!
//! Positions are kept flat and timestep-major (`[step][atom][axis]`), the
//! same order the binary file format uses. A [`Trajectory`] is built once
//! per load and then moved into the unwrapper, so its buffer is reclaimed
//! as soon as the spline build has consumed it.

pub mod format;
pub mod synthetic;
pub mod unwrap;

use glam::Vec3;

pub use format::{load_file, parse_binary, parse_text, TrajectoryFormat};
pub use unwrap::{unwrap, PeriodicBox, UnwrappedTrajectory};

use crate::error::TrajviewError;

/// Axis-aligned bounds of every coordinate seen while loading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Componentwise minimum.
    pub low: Vec3,
    /// Componentwise maximum.
    pub up: Vec3,
}

impl Bounds {
    /// Bounds that contain nothing; any included point replaces them.
    pub const EMPTY: Self = Self {
        low: Vec3::splat(f32::INFINITY),
        up: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Grow the bounds to contain `p`.
    pub fn include(&mut self, p: Vec3) {
        self.low = self.low.min(p);
        self.up = self.up.max(p);
    }

    /// Whether no point has been included yet.
    pub fn is_empty(&self) -> bool {
        self.low.x > self.up.x
    }

    /// Midpoint of the bounds (origin when empty).
    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            (self.low + self.up) * 0.5
        }
    }

    /// Bounds of a flat `x,y,z` coordinate slice.
    pub fn of_coords(coords: &[f32]) -> Self {
        let mut bounds = Self::EMPTY;
        for p in coords.chunks_exact(3) {
            bounds.include(Vec3::new(p[0], p[1], p[2]));
        }
        bounds
    }
}

/// Discrete trajectory: `timesteps` snapshots of `atom_count` positions.
#[derive(Debug, Clone)]
pub struct Trajectory {
    atom_count: usize,
    dims: Vec3,
    positions: Vec<f32>,
    bounds: Bounds,
}

impl Trajectory {
    /// Build a trajectory from flat timestep-major coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`TrajviewError::Format`] if the coordinate count is not a
    /// whole number of timesteps, or if coordinates are given for zero
    /// atoms.
    pub fn new(
        atom_count: usize,
        dims: Vec3,
        positions: Vec<f32>,
    ) -> Result<Self, TrajviewError> {
        if atom_count == 0 {
            if !positions.is_empty() {
                return Err(TrajviewError::Format(format!(
                    "{} coordinates given for zero atoms",
                    positions.len()
                )));
            }
        } else if positions.len() % (atom_count * 3) != 0 {
            return Err(TrajviewError::Format(format!(
                "{} coordinates do not form whole timesteps of {atom_count} \
                 atoms",
                positions.len()
            )));
        }
        let bounds = Bounds::of_coords(&positions);
        Ok(Self {
            atom_count,
            dims,
            positions,
            bounds,
        })
    }

    /// Number of atoms per timestep.
    pub fn atom_count(&self) -> usize {
        self.atom_count
    }

    /// Number of recorded timesteps (including a closing duplicate, if
    /// one was appended).
    pub fn timesteps(&self) -> usize {
        if self.atom_count == 0 {
            0
        } else {
            self.positions.len() / (self.atom_count * 3)
        }
    }

    /// Periodic box dimensions.
    pub fn dims(&self) -> Vec3 {
        self.dims
    }

    /// Coordinate bounds over all timesteps.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Flat coordinates, timestep-major.
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Flat coordinates of one timestep, or `None` if out of range.
    pub fn frame(&self, step: usize) -> Option<&[f32]> {
        let stride = self.atom_count * 3;
        let start = step.checked_mul(stride)?;
        self.positions.get(start..start + stride)
    }

    /// Position of `atom` at `step`.
    pub fn position(&self, step: usize, atom: usize) -> Option<Vec3> {
        if atom >= self.atom_count {
            return None;
        }
        let frame = self.frame(step)?;
        Some(Vec3::new(
            frame[atom * 3],
            frame[atom * 3 + 1],
            frame[atom * 3 + 2],
        ))
    }

    /// Append a copy of the first timestep after the last one, so playback
    /// loops back to the start without a jump.
    pub fn close_loop(&mut self) {
        let stride = self.atom_count * 3;
        if stride == 0 || self.positions.len() < stride {
            return;
        }
        self.positions.extend_from_within(0..stride);
    }

    /// Decompose into `(atom_count, dims, positions)`.
    pub fn into_parts(self) -> (usize, Vec3, Vec<f32>) {
        (self.atom_count, self.dims, self.positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_atoms_two_steps() -> Trajectory {
        Trajectory::new(
            2,
            Vec3::splat(10.0),
            vec![
                1.0, 2.0, 3.0, 4.0, 5.0, 6.0, //
                1.5, 2.5, 3.5, 4.5, 5.5, 6.5,
            ],
        )
        .unwrap()
    }

    #[test]
    fn counts_timesteps() {
        let traj = two_atoms_two_steps();
        assert_eq!(traj.atom_count(), 2);
        assert_eq!(traj.timesteps(), 2);
        assert_eq!(traj.position(1, 1), Some(Vec3::new(4.5, 5.5, 6.5)));
        assert_eq!(traj.position(2, 0), None);
        assert_eq!(traj.position(0, 2), None);
    }

    #[test]
    fn ragged_coordinates_are_rejected() {
        let err = Trajectory::new(2, Vec3::ONE, vec![0.0; 9]).unwrap_err();
        assert!(matches!(err, TrajviewError::Format(_)));
    }

    #[test]
    fn zero_atoms_is_empty() {
        let traj = Trajectory::new(0, Vec3::ONE, Vec::new()).unwrap();
        assert_eq!(traj.timesteps(), 0);
        assert!(traj.bounds().is_empty());
        assert!(Trajectory::new(0, Vec3::ONE, vec![1.0; 3]).is_err());
    }

    #[test]
    fn close_loop_duplicates_first_frame() {
        let mut traj = two_atoms_two_steps();
        traj.close_loop();
        assert_eq!(traj.timesteps(), 3);
        assert_eq!(traj.frame(2), traj.frame(0));
    }

    #[test]
    fn bounds_track_each_axis() {
        let traj = two_atoms_two_steps();
        let bounds = traj.bounds();
        assert_eq!(bounds.low, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(bounds.up, Vec3::new(4.5, 5.5, 6.5));
        assert_eq!(bounds.center(), Vec3::new(2.75, 3.75, 4.75));
    }
}
