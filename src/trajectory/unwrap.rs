//! Periodic-boundary unwrapping.
//!
//! Simulation codes wrap atoms back into the primary box, so a particle
//! crossing a face appears to jump by a full box length between two
//! timesteps. Unwrapping walks each atom's per-axis samples in order and
//! accumulates an integer image offset whenever the raw step exceeds half a
//! box, producing a continuous coordinate series suitable for spline
//! fitting.

use glam::Vec3;

use super::Trajectory;
use crate::error::TrajviewError;

/// Periodic box with per-axis validity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicBox {
    dims: Vec3,
}

impl PeriodicBox {
    /// Box with the given edge lengths. Invalid lengths are reported per
    /// axis by [`PeriodicBox::axis_length`], not here.
    pub fn new(dims: Vec3) -> Self {
        Self { dims }
    }

    /// Edge lengths as given.
    pub fn dims(&self) -> Vec3 {
        self.dims
    }

    /// Usable edge length of `axis`.
    ///
    /// # Errors
    ///
    /// Returns [`TrajviewError::Configuration`] if the length is not a
    /// positive finite number.
    pub fn axis_length(&self, axis: usize) -> Result<f32, TrajviewError> {
        let length = self.dims[axis];
        if length.is_finite() && length > 0.0 {
            Ok(length)
        } else {
            Err(TrajviewError::Configuration { axis, length })
        }
    }

    /// Wrap `p` into the primary image `[0, dims)`. Axes with an unusable
    /// length are passed through.
    pub fn wrap(&self, p: Vec3) -> Vec3 {
        let mut out = p;
        for axis in 0..3 {
            if let Ok(length) = self.axis_length(axis) {
                out[axis] = p[axis].rem_euclid(length);
            }
        }
        out
    }
}

/// Trajectory with periodic jumps removed.
#[derive(Debug)]
pub struct UnwrappedTrajectory {
    atom_count: usize,
    timesteps: usize,
    periodic_box: PeriodicBox,
    positions: Vec<f32>,
    skipped: Vec<TrajviewError>,
}

impl UnwrappedTrajectory {
    /// Number of atoms per timestep.
    pub fn atom_count(&self) -> usize {
        self.atom_count
    }

    /// Number of timesteps.
    pub fn timesteps(&self) -> usize {
        self.timesteps
    }

    /// Box the trajectory was recorded in.
    pub fn periodic_box(&self) -> PeriodicBox {
        self.periodic_box
    }

    /// Flat unwrapped coordinates, timestep-major.
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Unwrapped coordinate of `atom` on `axis` at `step`.
    pub fn sample(&self, step: usize, atom: usize, axis: usize) -> f32 {
        self.positions[(step * self.atom_count + atom) * 3 + axis]
    }

    /// Configuration errors for axes that were left wrapped.
    pub fn skipped_axes(&self) -> &[TrajviewError] {
        &self.skipped
    }

    /// Take the coordinate buffer.
    pub fn into_positions(self) -> Vec<f32> {
        self.positions
    }
}

/// Remove periodic jumps from every atom's trajectory.
///
/// For each atom and axis, the image offset starts at zero and changes by
/// one box length whenever the raw step `raw[i] - raw[i-1]` reaches half a
/// box in either direction; the corrected sample is
/// `raw[i] + offset * length`. Because the offset already accounts for all
/// earlier crossings, this is the same as comparing each raw sample against
/// its corrected predecessor. The first sample is never moved.
///
/// Axes whose box length is not positive are left untouched and reported
/// through [`UnwrappedTrajectory::skipped_axes`].
pub fn unwrap(trajectory: Trajectory) -> UnwrappedTrajectory {
    let timesteps = trajectory.timesteps();
    let (atom_count, dims, mut positions) = trajectory.into_parts();
    let periodic_box = PeriodicBox::new(dims);
    let stride = atom_count * 3;

    let mut skipped = Vec::new();
    for axis in 0..3 {
        let length = match periodic_box.axis_length(axis) {
            Ok(length) => length,
            Err(e) => {
                log::warn!("{e}; cyclic correction disabled for this axis");
                skipped.push(e);
                continue;
            }
        };
        let half = length * 0.5;

        for atom in 0..atom_count {
            let base = atom * 3 + axis;
            let mut offset = 0.0f32;
            let mut prev_raw = match positions.get(base) {
                Some(&v) => v,
                None => continue,
            };
            for step in 1..timesteps {
                let idx = step * stride + base;
                let raw = positions[idx];
                let delta = raw - prev_raw;
                if delta >= half {
                    offset -= 1.0;
                } else if delta <= -half {
                    offset += 1.0;
                }
                positions[idx] = raw + offset * length;
                prev_raw = raw;
            }
        }
    }

    UnwrappedTrajectory {
        atom_count,
        timesteps,
        periodic_box,
        positions,
        skipped,
    }
}

/// Leave the trajectory as recorded (cyclic correction switched off).
pub fn passthrough(trajectory: Trajectory) -> UnwrappedTrajectory {
    let timesteps = trajectory.timesteps();
    let (atom_count, dims, positions) = trajectory.into_parts();
    UnwrappedTrajectory {
        atom_count,
        timesteps,
        periodic_box: PeriodicBox::new(dims),
        positions,
        skipped: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::trajectory::synthetic;

    fn single_atom_x(xs: &[f32], dims: Vec3) -> Trajectory {
        let positions = xs.iter().flat_map(|&x| [x, 1.0, 1.0]).collect();
        Trajectory::new(1, dims, positions).unwrap()
    }

    fn xs_of(unwrapped: &UnwrappedTrajectory) -> Vec<f32> {
        (0..unwrapped.timesteps())
            .map(|s| unwrapped.sample(s, 0, 0))
            .collect()
    }

    #[test]
    fn crossing_upper_face_continues_upward() {
        let traj = single_atom_x(&[9.0, 1.0, 2.0], Vec3::splat(10.0));
        let unwrapped = unwrap(traj);
        assert_eq!(xs_of(&unwrapped), vec![9.0, 11.0, 12.0]);
        assert!(unwrapped.skipped_axes().is_empty());
    }

    #[test]
    fn crossing_lower_face_continues_downward() {
        let traj = single_atom_x(&[1.0, 9.0, 2.0], Vec3::splat(10.0));
        let unwrapped = unwrap(traj);
        assert_eq!(xs_of(&unwrapped), vec![1.0, -1.0, 2.0]);
    }

    #[test]
    fn last_sample_is_corrected() {
        let traj = single_atom_x(&[9.5, 0.5], Vec3::splat(10.0));
        assert_eq!(xs_of(&unwrap(traj)), vec![9.5, 10.5]);
    }

    #[test]
    fn repeated_crossings_accumulate() {
        let traj =
            single_atom_x(&[8.0, 1.0, 4.0, 7.0, 0.5, 3.0], Vec3::splat(10.0));
        assert_eq!(
            xs_of(&unwrap(traj)),
            vec![8.0, 11.0, 14.0, 17.0, 20.5, 23.0]
        );
    }

    #[test]
    fn invalid_axis_is_skipped_not_fatal() {
        let traj = single_atom_x(&[9.0, 1.0], Vec3::new(0.0, 10.0, -3.0));
        let unwrapped = unwrap(traj);
        assert_eq!(xs_of(&unwrapped), vec![9.0, 1.0]);
        let axes: Vec<usize> = unwrapped
            .skipped_axes()
            .iter()
            .filter_map(|e| match e {
                TrajviewError::Configuration { axis, .. } => Some(*axis),
                _ => None,
            })
            .collect();
        assert_eq!(axes, vec![0, 2]);
    }

    #[test]
    fn skipped_axes_keep_the_rejected_length() {
        let traj = single_atom_x(&[9.0, 1.0], Vec3::new(10.0, 10.0, -3.0));
        let unwrapped = unwrap(traj);
        match unwrapped.skipped_axes() {
            [TrajviewError::Configuration { axis, length }] => {
                assert_eq!(*axis, 2);
                assert_eq!(*length, -3.0);
            }
            other => panic!("expected one skipped axis, got {other:?}"),
        }
        assert_eq!(unwrapped.into_positions(), vec![9.0, 1.0, 1.0, 11.0, 1.0, 1.0]);
    }

    #[test]
    fn wrap_maps_into_primary_image() {
        let pbox = PeriodicBox::new(Vec3::new(10.0, 10.0, 0.0));
        let wrapped = pbox.wrap(Vec3::new(12.5, -1.0, 42.0));
        assert!((wrapped.x - 2.5).abs() < 1e-6);
        assert!((wrapped.y - 9.0).abs() < 1e-6);
        assert_eq!(wrapped.z, 42.0);
    }

    #[test]
    fn random_walks_have_no_half_box_jumps() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let dims = Vec3::new(10.0, 7.5, 23.0);
            let traj = synthetic::random_walk(&mut rng, 16, 40, dims, 2.0);
            let unwrapped = unwrap(traj);
            for atom in 0..16 {
                for axis in 0..3 {
                    for step in 1..40 {
                        let d = unwrapped.sample(step, atom, axis)
                            - unwrapped.sample(step - 1, atom, axis);
                        assert!(
                            d.abs() <= dims[axis] * 0.5 + 1e-3,
                            "atom {atom} axis {axis} step {step}: {d}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn unwrapping_recovers_the_unwrapped_walk() {
        let mut rng = StdRng::seed_from_u64(11);
        let dims = Vec3::splat(8.0);
        let (wrapped, truth) =
            synthetic::random_walk_with_truth(&mut rng, 4, 30, dims, 1.5);
        let unwrapped = unwrap(wrapped);
        for (i, (&got, &want)) in
            unwrapped.positions().iter().zip(truth.iter()).enumerate()
        {
            // Truth starts in the primary box, so images agree exactly up to
            // float error.
            assert!((got - want).abs() < 1e-3, "coord {i}: {got} vs {want}");
        }
    }
}
