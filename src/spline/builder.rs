//! One-time spline construction over an unwrapped trajectory.
//!
//! Each atom's x, y and z series are fitted independently. Time is
//! normalized so that the whole trajectory spans `[0, 1]`, giving a uniform
//! knot spacing `h = 1 / (timesteps - 1)`. The unknowns are the second
//! derivatives `M_i` at each knot; interior rows read
//!
//! ```text
//! (h/6) M[i-1] + (2h/3) M[i] + (h/6) M[i+1] = (y[i+1] - 2 y[i] + y[i-1]) / h
//! ```
//!
//! and the two end rows depend on [`SplineBoundary`]. The matrix is the same
//! for every series, so it is factored once and shared across worker
//! threads.

use rayon::prelude::*;

use super::tridiagonal::TridiagonalSystem;
use super::{CoefficientIndex, Cubic, SplineBoundary, SplineSet, AXES};
use crate::error::TrajviewError;
use crate::trajectory::UnwrappedTrajectory;

/// Builds [`SplineSet`]s with a fixed boundary condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplineBuilder {
    boundary: SplineBoundary,
}

/// Per-thread buffers reused across series.
struct Scratch {
    samples: Vec<f32>,
    moments: Vec<f32>,
}

impl SplineBuilder {
    /// Builder using `boundary` at both ends.
    pub fn new(boundary: SplineBoundary) -> Self {
        Self { boundary }
    }

    /// Boundary condition in use.
    pub fn boundary(&self) -> SplineBoundary {
        self.boundary
    }

    /// Fit every atom and axis of `trajectory`.
    ///
    /// A trajectory without atoms yields an empty set. Exactly two timesteps
    /// yield one linear segment per atom and axis.
    ///
    /// # Errors
    ///
    /// Returns [`TrajviewError::InsufficientData`] when there are atoms but
    /// fewer than two timesteps.
    pub fn build(
        &self,
        trajectory: &UnwrappedTrajectory,
    ) -> Result<SplineSet, TrajviewError> {
        let atom_count = trajectory.atom_count();
        let timesteps = trajectory.timesteps();
        if atom_count == 0 {
            let index = CoefficientIndex::new(0, timesteps.saturating_sub(1));
            return Ok(SplineSet::from_parts(index, Vec::new()));
        }
        if timesteps < 2 {
            return Err(TrajviewError::InsufficientData { timesteps });
        }

        let index = CoefficientIndex::new(atom_count, timesteps - 1);
        let system = self.factor(timesteps)?;
        let positions = trajectory.positions();
        let mut coefficients = vec![Cubic::default(); index.len()];

        coefficients
            .par_chunks_mut(index.atom_stride())
            .enumerate()
            .for_each_init(
                || Scratch {
                    samples: vec![0.0; timesteps],
                    moments: vec![0.0; timesteps],
                },
                |scratch, (atom, block)| {
                    for axis in 0..AXES {
                        for (step, sample) in
                            scratch.samples.iter_mut().enumerate()
                        {
                            *sample =
                                positions[(step * atom_count + atom) * 3 + axis];
                        }
                        let start = index.axis_offset(axis);
                        self.fit(
                            system.as_ref(),
                            &scratch.samples,
                            &mut scratch.moments,
                            &mut block[start..start + index.segments()],
                        );
                    }
                },
            );

        log::debug!(
            "built {} spline segments ({atom_count} atoms x {AXES} axes x {} \
             segments, {:?} boundary)",
            index.len(),
            index.segments(),
            self.boundary
        );
        Ok(SplineSet::from_parts(index, coefficients))
    }

    /// Fit a single series of samples.
    ///
    /// # Errors
    ///
    /// Returns [`TrajviewError::InsufficientData`] for fewer than two
    /// samples.
    pub fn build_series(
        &self,
        samples: &[f32],
    ) -> Result<Vec<Cubic>, TrajviewError> {
        let n = samples.len();
        if n < 2 {
            return Err(TrajviewError::InsufficientData { timesteps: n });
        }
        let system = self.factor(n)?;
        let mut moments = vec![0.0; n];
        let mut out = vec![Cubic::default(); n - 1];
        self.fit(system.as_ref(), samples, &mut moments, &mut out);
        Ok(out)
    }

    /// Factor the shared system matrix. Two samples need no system.
    fn factor(
        &self,
        n: usize,
    ) -> Result<Option<TridiagonalSystem>, TrajviewError> {
        if n < 3 {
            return Ok(None);
        }
        let h = knot_spacing(n);
        let mut lower = vec![h / 6.0; n];
        let mut diag = vec![2.0 * h / 3.0; n];
        let mut upper = vec![h / 6.0; n];
        match self.boundary {
            SplineBoundary::Natural => {
                diag[0] = 1.0;
                upper[0] = 0.0;
                lower[n - 1] = 0.0;
                diag[n - 1] = 1.0;
            }
            SplineBoundary::Clamped => {
                diag[0] = h / 3.0;
                diag[n - 1] = h / 3.0;
            }
        }
        lower[0] = 0.0;
        upper[n - 1] = 0.0;
        TridiagonalSystem::new(&lower, &diag, &upper)
            .map(Some)
            .ok_or_else(|| {
                TrajviewError::Format(format!(
                    "spline system for {n} timesteps is singular"
                ))
            })
    }

    /// Fit one series into `out` (`samples.len() - 1` segments). `system`
    /// is `None` only for two samples.
    fn fit(
        &self,
        system: Option<&TridiagonalSystem>,
        y: &[f32],
        moments: &mut [f32],
        out: &mut [Cubic],
    ) {
        let n = y.len();
        let Some(system) = system else {
            out[0] = Cubic::linear(y[0], y[1]);
            return;
        };
        let h = knot_spacing(n);
        let inv_h = 1.0 / h;

        for i in 1..n - 1 {
            moments[i] = (y[i + 1] - 2.0 * y[i] + y[i - 1]) * inv_h;
        }
        match self.boundary {
            SplineBoundary::Natural => {
                moments[0] = 0.0;
                moments[n - 1] = 0.0;
            }
            SplineBoundary::Clamped => {
                // Second-order one-sided slope estimates at the ends.
                let s0 = (-3.0 * y[0] + 4.0 * y[1] - y[2]) * 0.5 * inv_h;
                let s1 =
                    (3.0 * y[n - 1] - 4.0 * y[n - 2] + y[n - 3]) * 0.5 * inv_h;
                moments[0] = (y[1] - y[0]) * inv_h - s0;
                moments[n - 1] = s1 - (y[n - 1] - y[n - 2]) * inv_h;
            }
        }
        system.solve_in_place(moments);

        let h2 = h * h;
        for (i, segment) in out.iter_mut().enumerate() {
            let (m0, m1) = (moments[i], moments[i + 1]);
            *segment = Cubic {
                value: y[i],
                linear: (y[i + 1] - y[i]) - h2 * (2.0 * m0 + m1) / 6.0,
                quadratic: h2 * m0 * 0.5,
                cubic: h2 * (m1 - m0) / 6.0,
            };
        }
    }
}

/// Uniform knot spacing in normalized time.
fn knot_spacing(timesteps: usize) -> f32 {
    1.0 / (timesteps - 1) as f32
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::trajectory::{synthetic, unwrap, Trajectory};

    fn series(n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| {
                let x = i as f32 * 0.7;
                x.sin() * 3.0 + 0.2 * x
            })
            .collect()
    }

    fn assert_close(a: f32, b: f32, what: &str) {
        let tol = 1e-4 * a.abs().max(b.abs()).max(1.0);
        assert!((a - b).abs() <= tol, "{what}: {a} vs {b}");
    }

    #[test]
    fn reproduces_knots() {
        for boundary in [SplineBoundary::Natural, SplineBoundary::Clamped] {
            let y = series(12);
            let segs = SplineBuilder::new(boundary).build_series(&y).unwrap();
            assert_eq!(segs.len(), 11);
            for (i, seg) in segs.iter().enumerate() {
                assert_eq!(seg.eval(0.0), y[i]);
                assert_close(seg.eval(1.0), y[i + 1], "segment end");
            }
        }
    }

    #[test]
    fn first_and_second_derivatives_are_continuous() {
        for boundary in [SplineBoundary::Natural, SplineBoundary::Clamped] {
            let y = series(20);
            let segs = SplineBuilder::new(boundary).build_series(&y).unwrap();
            for pair in segs.windows(2) {
                assert_close(
                    pair[0].derivative(1.0),
                    pair[1].derivative(0.0),
                    "slope",
                );
                assert_close(
                    pair[0].second_derivative(1.0),
                    pair[1].second_derivative(0.0),
                    "curvature",
                );
            }
        }
    }

    #[test]
    fn natural_ends_have_zero_curvature() {
        let segs = SplineBuilder::new(SplineBoundary::Natural)
            .build_series(&series(9))
            .unwrap();
        assert_eq!(segs[0].second_derivative(0.0), 0.0);
        assert!(segs[7].second_derivative(1.0).abs() < 1e-3);
    }

    #[test]
    fn straight_line_is_reproduced_exactly_in_shape() {
        let y: Vec<f32> = (0..6).map(|i| 2.0 + 0.5 * i as f32).collect();
        for boundary in [SplineBoundary::Natural, SplineBoundary::Clamped] {
            let segs = SplineBuilder::new(boundary).build_series(&y).unwrap();
            for seg in &segs {
                assert!(seg.quadratic.abs() < 1e-4);
                assert!(seg.cubic.abs() < 1e-4);
                assert_close(seg.linear, 0.5, "slope");
            }
        }
    }

    #[test]
    fn two_samples_give_one_linear_segment() {
        let segs = SplineBuilder::default().build_series(&[1.0, 3.0]).unwrap();
        assert_eq!(segs, vec![Cubic::linear(1.0, 3.0)]);
        assert_eq!(segs[0].eval(0.25), 1.5);
    }

    #[test]
    fn too_few_samples_is_insufficient_data() {
        let err = SplineBuilder::default().build_series(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            TrajviewError::InsufficientData { timesteps: 1 }
        ));

        let traj = Trajectory::new(1, Vec3::splat(5.0), vec![1.0, 2.0, 3.0])
            .unwrap();
        assert!(matches!(
            SplineBuilder::default().build(&unwrap(traj)),
            Err(TrajviewError::InsufficientData { timesteps: 1 })
        ));
    }

    #[test]
    fn zero_atoms_builds_empty_set() {
        let traj = Trajectory::new(0, Vec3::splat(5.0), Vec::new()).unwrap();
        let set = SplineBuilder::default().build(&unwrap(traj)).unwrap();
        assert_eq!(set.atom_count(), 0);
        assert!(set.coefficients().is_empty());
    }

    #[test]
    fn trajectory_build_matches_per_series_build() {
        let mut rng = StdRng::seed_from_u64(5);
        let traj =
            synthetic::random_walk(&mut rng, 7, 15, Vec3::splat(9.0), 1.0);
        let unwrapped = unwrap(traj);
        let builder = SplineBuilder::new(SplineBoundary::Natural);
        let set = builder.build(&unwrapped).unwrap();
        assert_eq!(set.segments(), 14);

        for atom in 0..7 {
            for axis in 0..AXES {
                let y: Vec<f32> = (0..15)
                    .map(|s| unwrapped.sample(s, atom, axis))
                    .collect();
                let expected = builder.build_series(&y).unwrap();
                assert_eq!(set.axis_segments(atom, axis), expected.as_slice());
            }
        }
    }

    #[test]
    fn rebuilding_is_bit_identical() {
        let mut rng = StdRng::seed_from_u64(9);
        let traj =
            synthetic::random_walk(&mut rng, 64, 30, Vec3::splat(12.0), 2.0);
        let unwrapped = unwrap(traj);
        let builder = SplineBuilder::default();
        let a = builder.build(&unwrapped).unwrap();
        let b = builder.build(&unwrapped).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }
}
