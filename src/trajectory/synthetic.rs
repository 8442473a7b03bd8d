//! Synthetic trajectories: random walks folded into a periodic box.
//!
//! Used by the demo mode of the binary, the benches, and the property-style
//! tests for unwrapping and spline construction.

use glam::Vec3;
use rand::Rng;

use super::Trajectory;

/// Random walk of `atom_count` atoms over `timesteps` steps, wrapped into
/// `[0, dims)`. Each step moves every coordinate by at most `max_step`.
pub fn random_walk<R: Rng>(
    rng: &mut R,
    atom_count: usize,
    timesteps: usize,
    dims: Vec3,
    max_step: f32,
) -> Trajectory {
    random_walk_with_truth(rng, atom_count, timesteps, dims, max_step).0
}

/// Like [`random_walk`], also returning the unwrapped walk it was folded
/// from (flat, timestep-major).
pub fn random_walk_with_truth<R: Rng>(
    rng: &mut R,
    atom_count: usize,
    timesteps: usize,
    dims: Vec3,
    max_step: f32,
) -> (Trajectory, Vec<f32>) {
    let stride = atom_count * 3;
    let mut truth = Vec::with_capacity(stride * timesteps);

    if timesteps > 0 {
        for _ in 0..atom_count {
            truth.extend_from_slice(&[
                rng.random::<f32>() * dims.x,
                rng.random::<f32>() * dims.y,
                rng.random::<f32>() * dims.z,
            ]);
        }
    }
    for step in 1..timesteps {
        let prev = (step - 1) * stride;
        for i in 0..stride {
            let delta = rng.random_range(-1.0..=1.0f32) * max_step;
            truth.push(truth[prev + i] + delta);
        }
    }

    let wrapped = truth
        .chunks_exact(3)
        .flat_map(|p| {
            let w = fold(Vec3::new(p[0], p[1], p[2]), dims);
            [w.x, w.y, w.z]
        })
        .collect();

    // Length is a whole number of timesteps by construction.
    let trajectory = Trajectory::new(atom_count, dims, wrapped)
        .unwrap_or_else(|_| empty(dims));
    (trajectory, truth)
}

/// Atoms circling the box center, one full turn over the trajectory.
/// Closed loops of this walk have no net drift.
pub fn orbit(atom_count: usize, timesteps: usize, dims: Vec3) -> Trajectory {
    let center = dims * 0.5;
    let radius = dims.min_element() * 0.25;
    let mut positions = Vec::with_capacity(atom_count * 3 * timesteps);
    for step in 0..timesteps {
        let angle = std::f32::consts::TAU * step as f32 / timesteps.max(1) as f32;
        for atom in 0..atom_count {
            let phase = angle + atom as f32 * 0.37;
            let lift = (atom as f32 * 0.61).sin() * radius * 0.5;
            positions.extend_from_slice(&[
                center.x + radius * phase.cos(),
                center.y + radius * phase.sin(),
                center.z + lift,
            ]);
        }
    }
    Trajectory::new(atom_count, dims, positions)
        .unwrap_or_else(|_| empty(dims))
}

fn fold(p: Vec3, dims: Vec3) -> Vec3 {
    Vec3::new(
        p.x.rem_euclid(dims.x),
        p.y.rem_euclid(dims.y),
        p.z.rem_euclid(dims.z),
    )
}

fn empty(dims: Vec3) -> Trajectory {
    Trajectory {
        atom_count: 0,
        dims,
        positions: Vec::new(),
        bounds: super::Bounds::EMPTY,
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn walk_stays_in_box() {
        let mut rng = StdRng::seed_from_u64(3);
        let dims = Vec3::new(5.0, 6.0, 7.0);
        let traj = random_walk(&mut rng, 10, 25, dims, 1.0);
        assert_eq!(traj.timesteps(), 25);
        let bounds = traj.bounds();
        assert!(bounds.low.cmpge(Vec3::ZERO).all());
        assert!(bounds.up.cmple(dims).all());
    }

    #[test]
    fn orbit_is_periodic() {
        let traj = orbit(3, 12, Vec3::splat(20.0));
        assert_eq!(traj.timesteps(), 12);
        let first = traj.position(0, 1).unwrap();
        let last = traj.position(11, 1).unwrap();
        // One step short of a full turn.
        assert!(first.distance(last) < 3.0);
    }
}
