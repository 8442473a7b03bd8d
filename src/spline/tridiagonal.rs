//! Thomas-algorithm solver for tridiagonal systems.
//!
//! The spline system has the same matrix for every atom and axis of a
//! trajectory, only the right-hand side changes. The elimination factors of
//! the forward sweep depend on the matrix alone, so they are computed once
//! in [`TridiagonalSystem::new`] and each solve is two linear passes over
//! the right-hand side.

/// Factored tridiagonal matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct TridiagonalSystem {
    /// Sub-diagonal; `lower[0]` is unused.
    lower: Vec<f32>,
    /// Modified super-diagonal `c'_i` from the forward sweep.
    upper_prime: Vec<f32>,
    /// Reciprocal pivots `1 / (b_i - a_i c'_{i-1})`.
    inv_pivot: Vec<f32>,
}

impl TridiagonalSystem {
    /// Factor the matrix with sub-diagonal `lower`, diagonal `diag` and
    /// super-diagonal `upper` (all of length `n`; `lower[0]` and
    /// `upper[n-1]` are ignored).
    ///
    /// Returns `None` if the slices disagree in length or a pivot vanishes.
    /// Diagonally dominant matrices, such as the spline system, never hit a
    /// zero pivot.
    pub fn new(lower: &[f32], diag: &[f32], upper: &[f32]) -> Option<Self> {
        let n = diag.len();
        if lower.len() != n || upper.len() != n {
            return None;
        }
        let mut upper_prime = vec![0.0; n];
        let mut inv_pivot = vec![0.0; n];
        for i in 0..n {
            let pivot = if i == 0 {
                diag[0]
            } else {
                diag[i] - lower[i] * upper_prime[i - 1]
            };
            if !pivot.is_finite()
                || pivot == 0.0
                || pivot.abs() <= f32::EPSILON * diag[i].abs()
            {
                return None;
            }
            inv_pivot[i] = 1.0 / pivot;
            if i + 1 < n {
                upper_prime[i] = upper[i] * inv_pivot[i];
            }
        }
        Some(Self {
            lower: lower.to_vec(),
            upper_prime,
            inv_pivot,
        })
    }

    /// Dimension of the system.
    pub fn len(&self) -> usize {
        self.inv_pivot.len()
    }

    /// Whether the system has no unknowns.
    pub fn is_empty(&self) -> bool {
        self.inv_pivot.is_empty()
    }

    /// Solve in place: on return `rhs` holds the solution.
    ///
    /// `rhs` must have length [`TridiagonalSystem::len`].
    pub fn solve_in_place(&self, rhs: &mut [f32]) {
        let n = self.len();
        debug_assert_eq!(rhs.len(), n);
        if n == 0 {
            return;
        }

        rhs[0] *= self.inv_pivot[0];
        for i in 1..n {
            rhs[i] = (rhs[i] - self.lower[i] * rhs[i - 1]) * self.inv_pivot[i];
        }
        for i in (0..n - 1).rev() {
            rhs[i] -= self.upper_prime[i] * rhs[i + 1];
        }
    }
}
