//! Cubic-spline reconstruction of atom motion between recorded timesteps.
//!
//! The pipeline is split into three stages:
//!
//! - [`tridiagonal`]: Thomas-algorithm solver for the second-derivative
//!   system.
//! - [`builder`]: one-time construction of per-atom, per-axis cubic segments
//!   from an unwrapped trajectory.
//! - [`evaluate`]: per-frame evaluation of every atom at a playback phase.
//!
//! Coefficients are stored in the local segment parameter `u ∈ [0, 1]`, so a
//! consumer (CPU here, or a compute shader reading the uploaded buffer)
//! evaluates `value + u·linear + u²·quadratic + u³·cubic` with no further
//! scaling.

pub mod builder;
pub mod evaluate;
pub mod tridiagonal;

use bytemuck::{Pod, Zeroable};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use builder::SplineBuilder;
pub use evaluate::{AtomMotion, SegmentWeight};

/// Spatial axes per atom.
pub const AXES: usize = 3;

/// End conditions for the spline system.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SplineBoundary {
    /// Zero second derivative at both ends.
    #[default]
    Natural,
    /// End slopes fixed to one-sided second-order difference estimates.
    Clamped,
}

/// One cubic segment in the local parameter `u ∈ [0, 1]`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Cubic {
    /// Position at `u = 0`.
    pub value: f32,
    /// Coefficient of `u`.
    pub linear: f32,
    /// Coefficient of `u²`.
    pub quadratic: f32,
    /// Coefficient of `u³`.
    pub cubic: f32,
}

impl Cubic {
    /// Straight line from `a` (at `u = 0`) to `b` (at `u = 1`).
    pub fn linear(a: f32, b: f32) -> Self {
        Self {
            value: a,
            linear: b - a,
            quadratic: 0.0,
            cubic: 0.0,
        }
    }

    /// Constant segment.
    pub fn constant(a: f32) -> Self {
        Self {
            value: a,
            ..Self::default()
        }
    }

    /// Evaluate at `u` (Horner form).
    #[inline]
    pub fn eval(&self, u: f32) -> f32 {
        ((self.cubic * u + self.quadratic) * u + self.linear) * u + self.value
    }

    /// First derivative with respect to `u`.
    #[inline]
    pub fn derivative(&self, u: f32) -> f32 {
        (3.0 * self.cubic * u + 2.0 * self.quadratic) * u + self.linear
    }

    /// Second derivative with respect to `u`.
    #[inline]
    pub fn second_derivative(&self, u: f32) -> f32 {
        6.0 * self.cubic * u + 2.0 * self.quadratic
    }
}

/// Strided index into a flat coefficient buffer laid out as
/// `[atom][axis][segment]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoefficientIndex {
    atom_count: usize,
    segments: usize,
}

impl CoefficientIndex {
    /// Index for `atom_count` atoms with `segments` segments per axis.
    pub fn new(atom_count: usize, segments: usize) -> Self {
        Self {
            atom_count,
            segments,
        }
    }

    /// Number of atoms.
    pub fn atom_count(&self) -> usize {
        self.atom_count
    }

    /// Segments per atom per axis.
    pub fn segments(&self) -> usize {
        self.segments
    }

    /// Segments stored for one atom (all axes).
    pub fn atom_stride(&self) -> usize {
        AXES * self.segments
    }

    /// Total number of segments in the buffer.
    pub fn len(&self) -> usize {
        self.atom_count * self.atom_stride()
    }

    /// Whether the buffer holds no segments.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat offset of one segment.
    #[inline]
    pub fn offset(&self, atom: usize, axis: usize, segment: usize) -> usize {
        debug_assert!(atom < self.atom_count);
        debug_assert!(axis < AXES);
        debug_assert!(segment < self.segments);
        atom * self.atom_stride() + axis * self.segments + segment
    }

    /// Offset of the first segment of `axis` for `atom`, relative to the
    /// start of that atom's block.
    #[inline]
    pub fn axis_offset(&self, axis: usize) -> usize {
        axis * self.segments
    }
}

/// Complete coefficient set for one loaded trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct SplineSet {
    index: CoefficientIndex,
    coefficients: Vec<Cubic>,
}

impl SplineSet {
    /// Wrap a coefficient buffer. `coefficients.len()` must equal
    /// `index.len()`.
    pub(crate) fn from_parts(
        index: CoefficientIndex,
        coefficients: Vec<Cubic>,
    ) -> Self {
        debug_assert_eq!(index.len(), coefficients.len());
        Self {
            index,
            coefficients,
        }
    }

    /// Layout of the buffer.
    pub fn index(&self) -> CoefficientIndex {
        self.index
    }

    /// Number of atoms.
    pub fn atom_count(&self) -> usize {
        self.index.atom_count
    }

    /// Segments per atom per axis (`timesteps - 1`).
    pub fn segments(&self) -> usize {
        self.index.segments
    }

    /// One segment, or `None` when out of range.
    pub fn segment(
        &self,
        atom: usize,
        axis: usize,
        segment: usize,
    ) -> Option<&Cubic> {
        if atom >= self.index.atom_count
            || axis >= AXES
            || segment >= self.index.segments
        {
            return None;
        }
        self.coefficients
            .get(self.index.offset(atom, axis, segment))
    }

    /// All segments of one atom on one axis, in time order.
    pub fn axis_segments(&self, atom: usize, axis: usize) -> &[Cubic] {
        if atom >= self.index.atom_count || axis >= AXES {
            return &[];
        }
        let start = self.index.offset(atom, axis, 0);
        &self.coefficients[start..start + self.index.segments]
    }

    /// Flat coefficient buffer.
    pub fn coefficients(&self) -> &[Cubic] {
        &self.coefficients
    }

    /// Coefficient buffer as raw bytes for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.coefficients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cubic_eval_matches_expanded_form() {
        let c = Cubic {
            value: 1.0,
            linear: 2.0,
            quadratic: -3.0,
            cubic: 0.5,
        };
        let u = 0.3f32;
        let expanded = 1.0 + 2.0 * u - 3.0 * u * u + 0.5 * u * u * u;
        assert!((c.eval(u) - expanded).abs() < 1e-6);
        assert!((c.derivative(u) - (2.0 - 6.0 * u + 1.5 * u * u)).abs() < 1e-6);
        assert!((c.second_derivative(u) - (-6.0 + 3.0 * u)).abs() < 1e-6);
    }

    #[test]
    fn index_is_atom_then_axis_then_segment() {
        let index = CoefficientIndex::new(4, 5);
        assert_eq!(index.len(), 60);
        assert_eq!(index.offset(0, 0, 0), 0);
        assert_eq!(index.offset(0, 1, 0), 5);
        assert_eq!(index.offset(0, 2, 4), 14);
        assert_eq!(index.offset(1, 0, 0), 15);
        assert_eq!(index.offset(3, 2, 4), 59);
    }

    #[test]
    fn set_accessors_bound_check() {
        let index = CoefficientIndex::new(1, 2);
        let coeffs = (0..6).map(|i| Cubic::constant(i as f32)).collect();
        let set = SplineSet::from_parts(index, coeffs);
        assert_eq!(set.segment(0, 1, 1).map(|c| c.value), Some(3.0));
        assert!(set.segment(1, 0, 0).is_none());
        assert!(set.segment(0, 3, 0).is_none());
        assert_eq!(set.axis_segments(0, 2).len(), 2);
        assert!(set.axis_segments(2, 0).is_empty());
        assert_eq!(set.as_bytes().len(), 6 * 16);
    }
}
