//! Per-frame evaluation of atom positions at a playback phase.

use glam::Vec3;

use super::{Cubic, SplineSet, AXES};
use crate::playback::Phase;
use crate::trajectory::PeriodicBox;

/// Active segment and local parameter for a phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentWeight {
    /// Segment index, always `< segments` (or 0 when there are none).
    pub segment: usize,
    /// Local parameter within the segment, in `[0, 1]`.
    pub u: f32,
}

impl SegmentWeight {
    /// Resolve a raw phase value against `segments` segments.
    ///
    /// `t` is wrapped into `[0, 1)` first (non-finite values become 0).
    /// Rounding can still land exactly on `t * segments == segments`; the
    /// segment index is clamped to the last segment with `u = 1`, which for
    /// a closed loop is the same point as `t = 0`.
    pub fn resolve(t: f32, segments: usize) -> Self {
        if segments == 0 {
            return Self { segment: 0, u: 0.0 };
        }
        let scaled = Phase::new(t).value() * segments as f32;
        let segment = (scaled.floor().max(0.0) as usize).min(segments - 1);
        let u = (scaled - segment as f32).clamp(0.0, 1.0);
        Self { segment, u }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum MotionKind {
    Spline(SplineSet),
    /// Flat `x,y,z` per atom; used when there is nothing to interpolate.
    Static(Vec<f32>),
}

/// Render-facing source of per-atom positions over time.
///
/// Either a full spline set or, for single-frame trajectories, a static
/// frame returned for every phase.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomMotion {
    kind: MotionKind,
    wrap_box: Option<PeriodicBox>,
}

impl AtomMotion {
    /// Motion interpolated by `set`.
    pub fn from_splines(set: SplineSet) -> Self {
        Self {
            kind: MotionKind::Spline(set),
            wrap_box: None,
        }
    }

    /// Motion that never changes. `frame` is flat `x,y,z` per atom; a
    /// trailing partial triple is dropped.
    pub fn from_static(mut frame: Vec<f32>) -> Self {
        frame.truncate(frame.len() / 3 * 3);
        Self {
            kind: MotionKind::Static(frame),
            wrap_box: None,
        }
    }

    /// Fold evaluated positions back into the primary image of `pbox`.
    #[must_use]
    pub fn with_wrapping(mut self, pbox: PeriodicBox) -> Self {
        self.wrap_box = Some(pbox);
        self
    }

    /// Number of atoms.
    pub fn atom_count(&self) -> usize {
        match &self.kind {
            MotionKind::Spline(set) => set.atom_count(),
            MotionKind::Static(frame) => frame.len() / 3,
        }
    }

    /// Whether positions are constant in time.
    pub fn is_static(&self) -> bool {
        matches!(self.kind, MotionKind::Static(_))
    }

    /// Segments per atom per axis (0 for static motion).
    pub fn segments(&self) -> usize {
        match &self.kind {
            MotionKind::Spline(set) => set.segments(),
            MotionKind::Static(_) => 0,
        }
    }

    /// Spline coefficients, if interpolating.
    pub fn splines(&self) -> Option<&SplineSet> {
        match &self.kind {
            MotionKind::Spline(set) => Some(set),
            MotionKind::Static(_) => None,
        }
    }

    /// Segment and local parameter for `phase`.
    pub fn segment_weight(&self, phase: Phase) -> SegmentWeight {
        SegmentWeight::resolve(phase.value(), self.segments())
    }

    /// Write every atom's position at `phase` into `out` as flat `x,y,z`.
    ///
    /// Writes `min(atom_count, out.len() / 3)` atoms and returns that
    /// count, so an undersized buffer is filled as far as it goes.
    pub fn evaluate_into(&self, phase: Phase, out: &mut [f32]) -> usize {
        let written = self.atom_count().min(out.len() / 3);
        match &self.kind {
            MotionKind::Static(frame) => {
                out[..written * 3].copy_from_slice(&frame[..written * 3]);
            }
            MotionKind::Spline(set) => {
                let weight = self.segment_weight(phase);
                for (atom, dst) in
                    out.chunks_exact_mut(3).take(written).enumerate()
                {
                    for (axis, slot) in dst.iter_mut().enumerate() {
                        *slot = sample(set, atom, axis, weight, Cubic::eval);
                    }
                }
            }
        }
        if let Some(pbox) = self.wrap_box {
            for dst in out.chunks_exact_mut(3).take(written) {
                let p = pbox.wrap(Vec3::new(dst[0], dst[1], dst[2]));
                dst.copy_from_slice(&p.to_array());
            }
        }
        written
    }

    /// Every atom's position at `phase`, flat `x,y,z`.
    pub fn evaluate(&self, phase: Phase) -> Vec<f32> {
        let mut out = vec![0.0; self.atom_count() * 3];
        let _ = self.evaluate_into(phase, &mut out);
        out
    }

    /// Position of one atom at `phase`.
    pub fn position(&self, atom: usize, phase: Phase) -> Option<Vec3> {
        if atom >= self.atom_count() {
            return None;
        }
        let p = match &self.kind {
            MotionKind::Static(frame) => Vec3::from_slice(&frame[atom * 3..]),
            MotionKind::Spline(set) => {
                let weight = self.segment_weight(phase);
                Vec3::new(
                    sample(set, atom, 0, weight, Cubic::eval),
                    sample(set, atom, 1, weight, Cubic::eval),
                    sample(set, atom, 2, weight, Cubic::eval),
                )
            }
        };
        Some(self.wrap_box.map_or(p, |pbox| pbox.wrap(p)))
    }

    /// Velocity of one atom at `phase`, in length units per unit phase
    /// (one full playback loop).
    pub fn velocity(&self, atom: usize, phase: Phase) -> Option<Vec3> {
        if atom >= self.atom_count() {
            return None;
        }
        match &self.kind {
            MotionKind::Static(_) => Some(Vec3::ZERO),
            MotionKind::Spline(set) => {
                let weight = self.segment_weight(phase);
                let scale = set.segments() as f32;
                Some(
                    Vec3::new(
                        sample(set, atom, 0, weight, Cubic::derivative),
                        sample(set, atom, 1, weight, Cubic::derivative),
                        sample(set, atom, 2, weight, Cubic::derivative),
                    ) * scale,
                )
            }
        }
    }
}

#[inline]
fn sample(
    set: &SplineSet,
    atom: usize,
    axis: usize,
    weight: SegmentWeight,
    f: fn(&Cubic, f32) -> f32,
) -> f32 {
    debug_assert!(axis < AXES);
    set.segment(atom, axis, weight.segment)
        .map_or(0.0, |c| f(c, weight.u))
}
