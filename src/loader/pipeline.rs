//! The work done for one load request: parse, close the loop, unwrap and
//! fit. Runs on the loader thread but has no threading of its own, so it
//! can also be called directly.

use std::path::PathBuf;

use glam::Vec3;

use crate::error::TrajviewError;
use crate::options::{InterpolationOptions, LoadOptions, Options};
use crate::spline::{AtomMotion, SplineBuilder};
use crate::trajectory::unwrap::passthrough;
use crate::trajectory::{load_file, unwrap, Bounds, Trajectory};

/// Where a trajectory comes from.
#[derive(Debug)]
pub enum LoadSource {
    /// A trajectory file on disk.
    File(PathBuf),
    /// An already parsed trajectory (synthetic data, tests).
    Memory {
        /// Label used in logs and the load summary.
        name: String,
        /// The trajectory itself.
        trajectory: Trajectory,
    },
}

impl LoadSource {
    /// Label for logs.
    pub fn name(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Memory { name, .. } => name.clone(),
        }
    }
}

/// The subset of [`Options`] a load depends on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadSettings {
    /// File format and preprocessing.
    pub loading: LoadOptions,
    /// Spline boundary and output wrapping.
    pub interpolation: InterpolationOptions,
}

impl From<&Options> for LoadSettings {
    fn from(options: &Options) -> Self {
        Self {
            loading: options.loading.clone(),
            interpolation: options.interpolation.clone(),
        }
    }
}

/// Coarse position of a load in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStage {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// Reading and parsing the source.
    Parsing,
    /// Removing periodic jumps.
    Unwrapping,
    /// Fitting splines.
    Building,
    /// Every upload is queued for the main thread.
    Queued,
    /// The load failed; nothing was queued.
    Failed,
}

/// Progress snapshot published by the loader thread.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoadProgress {
    /// Current stage.
    pub stage: LoadStage,
    /// Rough completion in `[0, 1]`.
    pub fraction: f32,
}

impl LoadProgress {
    /// Progress at the start of `stage`.
    pub fn at(stage: LoadStage) -> Self {
        let fraction = match stage {
            LoadStage::Idle | LoadStage::Parsing | LoadStage::Failed => 0.0,
            LoadStage::Unwrapping => 0.25,
            LoadStage::Building => 0.5,
            LoadStage::Queued => 1.0,
        };
        Self { stage, fraction }
    }
}

/// What a finished load produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    /// Source label.
    pub source: String,
    /// Atoms per timestep.
    pub atom_count: usize,
    /// Timesteps in the source, before loop closing.
    pub recorded_timesteps: usize,
    /// Spline segments per atom per axis (0 for static motion).
    pub segments: usize,
    /// Whether the first timestep was appended after the last.
    pub closed_loop: bool,
    /// Whether cyclic correction ran.
    pub unwrapped: bool,
    /// Whether evaluated positions are folded into the primary box.
    pub wrapped: bool,
    /// Axes left wrapped because of an invalid box length.
    pub skipped_axes: Vec<usize>,
    /// Whether there was too little data to interpolate.
    pub is_static: bool,
    /// Periodic box dimensions.
    pub dims: Vec3,
    /// Bounds of the recorded coordinates.
    pub bounds: Bounds,
}

/// Output of [`prepare`]: everything the main thread needs to upload.
#[derive(Debug)]
pub struct Prepared {
    /// Trajectory buffer the splines were fitted to (unwrapped, closed).
    pub positions: Vec<f32>,
    /// Evaluator over the fitted splines.
    pub motion: AtomMotion,
    /// Load summary.
    pub summary: LoadSummary,
}

/// Run the full load pipeline, reporting each stage to `report`.
///
/// A trajectory with a single timestep yields static motion instead of an
/// error. A closed, unwrapped loop is always folded into the box: its
/// closing frame sits whole box images away from the first one whenever an
/// atom drifted across a face, and only the folded positions meet at the
/// seam.
///
/// # Errors
///
/// Returns I/O and [`TrajviewError::Format`] errors from parsing, and
/// [`TrajviewError::Format`] for atoms without any timestep.
pub fn prepare(
    source: LoadSource,
    settings: &LoadSettings,
    mut report: impl FnMut(LoadProgress),
) -> Result<Prepared, TrajviewError> {
    report(LoadProgress::at(LoadStage::Parsing));
    let name = source.name();
    let mut trajectory = match source {
        LoadSource::File(path) => load_file(&path, settings.loading.format)?,
        LoadSource::Memory { trajectory, .. } => trajectory,
    };

    let atom_count = trajectory.atom_count();
    let recorded_timesteps = trajectory.timesteps();
    if atom_count > 0 && recorded_timesteps == 0 {
        return Err(TrajviewError::Format(format!(
            "{name}: {atom_count} atoms but no timesteps"
        )));
    }
    let dims = trajectory.dims();
    let bounds = trajectory.bounds();
    log::info!(
        "loaded {name}: {atom_count} atoms, {recorded_timesteps} steps, box \
         [{}, {}, {}]",
        dims.x,
        dims.y,
        dims.z
    );

    let closed_loop = settings.loading.close_loop && recorded_timesteps > 1;
    if closed_loop {
        trajectory.close_loop();
    }

    report(LoadProgress::at(LoadStage::Unwrapping));
    let unwrapped = if settings.loading.unwrap_periodic {
        unwrap(trajectory)
    } else {
        passthrough(trajectory)
    };
    let skipped_axes = unwrapped
        .skipped_axes()
        .iter()
        .filter_map(|e| match e {
            TrajviewError::Configuration { axis, .. } => Some(*axis),
            _ => None,
        })
        .collect();

    report(LoadProgress::at(LoadStage::Building));
    let builder = SplineBuilder::new(settings.interpolation.boundary);
    let motion = match builder.build(&unwrapped) {
        Ok(set) => AtomMotion::from_splines(set),
        Err(e @ TrajviewError::InsufficientData { .. }) => {
            log::warn!("{name}: {e}; showing a static frame");
            let first = unwrapped
                .positions()
                .get(..atom_count * 3)
                .map(<[f32]>::to_vec)
                .unwrap_or_default();
            AtomMotion::from_static(first)
        }
        Err(e) => return Err(e),
    };
    let wrapped = settings.interpolation.wrap_into_box
        || (closed_loop && settings.loading.unwrap_periodic);
    let motion = if wrapped {
        motion.with_wrapping(unwrapped.periodic_box())
    } else {
        motion
    };

    let summary = LoadSummary {
        source: name,
        atom_count,
        recorded_timesteps,
        segments: motion.segments(),
        closed_loop,
        unwrapped: settings.loading.unwrap_periodic,
        wrapped,
        skipped_axes,
        is_static: motion.is_static(),
        dims,
        bounds,
    };
    Ok(Prepared {
        positions: unwrapped.into_positions(),
        motion,
        summary,
    })
}
