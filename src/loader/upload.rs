//! Ordered hand-off of finished loads to the thread that owns the render
//! resources.
//!
//! The loader thread sends a complete load as a run of [`PendingUpload`]s:
//! trajectory buffer, coefficient buffer, output position buffer, then
//! [`PendingUpload::Publish`]. The main loop calls
//! [`UploadQueue::drain_one`] once per frame, so at most one resource is
//! created per frame. Nothing becomes visible until `Publish` is applied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use super::pipeline::LoadSummary;
use crate::error::TrajviewError;
use crate::spline::AtomMotion;

const F32_BYTES: usize = 4;

/// One unit of main-thread work produced by a load.
#[derive(Debug)]
pub enum PendingUpload {
    /// The trajectory the splines were fitted to.
    Trajectory {
        /// Flat timestep-major coordinates.
        positions: Vec<f32>,
        /// Atoms per timestep.
        atom_count: usize,
        /// Timesteps in `positions`.
        timesteps: usize,
    },
    /// Spline coefficients (empty for static motion).
    Coefficients(Arc<AtomMotion>),
    /// Per-frame output buffer for `atom_count * 3` floats.
    Positions {
        /// Atoms to reserve room for.
        atom_count: usize,
    },
    /// Make the new motion current.
    Publish {
        /// Evaluator for the loaded trajectory.
        motion: Arc<AtomMotion>,
        /// What was loaded.
        summary: LoadSummary,
    },
}

impl PendingUpload {
    /// Which step of the sequence this is.
    pub fn kind(&self) -> UploadKind {
        match self {
            Self::Trajectory { .. } => UploadKind::Trajectory,
            Self::Coefficients(_) => UploadKind::Coefficients,
            Self::Positions { .. } => UploadKind::Positions,
            Self::Publish { .. } => UploadKind::Publish,
        }
    }
}

/// Discriminant of [`PendingUpload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Trajectory buffer.
    Trajectory,
    /// Coefficient buffer.
    Coefficients,
    /// Output position buffer.
    Positions,
    /// Publication of the new motion.
    Publish,
}

/// Message from the loader thread.
#[derive(Debug)]
pub enum LoadEvent {
    /// Next upload of a successful load.
    Upload(PendingUpload),
    /// A load failed before anything was queued.
    Failed {
        /// Source label.
        source: String,
        /// Cause.
        error: TrajviewError,
    },
}

/// Receiver of render resources, e.g. GPU buffers.
///
/// The three creation calls stage buffers for the incoming load; whatever
/// the renderer currently reads stays untouched until [`publish`] swaps
/// the staged set in as a whole.
///
/// [`publish`]: UploadSink::publish
pub trait UploadSink {
    /// Stage the trajectory buffer.
    fn upload_trajectory(
        &mut self,
        positions: &[f32],
        atom_count: usize,
        timesteps: usize,
    ) -> Result<(), TrajviewError>;

    /// Stage the coefficient buffer.
    fn upload_coefficients(
        &mut self,
        motion: &AtomMotion,
    ) -> Result<(), TrajviewError>;

    /// Stage the output position buffer.
    fn create_position_buffer(
        &mut self,
        atom_count: usize,
    ) -> Result<(), TrajviewError>;

    /// Replace the buffers in use with the staged ones, right before
    /// `motion` becomes current.
    ///
    /// # Errors
    ///
    /// Returns [`TrajviewError::ResourceCreation`] if a buffer of the load
    /// was never staged.
    fn publish(
        &mut self,
        motion: &Arc<AtomMotion>,
        summary: &LoadSummary,
    ) -> Result<(), TrajviewError>;
}

/// Result of one [`UploadQueue::drain_one`] call that did something.
#[derive(Debug)]
pub enum Drained {
    /// A resource was created.
    Uploaded(UploadKind),
    /// A load finished; its motion is now current.
    Published(LoadSummary),
    /// The loader reported a failed load.
    LoadFailed {
        /// Source label.
        source: String,
        /// Cause.
        error: TrajviewError,
    },
    /// The sink failed; the queue is terminated.
    SinkFailed(TrajviewError),
}

/// Main-thread end of the loader channel.
pub struct UploadQueue {
    events: mpsc::Receiver<LoadEvent>,
    loaded: Arc<AtomicBool>,
    motion: Option<Arc<AtomMotion>>,
    summary: Option<LoadSummary>,
    terminated: bool,
    disconnected: bool,
}

impl UploadQueue {
    pub(crate) fn new(
        events: mpsc::Receiver<LoadEvent>,
        loaded: Arc<AtomicBool>,
    ) -> Self {
        Self {
            events,
            loaded,
            motion: None,
            summary: None,
            terminated: false,
            disconnected: false,
        }
    }

    /// Apply at most one pending event to `sink`. Returns `None` when
    /// there was nothing to do or the queue is terminated.
    pub fn drain_one<S: UploadSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Option<Drained> {
        if self.terminated {
            return None;
        }
        let event = match self.events.try_recv() {
            Ok(event) => event,
            Err(mpsc::TryRecvError::Empty) => return None,
            Err(mpsc::TryRecvError::Disconnected) => {
                if !self.disconnected {
                    log::warn!("{}", TrajviewError::LoaderDisconnected);
                    self.disconnected = true;
                }
                return None;
            }
        };

        match event {
            LoadEvent::Failed { source, error } => {
                log::error!("failed to load {source}: {error}");
                Some(Drained::LoadFailed { source, error })
            }
            LoadEvent::Upload(upload) => match self.apply(sink, upload) {
                Ok(drained) => Some(drained),
                Err(e) => {
                    log::error!("upload failed, terminating: {e}");
                    self.terminated = true;
                    Some(Drained::SinkFailed(e))
                }
            },
        }
    }

    fn apply<S: UploadSink + ?Sized>(
        &mut self,
        sink: &mut S,
        upload: PendingUpload,
    ) -> Result<Drained, TrajviewError> {
        let kind = upload.kind();
        match upload {
            PendingUpload::Trajectory {
                positions,
                atom_count,
                timesteps,
            } => sink.upload_trajectory(&positions, atom_count, timesteps)?,
            PendingUpload::Coefficients(motion) => {
                sink.upload_coefficients(&motion)?;
            }
            PendingUpload::Positions { atom_count } => {
                sink.create_position_buffer(atom_count)?;
            }
            PendingUpload::Publish { motion, summary } => {
                sink.publish(&motion, &summary)?;
                log::info!(
                    "{} ready: {} atoms, {} segments",
                    summary.source,
                    summary.atom_count,
                    summary.segments
                );
                self.motion = Some(motion);
                self.summary = Some(summary.clone());
                self.loaded.store(true, Ordering::Release);
                return Ok(Drained::Published(summary));
            }
        }
        log::debug!("applied {kind:?} upload");
        Ok(Drained::Uploaded(kind))
    }

    /// Whether a motion has been published.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Whether a sink failure requires the host to shut down.
    pub fn should_terminate(&self) -> bool {
        self.terminated
    }

    /// The current motion, once published.
    pub fn motion(&self) -> Option<&Arc<AtomMotion>> {
        self.motion.as_ref()
    }

    /// Summary of the current motion, once published.
    pub fn summary(&self) -> Option<&LoadSummary> {
        self.summary.as_ref()
    }
}

/// Sink that keeps every buffer in host memory.
///
/// Used by the headless binary and in tests; `byte_limit` emulates a device
/// buffer size limit.
#[derive(Debug, Default)]
pub struct CpuSink {
    trajectory: Vec<f32>,
    coefficients: Vec<u8>,
    positions: Vec<f32>,
    staged_trajectory: Option<Vec<f32>>,
    staged_coefficients: Option<Vec<u8>>,
    staged_positions: Option<Vec<f32>>,
    byte_limit: Option<usize>,
    uploads: usize,
}

impl CpuSink {
    /// Sink without a size limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that rejects any buffer larger than `bytes`.
    pub fn with_byte_limit(bytes: usize) -> Self {
        Self {
            byte_limit: Some(bytes),
            ..Self::default()
        }
    }

    /// Published trajectory buffer.
    pub fn trajectory(&self) -> &[f32] {
        &self.trajectory
    }

    /// Published coefficient bytes.
    pub fn coefficients(&self) -> &[u8] {
        &self.coefficients
    }

    /// Output position buffer.
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Output position buffer, for per-frame evaluation.
    pub fn positions_mut(&mut self) -> &mut [f32] {
        &mut self.positions
    }

    /// Number of buffers staged so far.
    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    fn check(&self, what: &str, bytes: usize) -> Result<(), TrajviewError> {
        match self.byte_limit {
            Some(limit) if bytes > limit => {
                Err(TrajviewError::ResourceCreation(format!(
                    "{what} buffer of {bytes} bytes exceeds limit of {limit}"
                )))
            }
            _ => Ok(()),
        }
    }
}

impl UploadSink for CpuSink {
    fn upload_trajectory(
        &mut self,
        positions: &[f32],
        _atom_count: usize,
        _timesteps: usize,
    ) -> Result<(), TrajviewError> {
        let bytes: &[u8] = bytemuck::cast_slice(positions);
        self.check("trajectory", bytes.len())?;
        self.staged_trajectory = Some(positions.to_vec());
        self.uploads += 1;
        Ok(())
    }

    fn upload_coefficients(
        &mut self,
        motion: &AtomMotion,
    ) -> Result<(), TrajviewError> {
        let bytes = match motion.splines() {
            Some(set) => set.as_bytes(),
            None => &[],
        };
        self.check("coefficient", bytes.len())?;
        self.staged_coefficients = Some(bytes.to_vec());
        self.uploads += 1;
        Ok(())
    }

    fn create_position_buffer(
        &mut self,
        atom_count: usize,
    ) -> Result<(), TrajviewError> {
        let floats = atom_count * 3;
        self.check("position", floats * F32_BYTES)?;
        self.staged_positions = Some(vec![0.0; floats]);
        self.uploads += 1;
        Ok(())
    }

    fn publish(
        &mut self,
        _motion: &Arc<AtomMotion>,
        summary: &LoadSummary,
    ) -> Result<(), TrajviewError> {
        let staged = (
            self.staged_trajectory.take(),
            self.staged_coefficients.take(),
            self.staged_positions.take(),
        );
        let (Some(trajectory), Some(coefficients), Some(positions)) = staged
        else {
            return Err(TrajviewError::ResourceCreation(format!(
                "{}: publish before every buffer was staged",
                summary.source
            )));
        };
        self.trajectory = trajectory;
        self.coefficients = coefficients;
        self.positions = positions;
        Ok(())
    }
}

/// Bytes of coefficient data a motion will upload.
pub fn coefficient_bytes(motion: &AtomMotion) -> usize {
    motion.splines().map_or(0, |set| set.as_bytes().len())
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::loader::pipeline::{prepare, LoadSettings, LoadSource};
    use crate::trajectory::synthetic;

    fn queued(
        atom_count: usize,
    ) -> (mpsc::Sender<LoadEvent>, UploadQueue, Vec<PendingUpload>) {
        let (tx, rx) = mpsc::channel();
        let queue = UploadQueue::new(rx, Arc::new(AtomicBool::new(false)));
        let prepared = prepare(
            LoadSource::Memory {
                name: "orbit".to_owned(),
                trajectory: synthetic::orbit(atom_count, 8, Vec3::splat(10.0)),
            },
            &LoadSettings::default(),
            |_| {},
        )
        .unwrap();
        let motion = Arc::new(prepared.motion);
        let timesteps = prepared.positions.len() / (atom_count * 3);
        let uploads = vec![
            PendingUpload::Trajectory {
                positions: prepared.positions,
                atom_count,
                timesteps,
            },
            PendingUpload::Coefficients(Arc::clone(&motion)),
            PendingUpload::Positions { atom_count },
            PendingUpload::Publish {
                motion,
                summary: prepared.summary,
            },
        ];
        (tx, queue, uploads)
    }

    #[test]
    fn drains_one_upload_per_call_in_order() {
        let (tx, mut queue, uploads) = queued(3);
        for upload in uploads {
            tx.send(LoadEvent::Upload(upload)).unwrap();
        }
        let mut sink = CpuSink::new();

        let mut kinds = Vec::new();
        while let Some(drained) = queue.drain_one(&mut sink) {
            match drained {
                Drained::Uploaded(kind) => {
                    assert!(!queue.is_loaded());
                    kinds.push(kind);
                }
                Drained::Published(summary) => {
                    assert_eq!(summary.atom_count, 3);
                    kinds.push(UploadKind::Publish);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(
            kinds,
            vec![
                UploadKind::Trajectory,
                UploadKind::Coefficients,
                UploadKind::Positions,
                UploadKind::Publish,
            ]
        );
        assert!(queue.is_loaded());
        assert_eq!(sink.upload_count(), 3);
        assert_eq!(sink.positions().len(), 9);
        assert_eq!(sink.trajectory().len(), 9 * 9);
        let motion = queue.motion().unwrap();
        assert_eq!(sink.coefficients().len(), coefficient_bytes(motion));
        assert_eq!(queue.summary().unwrap().segments, 8);
    }

    #[test]
    fn reload_keeps_published_buffers_until_publish() {
        let (tx, mut queue, first) = queued(2);
        for upload in first {
            tx.send(LoadEvent::Upload(upload)).unwrap();
        }
        let mut sink = CpuSink::new();
        while queue.drain_one(&mut sink).is_some() {}
        assert!(queue.is_loaded());

        let (_tx, _queue, second) = queued(5);
        for upload in second {
            tx.send(LoadEvent::Upload(upload)).unwrap();
        }
        for _ in 0..3 {
            assert!(matches!(
                queue.drain_one(&mut sink),
                Some(Drained::Uploaded(_))
            ));
            let motion = queue.motion().unwrap();
            assert_eq!(motion.atom_count(), 2);
            assert_eq!(sink.positions().len(), 2 * 3);
            assert_eq!(sink.trajectory().len(), 9 * 2 * 3);
            assert_eq!(sink.coefficients().len(), coefficient_bytes(motion));
        }

        assert!(matches!(
            queue.drain_one(&mut sink),
            Some(Drained::Published(_))
        ));
        let motion = queue.motion().unwrap();
        assert_eq!(motion.atom_count(), 5);
        assert_eq!(sink.positions().len(), 5 * 3);
        assert_eq!(sink.trajectory().len(), 9 * 5 * 3);
        assert_eq!(sink.coefficients().len(), coefficient_bytes(motion));
    }

    #[test]
    fn failure_mid_reload_leaves_published_buffers_intact() {
        let (tx, mut queue, first) = queued(1);
        for upload in first {
            tx.send(LoadEvent::Upload(upload)).unwrap();
        }
        // One atom needs 108 trajectory and 384 coefficient bytes.
        let mut sink = CpuSink::with_byte_limit(400);
        while queue.drain_one(&mut sink).is_some() {}
        assert!(queue.is_loaded());
        let coefficients = sink.coefficients().to_vec();

        // Three atoms stage their trajectory, then overflow on coefficients.
        let (_tx, _queue, second) = queued(3);
        for upload in second {
            tx.send(LoadEvent::Upload(upload)).unwrap();
        }
        assert!(matches!(
            queue.drain_one(&mut sink),
            Some(Drained::Uploaded(UploadKind::Trajectory))
        ));
        assert!(matches!(
            queue.drain_one(&mut sink),
            Some(Drained::SinkFailed(TrajviewError::ResourceCreation(_)))
        ));
        assert!(queue.should_terminate());
        assert_eq!(queue.motion().unwrap().atom_count(), 1);
        assert_eq!(sink.positions().len(), 3);
        assert_eq!(sink.trajectory().len(), 9 * 3);
        assert_eq!(sink.coefficients(), &coefficients[..]);
    }

    #[test]
    fn sink_failure_terminates_without_publishing() {
        let (tx, mut queue, uploads) = queued(2);
        for upload in uploads {
            tx.send(LoadEvent::Upload(upload)).unwrap();
        }
        let mut sink = CpuSink::with_byte_limit(16);
        assert!(matches!(
            queue.drain_one(&mut sink),
            Some(Drained::SinkFailed(TrajviewError::ResourceCreation(_)))
        ));
        assert!(queue.should_terminate());
        assert!(queue.drain_one(&mut sink).is_none());
        assert!(!queue.is_loaded());
        assert!(queue.motion().is_none());
    }

    #[test]
    fn failed_load_publishes_nothing() {
        let (tx, rx) = mpsc::channel();
        let mut queue = UploadQueue::new(rx, Arc::new(AtomicBool::new(false)));
        tx.send(LoadEvent::Failed {
            source: "broken.traj".to_owned(),
            error: TrajviewError::Format("truncated".to_owned()),
        })
        .unwrap();
        let mut sink = CpuSink::new();
        assert!(matches!(
            queue.drain_one(&mut sink),
            Some(Drained::LoadFailed { .. })
        ));
        assert!(queue.drain_one(&mut sink).is_none());
        assert!(!queue.is_loaded());
        assert!(!queue.should_terminate());
        assert_eq!(sink.upload_count(), 0);
    }

    #[test]
    fn disconnected_queue_is_idle() {
        let (tx, rx) = mpsc::channel::<LoadEvent>();
        let mut queue = UploadQueue::new(rx, Arc::new(AtomicBool::new(false)));
        drop(tx);
        let mut sink = CpuSink::new();
        assert!(queue.drain_one(&mut sink).is_none());
        assert!(queue.drain_one(&mut sink).is_none());
    }
}
