//! Background trajectory loading.
//!
//! Parsing, unwrapping and spline construction run on a dedicated thread so
//! the host loop never stalls. A finished load arrives on the main thread
//! as an ordered run of [`PendingUpload`]s through the [`UploadQueue`];
//! progress is published through a lock-free triple buffer.

mod pipeline;
mod upload;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

pub use pipeline::{
    prepare, LoadProgress, LoadSettings, LoadSource, LoadStage, LoadSummary,
    Prepared,
};
pub use upload::{
    coefficient_bytes, CpuSink, Drained, LoadEvent, PendingUpload,
    UploadKind, UploadQueue, UploadSink,
};

use crate::error::TrajviewError;

/// Work request for the loader thread.
#[derive(Debug)]
pub enum LoadRequest {
    /// Load `source` with `settings`.
    Load {
        /// What to load.
        source: LoadSource,
        /// How to load it.
        settings: LoadSettings,
    },
    /// Stop the thread.
    Shutdown,
}

/// Handle to the background loader thread.
pub struct TrajectoryLoader {
    request_tx: mpsc::Sender<LoadRequest>,
    progress: triple_buffer::Output<LoadProgress>,
    loaded: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl TrajectoryLoader {
    /// Spawn the loader thread. Returns the handle and the queue the main
    /// loop drains.
    ///
    /// # Errors
    ///
    /// Returns [`TrajviewError::ThreadSpawn`] if the thread fails to spawn.
    pub fn spawn() -> Result<(Self, UploadQueue), TrajviewError> {
        let (request_tx, request_rx) = mpsc::channel::<LoadRequest>();
        let (event_tx, event_rx) = mpsc::channel::<LoadEvent>();
        let (progress_input, progress_output) =
            triple_buffer::triple_buffer(&LoadProgress::default());
        let loaded = Arc::new(AtomicBool::new(false));

        let thread = std::thread::Builder::new()
            .name("trajectory-loader".into())
            .spawn(move || {
                Self::thread_loop(request_rx, event_tx, progress_input);
            })
            .map_err(TrajviewError::ThreadSpawn)?;

        let queue = UploadQueue::new(event_rx, Arc::clone(&loaded));
        Ok((
            Self {
                request_tx,
                progress: progress_output,
                loaded,
                thread: Some(thread),
            },
            queue,
        ))
    }

    /// Queue a load (non-blocking).
    ///
    /// # Errors
    ///
    /// Returns [`TrajviewError::LoaderDisconnected`] if the thread is gone.
    pub fn submit(
        &self,
        source: LoadSource,
        settings: LoadSettings,
    ) -> Result<(), TrajviewError> {
        log::debug!("queued load of {}", source.name());
        self.request_tx
            .send(LoadRequest::Load { source, settings })
            .map_err(|_| TrajviewError::LoaderDisconnected)
    }

    /// Latest progress snapshot.
    pub fn progress(&mut self) -> LoadProgress {
        *self.progress.read()
    }

    /// Whether a motion has been published on the main thread.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Shut down the background thread and wait for it to finish.
    pub fn shutdown(&mut self) {
        let _ = self.request_tx.send(LoadRequest::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    #[allow(clippy::needless_pass_by_value)]
    fn thread_loop(
        request_rx: mpsc::Receiver<LoadRequest>,
        event_tx: mpsc::Sender<LoadEvent>,
        mut progress: triple_buffer::Input<LoadProgress>,
    ) {
        while let Ok(request) = request_rx.recv() {
            let (source, settings) = match request {
                LoadRequest::Shutdown => break,
                LoadRequest::Load { source, settings } => (source, settings),
            };
            let name = source.name();
            let result =
                prepare(source, &settings, |p| progress.write(p));
            let delivered = match result {
                Ok(prepared) => {
                    progress.write(LoadProgress::at(LoadStage::Queued));
                    enqueue(&event_tx, prepared)
                }
                Err(error) => {
                    progress.write(LoadProgress::at(LoadStage::Failed));
                    event_tx
                        .send(LoadEvent::Failed {
                            source: name,
                            error,
                        })
                        .is_ok()
                }
            };
            if !delivered {
                break;
            }
        }
    }
}

impl Drop for TrajectoryLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Send the uploads of a finished load in their required order.
fn enqueue(events: &mpsc::Sender<LoadEvent>, prepared: Prepared) -> bool {
    let Prepared {
        positions,
        motion,
        summary,
    } = prepared;
    let atom_count = motion.atom_count();
    let timesteps = if atom_count == 0 {
        0
    } else {
        positions.len() / (atom_count * 3)
    };
    let motion = Arc::new(motion);
    [
        PendingUpload::Trajectory {
            positions,
            atom_count,
            timesteps,
        },
        PendingUpload::Coefficients(Arc::clone(&motion)),
        PendingUpload::Positions { atom_count },
        PendingUpload::Publish { motion, summary },
    ]
    .into_iter()
    .all(|upload| events.send(LoadEvent::Upload(upload)).is_ok())
}
