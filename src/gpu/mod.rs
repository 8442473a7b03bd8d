//! wgpu upload sink.
//!
//! Turns the loader's [`PendingUpload`](crate::loader::PendingUpload)
//! sequence into storage buffers a compute or vertex shader can read: the
//! trajectory buffer, the `[atom][axis][segment]` coefficient buffer of
//! [`Cubic`](crate::spline::Cubic) records, and the per-frame position
//! buffer refreshed with [`GpuUploadSink::write_positions`].
//!
//! Buffers of an incoming load are staged and only replace the bound set
//! when the load is published, together with the segment count.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::error::TrajviewError;
use crate::loader::{LoadSummary, UploadSink};
use crate::spline::AtomMotion;

/// Smallest buffer created, so empty inputs still bind.
const MIN_BUFFER_BYTES: usize = 16;

/// [`UploadSink`] backed by wgpu storage buffers.
pub struct GpuUploadSink {
    device: wgpu::Device,
    queue: wgpu::Queue,
    trajectory: Option<wgpu::Buffer>,
    coefficients: Option<wgpu::Buffer>,
    positions: Option<wgpu::Buffer>,
    segments: u32,
    staged: StagedBuffers,
}

/// Buffers of a load that is not yet published.
#[derive(Default)]
struct StagedBuffers {
    trajectory: Option<wgpu::Buffer>,
    coefficients: Option<wgpu::Buffer>,
    positions: Option<wgpu::Buffer>,
}

impl GpuUploadSink {
    /// Sink creating buffers on `device`.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            trajectory: None,
            coefficients: None,
            positions: None,
            segments: 0,
            staged: StagedBuffers::default(),
        }
    }

    /// Trajectory buffer of the published motion.
    pub fn trajectory_buffer(&self) -> Option<&wgpu::Buffer> {
        self.trajectory.as_ref()
    }

    /// Coefficient buffer of the published motion.
    pub fn coefficient_buffer(&self) -> Option<&wgpu::Buffer> {
        self.coefficients.as_ref()
    }

    /// Output position buffer of the published motion.
    pub fn position_buffer(&self) -> Option<&wgpu::Buffer> {
        self.positions.as_ref()
    }

    /// Segments per atom per axis of the published motion.
    pub fn segments(&self) -> u32 {
        self.segments
    }

    /// Copy this frame's evaluated positions into the output buffer.
    ///
    /// Returns `false` if no output buffer exists or `positions` does not
    /// fit.
    pub fn write_positions(&self, positions: &[f32]) -> bool {
        let Some(buffer) = &self.positions else {
            return false;
        };
        let bytes: &[u8] = bytemuck::cast_slice(positions);
        if bytes.len() as u64 > buffer.size() {
            return false;
        }
        if !bytes.is_empty() {
            self.queue.write_buffer(buffer, 0, bytes);
        }
        true
    }

    /// Largest storage buffer the device accepts.
    fn byte_limit(&self) -> u64 {
        let limits = self.device.limits();
        u64::from(limits.max_storage_buffer_binding_size)
            .min(limits.max_buffer_size)
    }

    fn create_storage(
        &self,
        label: &str,
        contents: &[u8],
    ) -> Result<wgpu::Buffer, TrajviewError> {
        let limit = self.byte_limit();
        if contents.len() as u64 > limit {
            return Err(TrajviewError::ResourceCreation(format!(
                "{label}: {} bytes exceeds device limit of {limit}",
                contents.len()
            )));
        }
        let padded;
        let contents = if contents.len() < MIN_BUFFER_BYTES {
            padded = [0u8; MIN_BUFFER_BYTES];
            &padded[..]
        } else {
            contents
        };
        log::debug!("creating {label} ({} bytes)", contents.len());
        Ok(self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
            }))
    }
}

impl UploadSink for GpuUploadSink {
    fn upload_trajectory(
        &mut self,
        positions: &[f32],
        _atom_count: usize,
        _timesteps: usize,
    ) -> Result<(), TrajviewError> {
        let buffer = self.create_storage(
            "Trajectory Buffer",
            bytemuck::cast_slice(positions),
        )?;
        self.staged.trajectory = Some(buffer);
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
        let buffer = self.create_storage("Spline Coefficient Buffer", bytes)?;
        self.staged.coefficients = Some(buffer);
        Ok(())
    }

    fn create_position_buffer(
        &mut self,
        atom_count: usize,
    ) -> Result<(), TrajviewError> {
        let zeros = vec![0.0f32; atom_count * 3];
        let buffer = self.create_storage(
            "Atom Position Buffer",
            bytemuck::cast_slice(&zeros),
        )?;
        self.staged.positions = Some(buffer);
        Ok(())
    }

    fn publish(
        &mut self,
        motion: &Arc<AtomMotion>,
        summary: &LoadSummary,
    ) -> Result<(), TrajviewError> {
        let segments = u32::try_from(motion.segments()).map_err(|_| {
            TrajviewError::ResourceCreation(format!(
                "{} segments do not fit the shader index type",
                motion.segments()
            ))
        })?;
        let staged = std::mem::take(&mut self.staged);
        let StagedBuffers {
            trajectory: Some(trajectory),
            coefficients: Some(coefficients),
            positions: Some(positions),
        } = staged
        else {
            return Err(TrajviewError::ResourceCreation(format!(
                "{}: publish before every buffer was staged",
                summary.source
            )));
        };
        self.trajectory = Some(trajectory);
        self.coefficients = Some(coefficients);
        self.positions = Some(positions);
        self.segments = segments;
        Ok(())
    }
}
