//! Command pool and pooled command buffers.
//!
//! A [`CommandBufferPool`] owns one native command pool bound to a queue
//! family. Buffers are allocated in batches, handed out for recording, and
//! recycled once the GPU is done with them. Buffers are addressed by
//! [`BufferId`], their index in the pool's arena.

use std::collections::VecDeque;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, trace, warn};

use cmdpool_core::{BufferId, BufferState, CommandUsage, PoolConfig};

use crate::device::DeviceProvider;
use crate::error::PoolError;
use crate::sync::SyncFence;

/// One pooled command buffer.
#[derive(Debug)]
pub struct CommandBuffer {
    raw: vk::CommandBuffer,
    level: vk::CommandBufferLevel,
    usage: CommandUsage,
    state: BufferState,
    fence: Option<SyncFence>,
    submissions: u64,
}

impl CommandBuffer {
    fn new(raw: vk::CommandBuffer, level: vk::CommandBufferLevel) -> Self {
        Self {
            raw,
            level,
            usage: CommandUsage::General,
            state: BufferState::Free,
            fence: None,
            submissions: 0,
        }
    }

    pub fn raw(&self) -> vk::CommandBuffer {
        self.raw
    }

    pub fn level(&self) -> vk::CommandBufferLevel {
        self.level
    }

    /// Usage of the current (or most recent) recording.
    pub fn usage(&self) -> CommandUsage {
        self.usage
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    /// The fence of the outstanding transfer submission, if any.
    pub fn fence(&self) -> Option<vk::Fence> {
        self.fence.as_ref().map(SyncFence::raw)
    }

    /// How many times this buffer has been submitted.
    pub fn submissions(&self) -> u64 {
        self.submissions
    }

    pub fn is_recording(&self) -> bool {
        self.state == BufferState::Recording
    }

    pub fn is_submitted(&self) -> bool {
        self.state == BufferState::InFlight
    }

    /// Transfer-class buffers are primary-level recordings made for transfer.
    pub fn is_transfer(&self) -> bool {
        self.level == vk::CommandBufferLevel::PRIMARY && self.usage.is_transfer()
    }
}

/// A growable pool of primary command buffers for one queue family.
///
/// Not internally synchronized: every mutating call takes `&mut self`, so a
/// pool belongs to one recording thread at a time.
pub struct CommandBufferPool<D: DeviceProvider + ?Sized> {
    raw: Option<vk::CommandPool>,
    queue_family_index: u32,
    config: PoolConfig,
    /// Every buffer ever allocated, indexed by `BufferId`.
    buffers: Vec<CommandBuffer>,
    free: VecDeque<BufferId>,
    device: Arc<D>,
}

impl<D: DeviceProvider + ?Sized> std::fmt::Debug for CommandBufferPool<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBufferPool")
            .field("raw", &self.raw)
            .field("queue_family_index", &self.queue_family_index)
            .field("allocated", &self.buffers.len())
            .field("free", &self.free.len())
            .finish()
    }
}

impl<D: DeviceProvider + ?Sized> CommandBufferPool<D> {
    /// Create a pool with the default configuration (batches of 10).
    pub fn new(device: Arc<D>, queue_family_index: u32) -> Result<Self, PoolError> {
        Self::with_config(device, queue_family_index, PoolConfig::default())
    }

    pub fn with_config(
        device: Arc<D>,
        queue_family_index: u32,
        config: PoolConfig,
    ) -> Result<Self, PoolError> {
        config.validate()?;

        let raw = device
            .create_command_pool(
                queue_family_index,
                vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            )
            .map_err(PoolError::PoolCreationFailed)?;

        debug!(
            pool = ?raw,
            queue_family_index,
            batch_size = config.batch_size,
            "command pool created"
        );

        Ok(Self {
            raw: Some(raw),
            queue_family_index,
            config,
            buffers: Vec::new(),
            free: VecDeque::new(),
            device,
        })
    }

    /// Hand out a buffer ready to record graphics or compute work.
    pub fn begin_commands(&mut self) -> Result<BufferId, PoolError> {
        self.begin_with(CommandUsage::General)
    }

    /// Hand out a buffer ready to record a one-shot transfer.
    pub fn begin_transfer(&mut self) -> Result<BufferId, PoolError> {
        self.begin_with(CommandUsage::Transfer)
    }

    /// Pop the oldest free buffer (growing the pool by one batch if none is
    /// free) and begin a one-time-submit recording on it.
    pub fn begin_with(&mut self, usage: CommandUsage) -> Result<BufferId, PoolError> {
        let pool = self.live_pool()?;
        if self.free.is_empty() {
            self.grow(pool)?;
        }

        let id = self
            .free
            .pop_front()
            .ok_or(PoolError::AllocationFailed(vk::Result::ERROR_OUT_OF_POOL_MEMORY))?;
        let buffer = &mut self.buffers[id.index()];
        debug_assert_eq!(buffer.state, BufferState::Free, "{} queued while not free", id);

        if let Err(e) = self
            .device
            .begin_command_buffer(buffer.raw, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
        {
            self.free.push_front(id);
            return Err(PoolError::BeginFailed(e));
        }

        buffer.usage = usage;
        buffer.state = BufferState::Recording;
        trace!(%id, ?usage, "recording started");
        Ok(id)
    }

    /// End recording on `id` and submit it to `queue`.
    ///
    /// Transfer buffers are submitted with a fresh fence and stay in flight;
    /// the fence is returned so the caller can poll it before calling
    /// [`reset`](Self::reset). Every other buffer is submitted with its own
    /// fence, waited on until the GPU finishes, and returned to the free
    /// queue before this call returns (`Ok(None)`).
    ///
    /// If ending, fence creation or submission fails, the recording is
    /// discarded and the buffer goes back to the free queue.
    pub fn submit_commands(
        &mut self,
        id: BufferId,
        queue: vk::Queue,
    ) -> Result<Option<vk::Fence>, PoolError> {
        self.live_pool()?;
        let device = &*self.device;
        let timeout_ns = self.config.wait_timeout_ns();
        let buffer = self
            .buffers
            .get_mut(id.index())
            .ok_or(PoolError::UnknownBuffer(id))?;

        if buffer.state != BufferState::Recording {
            return Err(PoolError::InvalidTransition {
                id,
                from: buffer.state,
                to: BufferState::InFlight,
            });
        }

        let raw = buffer.raw;
        let submitted = device
            .end_command_buffer(raw)
            .map_err(PoolError::EndFailed)
            .and_then(|()| SyncFence::create(device))
            .and_then(|fence| match device.queue_submit(queue, raw, fence.raw()) {
                Ok(()) => Ok(fence),
                Err(e) => {
                    fence.destroy(device);
                    Err(PoolError::SubmissionFailed(e))
                }
            });
        let fence = match submitted {
            Ok(fence) => fence,
            Err(e) => {
                // nothing reached the queue; the next begin re-records from scratch
                buffer.state = BufferState::Free;
                self.free.push_back(id);
                warn!(%id, "submission failed, buffer returned to the free queue: {}", e);
                return Err(e);
            }
        };
        buffer.submissions += 1;

        if buffer.is_transfer() {
            let raw_fence = fence.raw();
            buffer.fence = Some(fence);
            buffer.state = BufferState::InFlight;
            trace!(%id, fence = ?raw_fence, "transfer submitted");
            return Ok(Some(raw_fence));
        }

        if let Err(e) = fence.wait(device, timeout_ns) {
            // still executing; the caller recovers through reset or recycle_completed
            buffer.fence = Some(fence);
            buffer.state = BufferState::InFlight;
            return Err(e);
        }
        fence.destroy(device);
        buffer.state = BufferState::Free;
        self.free.push_back(id);
        trace!(%id, "submitted and recycled");
        Ok(None)
    }

    /// Return an in-flight buffer to the free queue.
    ///
    /// Meant to be called once the buffer's fence has been observed
    /// signaled; if it has not, this blocks until it is (bounded by the
    /// configured wait timeout) so the fence is never destroyed while the
    /// GPU still uses it.
    pub fn release(&mut self, id: BufferId) -> Result<(), PoolError> {
        self.live_pool()?;
        let device = &*self.device;
        let timeout_ns = self.config.wait_timeout_ns();
        let buffer = self
            .buffers
            .get_mut(id.index())
            .ok_or(PoolError::UnknownBuffer(id))?;

        if buffer.state != BufferState::InFlight {
            return Err(PoolError::InvalidTransition {
                id,
                from: buffer.state,
                to: BufferState::Free,
            });
        }

        if let Some(fence) = buffer.fence.take() {
            if let Err(e) = fence.wait(device, timeout_ns) {
                buffer.fence = Some(fence);
                return Err(e);
            }
            fence.destroy(device);
        }

        buffer.state = BufferState::Free;
        self.free.push_back(id);
        trace!(%id, "released");
        Ok(())
    }

    /// Alias of [`release`](Self::release).
    pub fn reset(&mut self, id: BufferId) -> Result<(), PoolError> {
        self.release(id)
    }

    /// Whether the work last submitted from `id` has finished.
    /// Free buffers count as finished, buffers still recording do not.
    pub fn is_complete(&self, id: BufferId) -> Result<bool, PoolError> {
        let buffer = self.buffer(id)?;
        match (&buffer.state, &buffer.fence) {
            (BufferState::Free, _) => Ok(true),
            (BufferState::Recording, _) => Ok(false),
            (BufferState::InFlight, Some(fence)) => fence.is_signaled(&*self.device),
            (BufferState::InFlight, None) => Ok(true),
        }
    }

    /// Release every in-flight buffer whose fence has signaled.
    /// Returns how many buffers went back to the free queue.
    pub fn recycle_completed(&mut self) -> Result<usize, PoolError> {
        self.live_pool()?;
        let device = &*self.device;
        let mut recycled = 0;

        for (index, buffer) in self.buffers.iter_mut().enumerate() {
            if buffer.state != BufferState::InFlight {
                continue;
            }
            let signaled = match &buffer.fence {
                Some(fence) => fence.is_signaled(device)?,
                None => true,
            };
            if !signaled {
                continue;
            }
            if let Some(fence) = buffer.fence.take() {
                fence.destroy(device);
            }
            buffer.state = BufferState::Free;
            self.free.push_back(BufferId::new(index as u32));
            recycled += 1;
        }

        if recycled > 0 {
            trace!(recycled, "recycled completed buffers");
        }
        Ok(recycled)
    }

    /// Wait out every outstanding transfer, destroy all fences, then reset
    /// and destroy the native pool. Calling it again is a no-op.
    pub fn clean_up(&mut self) -> Result<(), PoolError> {
        let Some(pool) = self.raw.take() else {
            return Ok(());
        };
        let device = &*self.device;

        let mut waited = 0usize;
        for buffer in self.buffers.iter_mut() {
            let Some(fence) = buffer.fence.take() else {
                continue;
            };
            if buffer.is_transfer() || buffer.state == BufferState::InFlight {
                if let Err(e) = fence.wait_indefinitely(device) {
                    buffer.fence = Some(fence);
                    self.raw = Some(pool);
                    return Err(e);
                }
                waited += 1;
            }
            fence.destroy(device);
        }

        let reset = device.reset_command_pool(pool, vk::CommandPoolResetFlags::RELEASE_RESOURCES);
        if let Err(e) = reset {
            warn!(pool = ?pool, "command pool reset failed during clean up: {}", e);
        }
        device.destroy_command_pool(pool);

        debug!(
            pool = ?pool,
            buffers = self.buffers.len(),
            waited,
            "command pool destroyed"
        );
        self.buffers.clear();
        self.free.clear();

        reset.map_err(PoolError::ResetFailed)
    }

    pub fn buffer(&self, id: BufferId) -> Result<&CommandBuffer, PoolError> {
        self.live_pool()?;
        self.buffers
            .get(id.index())
            .ok_or(PoolError::UnknownBuffer(id))
    }

    pub fn state(&self, id: BufferId) -> Result<BufferState, PoolError> {
        self.buffer(id).map(CommandBuffer::state)
    }

    pub fn raw_handle(&self, id: BufferId) -> Result<vk::CommandBuffer, PoolError> {
        self.buffer(id).map(CommandBuffer::raw)
    }

    pub fn fence(&self, id: BufferId) -> Result<Option<vk::Fence>, PoolError> {
        self.buffer(id).map(CommandBuffer::fence)
    }

    pub fn is_recording(&self, id: BufferId) -> Result<bool, PoolError> {
        self.buffer(id).map(CommandBuffer::is_recording)
    }

    pub fn is_submitted(&self, id: BufferId) -> Result<bool, PoolError> {
        self.buffer(id).map(CommandBuffer::is_submitted)
    }

    /// Native pool handle, `None` after [`clean_up`](Self::clean_up).
    pub fn raw(&self) -> Option<vk::CommandPool> {
        self.raw
    }

    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn device(&self) -> &Arc<D> {
        &self.device
    }

    pub fn allocated_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.count_in(BufferState::InFlight)
    }

    pub fn recording_count(&self) -> usize {
        self.count_in(BufferState::Recording)
    }

    fn count_in(&self, state: BufferState) -> usize {
        self.buffers.iter().filter(|b| b.state == state).count()
    }

    fn live_pool(&self) -> Result<vk::CommandPool, PoolError> {
        self.raw.ok_or(PoolError::PoolDestroyed)
    }

    fn grow(&mut self, pool: vk::CommandPool) -> Result<(), PoolError> {
        let level = vk::CommandBufferLevel::PRIMARY;
        let raws = self
            .device
            .allocate_command_buffers(pool, level, self.config.batch_size)
            .map_err(PoolError::AllocationFailed)?;

        for raw in raws {
            let id = BufferId::new(self.buffers.len() as u32);
            self.buffers.push(CommandBuffer::new(raw, level));
            self.free.push_back(id);
        }

        debug!(
            pool = ?pool,
            batch = self.config.batch_size,
            total = self.buffers.len(),
            "command pool grew"
        );
        Ok(())
    }
}

impl<D: DeviceProvider + ?Sized> Drop for CommandBufferPool<D> {
    fn drop(&mut self) {
        if self.raw.is_some() {
            if let Err(e) = self.clean_up() {
                warn!("command pool dropped without clean up: {}", e);
            }
        }
    }
}
