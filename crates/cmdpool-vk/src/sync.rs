//! Fence ownership for in-flight submissions.

use ash::vk;
use tracing::trace;

use crate::device::DeviceProvider;
use crate::error::PoolError;

/// An owned native fence signaled when one submission completes.
///
/// The fence does not hold on to its device, so it cannot destroy itself on
/// drop. [`SyncFence::destroy`] consumes it and must be called once the wait
/// has returned or the fence is known to be idle.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a fence must be destroyed through SyncFence::destroy"]
pub struct SyncFence {
    raw: vk::Fence,
}

impl SyncFence {
    /// Creates an unsignaled fence.
    pub fn create<D: DeviceProvider + ?Sized>(device: &D) -> Result<Self, PoolError> {
        let raw = device
            .create_fence(false)
            .map_err(PoolError::FenceCreationFailed)?;
        trace!(fence = ?raw, "fence created");
        Ok(Self { raw })
    }

    pub fn raw(&self) -> vk::Fence {
        self.raw
    }

    /// Blocks until the fence signals or `timeout_ns` elapses.
    pub fn wait<D: DeviceProvider + ?Sized>(
        &self,
        device: &D,
        timeout_ns: u64,
    ) -> Result<(), PoolError> {
        match device.wait_for_fence(self.raw, timeout_ns) {
            Ok(()) => Ok(()),
            Err(vk::Result::TIMEOUT) => Err(PoolError::WaitTimedOut { timeout_ns }),
            Err(e) => Err(PoolError::WaitFailed(e)),
        }
    }

    /// Blocks the calling thread until the fence signals.
    pub fn wait_indefinitely<D: DeviceProvider + ?Sized>(&self, device: &D) -> Result<(), PoolError> {
        self.wait(device, u64::MAX)
    }

    /// Non-blocking status query.
    pub fn is_signaled<D: DeviceProvider + ?Sized>(&self, device: &D) -> Result<bool, PoolError> {
        device.fence_status(self.raw).map_err(PoolError::WaitFailed)
    }

    pub fn destroy<D: DeviceProvider + ?Sized>(self, device: &D) {
        trace!(fence = ?self.raw, "fence destroyed");
        device.destroy_fence(self.raw);
    }
}
