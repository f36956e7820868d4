use ash::vk;

use cmdpool_core::{BufferId, BufferState};

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("failed to create command pool: {0}")]
    PoolCreationFailed(vk::Result),

    #[error("failed to allocate command buffers: {0}")]
    AllocationFailed(vk::Result),

    #[error("failed to begin command buffer: {0}")]
    BeginFailed(vk::Result),

    #[error("failed to end command buffer: {0}")]
    EndFailed(vk::Result),

    #[error("queue submission failed: {0}")]
    SubmissionFailed(vk::Result),

    #[error("failed to create fence: {0}")]
    FenceCreationFailed(vk::Result),

    #[error("fence wait timed out after {timeout_ns}ns")]
    WaitTimedOut { timeout_ns: u64 },

    #[error("fence wait failed: {0}")]
    WaitFailed(vk::Result),

    #[error("failed to reset command pool: {0}")]
    ResetFailed(vk::Result),

    #[error("{id} cannot go from {from} to {to}")]
    InvalidTransition {
        id: BufferId,
        from: BufferState,
        to: BufferState,
    },

    #[error("{0} does not belong to this pool")]
    UnknownBuffer(BufferId),

    #[error("command pool has already been cleaned up")]
    PoolDestroyed,

    #[error(transparent)]
    Config(#[from] cmdpool_core::CoreError),
}

impl PoolError {
    /// Device loss and out-of-memory conditions leave the device unusable.
    pub fn is_device_fatal(&self) -> bool {
        let code = match self {
            PoolError::PoolCreationFailed(code)
            | PoolError::AllocationFailed(code)
            | PoolError::BeginFailed(code)
            | PoolError::EndFailed(code)
            | PoolError::SubmissionFailed(code)
            | PoolError::FenceCreationFailed(code)
            | PoolError::WaitFailed(code)
            | PoolError::ResetFailed(code) => *code,
            _ => return false,
        };
        matches!(
            code,
            vk::Result::ERROR_DEVICE_LOST
                | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY
                | vk::Result::ERROR_OUT_OF_HOST_MEMORY
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("failed to load the Vulkan loader: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("no physical device exposes a graphics queue")]
    NoSuitableDevice,

    #[error("Vulkan call failed: {0}")]
    Vulkan(#[from] vk::Result),
}
