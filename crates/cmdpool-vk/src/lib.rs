//! Pooled Vulkan command buffers with fence-tracked recycling.
//!
//! The pool hands out primary command buffers for recording, submits them,
//! and takes them back once the GPU is done. Transfer recordings are tracked
//! by a fence the caller polls; everything else is waited on at submit time.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use ash::vk;
//! # fn record(device: Arc<ash::Device>, queue: vk::Queue, family: u32) -> Result<(), cmdpool_vk::PoolError> {
//! use cmdpool_vk::CommandBufferPool;
//!
//! let mut pool = CommandBufferPool::new(device, family)?;
//!
//! let upload = pool.begin_transfer()?;
//! // record copy commands into pool.raw_handle(upload)?
//! let fence = pool.submit_commands(upload, queue)?;
//! assert!(fence.is_some());
//!
//! // later, once the fence has signaled
//! pool.reset(upload)?;
//!
//! pool.clean_up()?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod device;
pub mod error;
pub mod headless;
pub mod sync;

pub use command::{CommandBuffer, CommandBufferPool};
pub use device::DeviceProvider;
pub use error::{ContextError, PoolError};
pub use headless::HeadlessContext;
pub use sync::SyncFence;

pub use cmdpool_core::{BufferId, BufferState, CommandUsage, PoolConfig};
