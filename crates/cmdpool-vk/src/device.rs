//! The native call surface the command pool needs from a logical device.
//!
//! Device and queue creation live elsewhere; whoever owns the device hands
//! the pool something implementing [`DeviceProvider`]. `ash::Device`
//! implements it directly.

use std::slice;

use ash::prelude::VkResult;
use ash::vk;

/// Logical-device capability used by [`crate::CommandBufferPool`].
///
/// Implementations forward to the driver. Callers guarantee that every
/// handle passed in was created through the same provider and has not been
/// destroyed.
pub trait DeviceProvider {
    fn create_command_pool(
        &self,
        queue_family_index: u32,
        flags: vk::CommandPoolCreateFlags,
    ) -> VkResult<vk::CommandPool>;

    fn reset_command_pool(
        &self,
        pool: vk::CommandPool,
        flags: vk::CommandPoolResetFlags,
    ) -> VkResult<()>;

    fn destroy_command_pool(&self, pool: vk::CommandPool);

    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        level: vk::CommandBufferLevel,
        count: u32,
    ) -> VkResult<Vec<vk::CommandBuffer>>;

    fn begin_command_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        flags: vk::CommandBufferUsageFlags,
    ) -> VkResult<()>;

    fn end_command_buffer(&self, command_buffer: vk::CommandBuffer) -> VkResult<()>;

    fn queue_submit(
        &self,
        queue: vk::Queue,
        command_buffer: vk::CommandBuffer,
        fence: vk::Fence,
    ) -> VkResult<()>;

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence>;

    /// Blocks until `fence` signals or `timeout_ns` elapses.
    /// A timeout is reported as `Err(vk::Result::TIMEOUT)`.
    fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> VkResult<()>;

    fn fence_status(&self, fence: vk::Fence) -> VkResult<bool>;

    fn destroy_fence(&self, fence: vk::Fence);
}

impl DeviceProvider for ash::Device {
    fn create_command_pool(
        &self,
        queue_family_index: u32,
        flags: vk::CommandPoolCreateFlags,
    ) -> VkResult<vk::CommandPool> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family_index)
            .flags(flags);
        unsafe { ash::Device::create_command_pool(self, &create_info, None) }
    }

    fn reset_command_pool(
        &self,
        pool: vk::CommandPool,
        flags: vk::CommandPoolResetFlags,
    ) -> VkResult<()> {
        unsafe { ash::Device::reset_command_pool(self, pool, flags) }
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        unsafe { ash::Device::destroy_command_pool(self, pool, None) }
    }

    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        level: vk::CommandBufferLevel,
        count: u32,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(level)
            .command_buffer_count(count);
        unsafe { ash::Device::allocate_command_buffers(self, &alloc_info) }
    }

    fn begin_command_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        flags: vk::CommandBufferUsageFlags,
    ) -> VkResult<()> {
        let begin_info = vk::CommandBufferBeginInfo::default().flags(flags);
        unsafe { ash::Device::begin_command_buffer(self, command_buffer, &begin_info) }
    }

    fn end_command_buffer(&self, command_buffer: vk::CommandBuffer) -> VkResult<()> {
        unsafe { ash::Device::end_command_buffer(self, command_buffer) }
    }

    fn queue_submit(
        &self,
        queue: vk::Queue,
        command_buffer: vk::CommandBuffer,
        fence: vk::Fence,
    ) -> VkResult<()> {
        let submit_info =
            vk::SubmitInfo::default().command_buffers(slice::from_ref(&command_buffer));
        unsafe { ash::Device::queue_submit(self, queue, slice::from_ref(&submit_info), fence) }
    }

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
        let mut create_info = vk::FenceCreateInfo::default();
        if signaled {
            create_info = create_info.flags(vk::FenceCreateFlags::SIGNALED);
        }
        unsafe { ash::Device::create_fence(self, &create_info, None) }
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> VkResult<()> {
        unsafe { ash::Device::wait_for_fences(self, slice::from_ref(&fence), true, timeout_ns) }
    }

    fn fence_status(&self, fence: vk::Fence) -> VkResult<bool> {
        unsafe { ash::Device::get_fence_status(self, fence) }
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { ash::Device::destroy_fence(self, fence, None) }
    }
}
