//! Minimal instance + device bootstrap for smoke tests and the `verify` CLI.
//!
//! Real applications bring their own device; this only opens the first
//! physical device with a graphics queue and keeps nothing else around.

use std::ffi::{CStr, CString};
use std::slice;
use std::sync::Arc;

use ash::vk;
use tracing::{info, warn};

use crate::error::ContextError;

/// A headless Vulkan device with one graphics queue.
///
/// Every pool created on [`device`](Self::device) must be cleaned up or
/// dropped before the context, since dropping it destroys the device.
pub struct HeadlessContext {
    device: Arc<ash::Device>,
    queue: vk::Queue,
    queue_family_index: u32,
    device_name: String,
    instance: ash::Instance,
    _entry: ash::Entry,
}

impl HeadlessContext {
    pub fn new(app_name: &str) -> Result<Self, ContextError> {
        let entry = unsafe { ash::Entry::load()? };

        let app_name = CString::new(app_name).unwrap_or_default();
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(c"cmdpool")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_0);

        let create_info = vk::InstanceCreateInfo::default().application_info(&app_info);
        let instance = unsafe { entry.create_instance(&create_info, None)? };

        let (device, queue_family_index, device_name) = match Self::open_device(&instance) {
            Ok(opened) => opened,
            Err(e) => {
                unsafe { instance.destroy_instance(None) };
                return Err(e);
            }
        };
        let queue = unsafe { device.get_device_queue(queue_family_index, 0) };

        info!("opened {} (queue family {})", device_name, queue_family_index);

        Ok(Self {
            device: Arc::new(device),
            queue,
            queue_family_index,
            device_name,
            instance,
            _entry: entry,
        })
    }

    fn open_device(instance: &ash::Instance) -> Result<(ash::Device, u32, String), ContextError> {
        let physical_devices = unsafe { instance.enumerate_physical_devices()? };

        for pd in physical_devices {
            let families = unsafe { instance.get_physical_device_queue_family_properties(pd) };
            let Some(family) = families
                .iter()
                .position(|f| f.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            else {
                continue;
            };
            let family = family as u32;

            let props = unsafe { instance.get_physical_device_properties(pd) };
            let device_name = unsafe {
                CStr::from_ptr(props.device_name.as_ptr())
                    .to_string_lossy()
                    .into_owned()
            };

            let priorities = [1.0f32];
            let queue_info = vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(&priorities);
            let device_info =
                vk::DeviceCreateInfo::default().queue_create_infos(slice::from_ref(&queue_info));
            let device = unsafe { instance.create_device(pd, &device_info, None)? };

            return Ok((device, family, device_name));
        }

        Err(ContextError::NoSuitableDevice)
    }

    pub fn device(&self) -> &Arc<ash::Device> {
        &self.device
    }

    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl Drop for HeadlessContext {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                warn!("device wait idle failed during teardown: {}", e);
            }
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
