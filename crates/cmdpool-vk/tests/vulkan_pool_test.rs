//! Integration test: CommandBufferPool on a real Vulkan device.
//!
//! Opens the first device with a graphics queue and runs transfer and
//! general submissions through a pool. Skips when no Vulkan loader or
//! suitable device is present.
//!
//! Run with: cargo test -p cmdpool-vk --test vulkan_pool_test -- --nocapture

use std::sync::Arc;

use ash::vk;

use cmdpool_vk::{BufferState, CommandBufferPool, HeadlessContext, PoolConfig};

fn open_context() -> Option<HeadlessContext> {
    cmdpool_common::try_init_logging();
    match HeadlessContext::new("cmdpool-vulkan-test") {
        Ok(ctx) => {
            println!("Using {}", ctx.device_name());
            Some(ctx)
        }
        Err(e) => {
            println!("skipping: {}", e);
            None
        }
    }
}

#[test]
fn test_transfer_then_general_cycle() {
    let Some(ctx) = open_context() else {
        return;
    };

    let mut pool =
        CommandBufferPool::new(Arc::clone(ctx.device()), ctx.queue_family_index()).expect("pool");

    let upload = pool.begin_transfer().expect("begin transfer");
    assert_eq!(pool.allocated_count(), 10);
    assert_eq!(pool.free_count(), 9);

    let fence = pool
        .submit_commands(upload, ctx.queue())
        .expect("submit transfer")
        .expect("transfer fence");
    assert_eq!(pool.state(upload).expect("state"), BufferState::InFlight);

    unsafe { ctx.device().wait_for_fences(&[fence], true, u64::MAX) }.expect("wait");
    assert!(pool.is_complete(upload).expect("status"));
    pool.reset(upload).expect("reset");
    assert_eq!(pool.free_count(), 10);

    let draw = pool.begin_commands().expect("begin");
    assert_eq!(pool.submit_commands(draw, ctx.queue()).expect("submit"), None);
    assert_eq!(pool.state(draw).expect("state"), BufferState::Free);

    pool.clean_up().expect("clean up");
    assert_eq!(pool.raw(), None);
}

#[test]
fn test_clean_up_with_transfers_in_flight() {
    let Some(ctx) = open_context() else {
        return;
    };

    let config = PoolConfig {
        batch_size: 4,
        ..PoolConfig::default()
    };
    let mut pool = CommandBufferPool::with_config(
        Arc::clone(ctx.device()),
        ctx.queue_family_index(),
        config,
    )
    .expect("pool");

    let mut fences: Vec<vk::Fence> = Vec::new();
    for _ in 0..6 {
        let id = pool.begin_transfer().expect("begin transfer");
        fences.push(
            pool.submit_commands(id, ctx.queue())
                .expect("submit")
                .expect("fence"),
        );
    }
    assert_eq!(pool.allocated_count(), 8);
    assert_eq!(pool.in_flight_count(), 6);

    pool.clean_up().expect("clean up");
    pool.clean_up().expect("second clean up");
}
