use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use cmdpool_core::config::CmdpoolConfig;
use cmdpool_vk::{BufferState, CommandBufferPool, HeadlessContext, PoolConfig};

// ── Check result types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<String>,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.to_string(),
            details: Vec::new(),
        }
    }

    fn pass(name: &str, message: &str) -> Self {
        Self::new(name, CheckStatus::Pass, message)
    }

    fn fail(name: &str, message: &str) -> Self {
        Self::new(name, CheckStatus::Fail, message)
    }

    fn warn(name: &str, message: &str) -> Self {
        Self::new(name, CheckStatus::Warn, message)
    }

    fn skip(name: &str, message: &str) -> Self {
        Self::new(name, CheckStatus::Skip, message)
    }

    fn detail(mut self, detail: &str) -> Self {
        self.details.push(detail.to_string());
        self
    }
}

// ── Main entry point ────────────────────────────────────────────────────────

pub fn run_verify(config_path: &str, json: bool) -> anyhow::Result<()> {
    let mut results: Vec<CheckResult> = Vec::new();

    let config = check_config(config_path, &mut results);

    match HeadlessContext::new("cmdpool-verify") {
        Ok(ctx) => {
            results.push(
                CheckResult::pass("Vulkan device", ctx.device_name())
                    .detail(&format!("Queue family: {}", ctx.queue_family_index())),
            );
            check_pool_cycle(&ctx, &config.pool, &mut results);
        }
        Err(e) => {
            results.push(CheckResult::fail("Vulkan device", &e.to_string()));
            results.push(CheckResult::skip(
                "Command pool",
                "No Vulkan device, cannot exercise a pool",
            ));
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_results_pretty(&results);
    }

    if results
        .iter()
        .any(|r| matches!(r.status, CheckStatus::Fail))
    {
        std::process::exit(1);
    }

    Ok(())
}

// ── Check 1: Configuration ──────────────────────────────────────────────────

fn check_config(config_path: &str, results: &mut Vec<CheckResult>) -> CmdpoolConfig {
    if !std::path::Path::new(config_path).exists() {
        results.push(
            CheckResult::warn(
                "Configuration",
                &format!("Config file not found: {}", config_path),
            )
            .detail("Using default configuration"),
        );
        return CmdpoolConfig::default();
    }

    match CmdpoolConfig::load(config_path) {
        Ok(config) => {
            let wait = match config.pool.wait_timeout_ms {
                Some(ms) => format!("{} ms", ms),
                None => "indefinite".to_string(),
            };
            results.push(
                CheckResult::pass("Configuration", &format!("Loaded from {}", config_path))
                    .detail(&format!("Batch size: {}", config.pool.batch_size))
                    .detail(&format!("Fence wait: {}", wait)),
            );
            config
        }
        Err(e) => {
            results.push(CheckResult::fail(
                "Configuration",
                &format!("Failed to load {}: {}", config_path, e),
            ));
            CmdpoolConfig::default()
        }
    }
}

// ── Check 2: Pool cycle ─────────────────────────────────────────────────────

fn check_pool_cycle(ctx: &HeadlessContext, config: &PoolConfig, results: &mut Vec<CheckResult>) {
    let mut pool = match CommandBufferPool::with_config(
        Arc::clone(ctx.device()),
        ctx.queue_family_index(),
        config.clone(),
    ) {
        Ok(pool) => pool,
        Err(e) => {
            results.push(CheckResult::fail("Command pool", &e.to_string()));
            return;
        }
    };
    results.push(CheckResult::pass("Command pool", "Created"));

    let batch = config.batch_size as usize;
    let started = Instant::now();
    match pool.begin_transfer() {
        Ok(id) if pool.allocated_count() == batch && pool.free_count() == batch - 1 => {
            results.push(
                CheckResult::pass("Batch allocation", &format!("{} buffers allocated", batch))
                    .detail(&format!("Handed out {}", id)),
            );
            check_transfer(ctx, &mut pool, id, results);
        }
        Ok(_) => results.push(CheckResult::fail(
            "Batch allocation",
            &format!(
                "expected {} allocated / {} free, got {} / {}",
                batch,
                batch - 1,
                pool.allocated_count(),
                pool.free_count()
            ),
        )),
        Err(e) => results.push(CheckResult::fail("Batch allocation", &e.to_string())),
    }

    let general = pool
        .begin_commands()
        .and_then(|id| pool.submit_commands(id, ctx.queue()).map(|fence| (id, fence)));
    match general {
        Ok((id, None)) if pool.state(id).ok() == Some(BufferState::Free) => {
            results.push(
                CheckResult::pass("General submission", "Waited and recycled")
                    .detail(&format!("{:?} total", started.elapsed())),
            );
        }
        Ok((id, fence)) => results.push(CheckResult::fail(
            "General submission",
            &format!("{} left as {:?} with fence {:?}", id, pool.state(id).ok(), fence),
        )),
        Err(e) => results.push(CheckResult::fail("General submission", &e.to_string())),
    }

    match pool.clean_up() {
        Ok(()) => results.push(CheckResult::pass("Clean up", "Pool destroyed")),
        Err(e) => results.push(CheckResult::fail("Clean up", &e.to_string())),
    }
}

fn check_transfer(
    ctx: &HeadlessContext,
    pool: &mut CommandBufferPool<ash::Device>,
    id: cmdpool_vk::BufferId,
    results: &mut Vec<CheckResult>,
) {
    let fence = match pool.submit_commands(id, ctx.queue()) {
        Ok(Some(fence)) => fence,
        Ok(None) => {
            results.push(CheckResult::fail("Transfer submission", "No fence returned"));
            return;
        }
        Err(e) => {
            results.push(CheckResult::fail("Transfer submission", &e.to_string()));
            return;
        }
    };

    let waited = unsafe { ctx.device().wait_for_fences(&[fence], true, u64::MAX) };
    let outcome = waited
        .map_err(cmdpool_vk::PoolError::WaitFailed)
        .and_then(|()| pool.reset(id));
    match outcome {
        Ok(()) => results.push(
            CheckResult::pass("Transfer submission", "Fence signaled and buffer recycled")
                .detail(&format!("Fence {:?}", fence)),
        ),
        Err(e) => results.push(CheckResult::fail("Transfer submission", &e.to_string())),
    }
}

// ── Output formatters ───────────────────────────────────────────────────────

impl CheckStatus {
    fn label(self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Warn => "WARN",
            CheckStatus::Skip => "SKIP",
        }
    }

    /// ANSI color code for the status label.
    fn color(self) -> u8 {
        match self {
            CheckStatus::Pass => 32,
            CheckStatus::Fail => 31,
            CheckStatus::Warn => 33,
            CheckStatus::Skip => 90,
        }
    }
}

fn print_results_pretty(results: &[CheckResult]) {
    println!("\ncmdpool verify\n");

    let width = results.iter().map(|r| r.name.len()).max().unwrap_or(0);
    let mut tally = [0usize; 4];

    for result in results {
        tally[result.status as usize] += 1;
        println!(
            "  \x1b[{}m{}\x1b[0m  {:<width$}  {}",
            result.status.color(),
            result.status.label(),
            result.name,
            result.message,
        );
        for detail in &result.details {
            println!("        {:<width$}  {}", "", detail);
        }
    }

    let [passed, failed, warned, skipped] = tally;
    println!(
        "\n  {} checks: {} passed, {} failed, {} warnings, {} skipped\n",
        results.len(),
        passed,
        failed,
        warned,
        skipped
    );
}
