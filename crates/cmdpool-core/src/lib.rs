pub mod buffer;
pub mod config;
pub mod error;

pub use buffer::{BufferId, BufferState, CommandUsage};
pub use config::{CmdpoolConfig, PoolConfig};
pub use error::CoreError;
