//! Render context: the consumer of recorded command buffers.

use super::command::CommandBuffer;
use crate::errors::Result;

/// Executes recorded command buffers against real storage.
///
/// Implemented by [`SoftwareRenderContext`](crate::backend::SoftwareRenderContext)
/// and [`WgpuRenderContext`](crate::backend::WgpuRenderContext).
pub trait ScriptableRenderContext {
    /// Executes every command in `cmd`, in order.
    ///
    /// Commands are applied as they are read; an error leaves earlier
    /// commands of the same buffer applied.
    fn execute_command_buffer(&mut self, cmd: &CommandBuffer) -> Result<()>;
}
