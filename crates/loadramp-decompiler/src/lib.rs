//! Turns compiled schedules back into profile operations.
//!
//! Batches become piecewise-linear [`Timeline`]s, which are summed and
//! compacted before [`emit_ops`] walks the breakpoints to produce a short
//! operation sequence.

pub mod decompiler;
pub mod emitter;
pub mod timeline;

pub use decompiler::ScheduleDecompiler;
pub use emitter::emit_ops;
pub use timeline::{Breakpoint, Timeline};
