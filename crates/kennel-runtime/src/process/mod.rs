//! OS-level process helpers shared by both environment variants.

mod completion;
mod liveness;
mod signal;
mod stats;

pub use completion::CompletionSignal;
pub use liveness::{is_zombie, pid_alive, process_running};
pub use signal::{force_kill, kill_group};
pub use stats::{SAMPLE_WINDOW, sample};
