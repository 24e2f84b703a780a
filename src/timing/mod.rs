mod scheduler;
mod silence;
mod timer;

pub use scheduler::{PlaybackPlan, Replay, ScheduledAction, transpose};
pub use silence::SilenceDetector;
pub use timer::{TimerId, TimerQueue};

/// Work a session defers until later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    SilenceCheck,
    ReplayAction(ScheduledAction),
}
