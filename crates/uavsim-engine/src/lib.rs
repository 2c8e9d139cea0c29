pub mod abort;
pub mod orchestrator;
pub mod runner;

pub use abort::{abort_pair, AbortHandle, AbortSignal};
pub use orchestrator::{Orchestrator, TrajectorySource};
pub use runner::{RunnerSettings, StepOutcome, StepRunner};
