/*!
 * Scheduler Module
 * Candidate queue, drain/cleanup cycles and the periodic task runner
 */

pub mod cycles;
pub mod queue;
pub mod task;

pub use cycles::{CandidateScheduler, CleanupJob, DrainJob, DrainReport};
pub use queue::{CandidateQueue, HibernationCandidate};
pub use task::{PeriodicJob, PeriodicTask, TaskCommand};
