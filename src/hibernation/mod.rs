/*!
 * Hibernation Module
 * Memory profiling, snapshots, the transform engine and capped sweeps
 */

pub mod engine;
pub mod profile;
pub mod snapshot;
pub mod sweep;

pub use engine::{
    ActivationReport, HibernateOutcome, HibernationEngine, HibernationReport, ReactivationReport,
};
pub use profile::{DefaultSizeEstimator, MemoryProfile, SizeEstimator};
pub use snapshot::HibernatedSnapshot;
pub use sweep::{select_candidates, SweepCandidate, SweepKind, SweepReport};
