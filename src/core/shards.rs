/*!
 * Shard Sizing
 *
 * CPU-topology-aware shard counts for the registry's concurrent maps.
 * Power-of-2 shard counts scale with the host's parallelism.
 */

use std::sync::OnceLock;

static CPU_COUNT: OnceLock<usize> = OnceLock::new();

/// Expected access pattern of a map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadProfile {
    /// Touched on every activation and transform (tab slots)
    HighContention,
    /// Touched on transforms only (snapshots, profiles)
    MediumContention,
    /// Rarely touched
    LowContention,
}

fn cpu_count() -> usize {
    *CPU_COUNT.get_or_init(|| {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or_else(|_| {
                log::warn!("Failed to detect CPU count, defaulting to 4");
                4
            });
        log::debug!("Shard sizing initialized for {} CPUs", cpus);
        cpus
    })
}

/// Shard amount for a DashMap with the given access pattern
///
/// Always a power of two in `[4, 256]`.
pub fn shard_amount(profile: WorkloadProfile) -> usize {
    let multiplier = match profile {
        WorkloadProfile::HighContention => 4,
        WorkloadProfile::MediumContention => 2,
        WorkloadProfile::LowContention => 1,
    };

    (cpu_count() * multiplier).next_power_of_two().clamp(4, 256)
}
