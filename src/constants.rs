// -
// Protocol limits

/// Largest object instance number (2^22 - 2); 4194303 is the wildcard
pub(crate) const MAX_INSTANCE: u32 = 0x3F_FFFE;

/// Smallest APDU every device must accept
pub(crate) const MIN_APDU_LENGTH: u32 = 50;

/// Priority used when a write request carries none
pub(crate) const DEFAULT_WRITE_PRIORITY: u8 = 16;

// -
// Simulation objects (AI:0 follows AV:0 * sin(t))

pub(crate) const SIMULATION_SOURCE_INSTANCE: u32 = 0;
pub(crate) const SIMULATION_TARGET_INSTANCE: u32 = 0;

// -
// Background task names

pub(crate) const SLOT_SWEEPER_TASK: &str = "cov_slot_sweeper";
pub(crate) const METRICS_SERVER_TASK: &str = "metrics_server";
pub(crate) const SIMULATION_TASK: &str = "simulation_worker";
