// Report assembly: the per-run state machine, resume checkpoints and
// the merged CSV export.

pub mod checkpoint;
pub mod export;
pub mod session;
