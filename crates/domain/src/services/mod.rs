//! Service layer: the payment approval state machine, the expiry sweep, and
//! telemetry wiring shared by the binaries.

pub mod approval;
pub mod expiry;
pub mod telemetry;
