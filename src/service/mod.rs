//! Services wiring the rule core to its collaborators
//!
//! - [`RuleService`] / [`ReloadHandle`]: rule reload on demand and on content changes
//! - [`AccessGuard`]: the request-path check including redirect resolution

pub mod guard;
pub mod reload;

pub use guard::{AccessGuard, GuardOutcome};
pub use reload::{
    COVERAGE_REFRESH_MESSAGE, ReloadHandle, ReloadOutcome, RuleService, spawn_reload_worker,
};
