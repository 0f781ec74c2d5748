// Automated job-application workflow.
// Implements: stage machine, selection, paced sequential submission, batch
// persistence, and the session actor that fronts it over HTTP.
// All automation backend calls go through automation_client.

pub mod controller;
pub mod handlers;
pub mod pacing;
pub mod selection;
pub mod session;
pub mod stage;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{
    AutomationDeps, AutomationSnapshot, Availability, OrchestrationController, OrchestratorError,
    SessionContext,
};
pub use pacing::{FixedDelay, Pacer};
pub use session::{Intent, SessionHandle, SessionRegistry};
pub use stage::AutomationStage;
