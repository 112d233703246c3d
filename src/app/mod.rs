mod orchestrator;
mod registry;
mod runtime;
mod shutdown;
mod startup;
mod types;

#[cfg(test)]
mod tests;

pub use orchestrator::FeederOrchestrator;
pub use registry::ComponentRegistry;
pub use types::{ComponentState, ShutdownReason};
