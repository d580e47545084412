mod builtin;
mod dispatch;
mod registry;
pub mod template;

pub use builtin::{builtin_actions, CONTROL_LIGHT, SET_HEATING_AND_COOLING};
pub use dispatch::DispatchOutcome;
pub use registry::{to_api_schema, ActionRegistry, ActionSpec, ServiceCall};
