pub mod error;
pub mod policy;
pub mod resolver;
pub mod rules;
pub mod tracker;

pub use error::EngineError;
pub use policy::DownBinPolicy;
pub use resolver::{EnvGlobals, GlobalVariables, VariableResolver};
pub use rules::RuleEngine;
pub use tracker::{TrackingEngine, UpdateParams};
