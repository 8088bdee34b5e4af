//! sniffer-engine: Rule dispatch and the fix loop
//!
//! - `Dispatcher`: fires registered rules over one pass of a token stream
//! - `Engine`: repeats passes, applying fixes until the text stops changing

pub mod dispatcher;
pub mod pipeline;
pub mod timing;

pub use dispatcher::{is_firing_rule, Dispatcher, RegistrationError};
pub use pipeline::{Engine, EngineConfig, EngineError, FileReport, DEFAULT_MAX_PASSES, NOT_CONVERGED};
pub use timing::{PassStats, RuleTiming};
