//! kaiwa-types: shared types for the kaiwa evaluation-session engine.
//!
//! This crate holds the vocabulary every other kaiwa crate speaks:
//!
//! - **Value**: the runtime values that evaluations produce
//! - **Outcome**: the classified result of one evaluation attempt
//! - **Errors**: the engine/compiler error taxonomy

pub mod error;
pub mod outcome;
pub mod value;

pub use error::{CompilerError, EngineError};
pub use outcome::{Facet, Outcome};
pub use value::{TypeDesc, Value};
