//! SQL safety policy: statement validation and concurrency limits.

pub mod gate;
pub mod validator;

pub use gate::{QueryGate, QueryPermit};
pub use validator::{SqlValidator, StatementKind};
