pub mod chain;
pub mod validator;

pub use chain::{init_chain, store_applied_head, PatchContext};
pub use validator::{ApplyResult, ReplayValidator, ValidationError, ValidationResult, Validator};
