pub mod collaborators;
pub mod contact;
pub mod error;
pub mod flow;
pub mod validate;

pub use collaborators::{ClosureActions, Navigator, SessionSource};
pub use contact::{ContactFormatter, InputHint, PhoneAwareFormatter, is_valid_email};
pub use error::{ErrorBody, FlowError, ValidationError};
pub use flow::{CloseAccountFlow, FlowState, FormState, FormValues};
pub use validate::{ValidationResult, validate};
