use crate::error::ValidationError;

pub type ValidationResult = Result<(), ValidationError>;

/// Check that the user re-typed the contact of the signed-in account.
///
/// `session_identity` is the already formatted contact (see
/// [`crate::contact::ContactFormatter`]). Comparison is exact after lower-casing both
/// sides: no trimming, no partial matches. An absent or blank identity never validates.
pub fn validate(session_identity: Option<&str>, confirmation_input: &str) -> ValidationResult {
    let Some(identity) = session_identity.filter(|s| !s.trim().is_empty()) else {
        return Err(ValidationError::ConfirmationMismatch);
    };
    if confirmation_input.trim().is_empty() {
        return Err(ValidationError::ConfirmationMismatch);
    }
    if identity.to_lowercase() != confirmation_input.to_lowercase() {
        return Err(ValidationError::ConfirmationMismatch);
    }
    Ok(())
}
