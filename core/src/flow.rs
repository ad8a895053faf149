use std::fmt;

use serde::Serialize;

use crate::collaborators::{ClosureActions, SessionSource};
use crate::contact::{ContactFormatter, InputHint, PhoneAwareFormatter};
use crate::error::{FlowError, ValidationError};
use crate::validate::validate;

/// Where the close-account screen currently is.
///
/// The confirmation dialog is visible exactly in `AwaitingConfirmation`; there is
/// no separate flag that could drift out of sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Editing,
    AwaitingConfirmation,
    /// Terminal for this screen instance.
    Submitted,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FlowState::Editing => "editing",
            FlowState::AwaitingConfirmation => "awaiting confirmation",
            FlowState::Submitted => "submitted",
        })
    }
}

/// Values handed over by the form surface on submit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    pub reason_for_leaving: String,
    pub confirmation_input: String,
}

impl FormValues {
    pub fn new(reason_for_leaving: impl Into<String>, confirmation_input: impl Into<String>) -> Self {
        Self {
            reason_for_leaving: reason_for_leaving.into(),
            confirmation_input: confirmation_input.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub reason_for_leaving: String,
    pub confirmation_input: String,
}

/// Controller for one close-account screen instance.
///
/// The only mutators are [`submit_form`](Self::submit_form),
/// [`confirm_destruction`](Self::confirm_destruction) and
/// [`cancel_destruction`](Self::cancel_destruction). Dropping the flow (or calling
/// [`teardown`](Self::teardown)) clears any stale closure error exactly once.
pub struct CloseAccountFlow<S, A, F = PhoneAwareFormatter>
where
    S: SessionSource,
    A: ClosureActions,
    F: ContactFormatter,
{
    session: S,
    actions: A,
    formatter: F,
    state: FlowState,
    form: FormState,
    field_error: Option<ValidationError>,
}

impl<S, A> CloseAccountFlow<S, A, PhoneAwareFormatter>
where
    S: SessionSource,
    A: ClosureActions,
{
    pub fn new(session: S, actions: A) -> Self {
        Self::with_formatter(session, actions, PhoneAwareFormatter::default())
    }
}

impl<S, A, F> CloseAccountFlow<S, A, F>
where
    S: SessionSource,
    A: ClosureActions,
    F: ContactFormatter,
{
    pub fn with_formatter(session: S, actions: A, formatter: F) -> Self {
        Self {
            session,
            actions,
            formatter,
            state: FlowState::Editing,
            form: FormState::default(),
            field_error: None,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn is_dialog_visible(&self) -> bool {
        self.state == FlowState::AwaitingConfirmation
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn reason_for_leaving(&self) -> &str {
        &self.form.reason_for_leaving
    }

    /// Inline error for the confirmation field, if the last submit was rejected.
    pub fn field_error(&self) -> Option<&ValidationError> {
        self.field_error.as_ref()
    }

    /// The contact the user has to type back, as currently shown.
    pub fn display_contact(&self) -> Option<String> {
        self.session
            .identity()
            .map(|identity| self.formatter.format_contact(&identity))
    }

    pub fn input_hint(&self) -> InputHint {
        self.display_contact()
            .map(|contact| InputHint::for_contact(&contact))
            .unwrap_or(InputHint::Default)
    }

    /// Validate the form and, if it passes, open the confirmation dialog.
    ///
    /// The typed values are kept either way so the form can be re-rendered as the user
    /// left it. A rejected submit leaves the state at `Editing`.
    pub fn submit_form(&mut self, values: FormValues) -> Result<(), FlowError> {
        self.require(FlowState::Editing, "submit_form")?;

        let contact = self.display_contact();
        let verdict = validate(contact.as_deref(), &values.confirmation_input);
        self.form = FormState {
            reason_for_leaving: values.reason_for_leaving,
            confirmation_input: values.confirmation_input,
        };

        match verdict {
            Ok(()) => {
                self.field_error = None;
                self.state = FlowState::AwaitingConfirmation;
                tracing::debug!(state = %self.state, "close-account form accepted");
                Ok(())
            }
            Err(err) => {
                tracing::debug!(
                    code = err.code(),
                    has_identity = contact.is_some(),
                    "close-account form rejected"
                );
                self.field_error = Some(err.clone());
                Err(err.into())
            }
        }
    }

    /// Dispatch the closure with the stored reason and close the dialog.
    pub fn confirm_destruction(&mut self) -> Result<(), FlowError> {
        self.require(FlowState::AwaitingConfirmation, "confirm_destruction")?;

        self.state = FlowState::Submitted;
        tracing::info!(
            reason_len = self.form.reason_for_leaving.len(),
            "dispatching account closure"
        );
        self.actions.close_account(&self.form.reason_for_leaving);
        Ok(())
    }

    /// Close the dialog and go back to editing. Entered data is kept.
    pub fn cancel_destruction(&mut self) -> Result<(), FlowError> {
        self.require(FlowState::AwaitingConfirmation, "cancel_destruction")?;

        self.state = FlowState::Editing;
        tracing::debug!(state = %self.state, "account closure cancelled");
        Ok(())
    }

    /// End the screen. Equivalent to dropping the flow.
    pub fn teardown(self) {}

    fn require(&self, expected: FlowState, operation: &'static str) -> Result<(), FlowError> {
        if self.state == expected {
            return Ok(());
        }
        tracing::warn!(operation, state = %self.state, "rejected close-account transition");
        Err(FlowError::InvalidTransition {
            operation,
            state: self.state,
        })
    }
}

impl<S, A, F> Drop for CloseAccountFlow<S, A, F>
where
    S: SessionSource,
    A: ClosureActions,
    F: ContactFormatter,
{
    fn drop(&mut self) {
        tracing::debug!(state = %self.state, "close-account screen torn down");
        self.actions.clear_closure_error();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        dispatched: RefCell<Vec<String>>,
        cleared: Cell<usize>,
    }

    impl ClosureActions for Recorder {
        fn close_account(&self, reason_for_leaving: &str) {
            self.dispatched
                .borrow_mut()
                .push(reason_for_leaving.to_string());
        }

        fn clear_closure_error(&self) {
            self.cleared.set(self.cleared.get() + 1);
        }
    }

    /// Identity the test can swap between submits.
    #[derive(Default)]
    struct MutableSession(RefCell<Option<String>>);

    impl SessionSource for MutableSession {
        fn identity(&self) -> Option<String> {
            self.0.borrow().clone()
        }
    }

    const EMAIL: &str = "user@example.com";

    fn flow_for(
        identity: Option<&str>,
    ) -> (CloseAccountFlow<Option<String>, Rc<Recorder>>, Rc<Recorder>) {
        let recorder = Rc::new(Recorder::default());
        let flow = CloseAccountFlow::new(identity.map(str::to_string), recorder.clone());
        (flow, recorder)
    }

    #[test]
    fn starts_editing_with_empty_form() {
        let (flow, _) = flow_for(Some(EMAIL));
        assert_eq!(flow.state(), FlowState::Editing);
        assert!(!flow.is_dialog_visible());
        assert_eq!(flow.reason_for_leaving(), "");
        assert!(flow.field_error().is_none());
    }

    #[test]
    fn case_insensitive_match_opens_dialog() {
        let (mut flow, _) = flow_for(Some(EMAIL));
        flow.submit_form(FormValues::new("", "USER@EXAMPLE.COM"))
            .unwrap();
        assert_eq!(flow.state(), FlowState::AwaitingConfirmation);
        assert!(flow.is_dialog_visible());
    }

    #[test]
    fn empty_confirmation_keeps_dialog_closed() {
        let (mut flow, recorder) = flow_for(Some(EMAIL));
        let err = flow.submit_form(FormValues::new("bye", "")).unwrap_err();
        assert!(matches!(
            err,
            FlowError::Validation(ValidationError::ConfirmationMismatch)
        ));
        assert_eq!(flow.state(), FlowState::Editing);
        assert!(!flow.is_dialog_visible());
        assert_eq!(
            flow.field_error(),
            Some(&ValidationError::ConfirmationMismatch)
        );
        assert!(recorder.dispatched.borrow().is_empty());
    }

    #[test]
    fn missing_identity_never_opens_dialog() {
        let (mut flow, _) = flow_for(None);
        assert!(flow.submit_form(FormValues::new("", "")).is_err());
        assert!(flow.submit_form(FormValues::new("", EMAIL)).is_err());
        assert!(!flow.is_dialog_visible());
        assert_eq!(flow.input_hint(), InputHint::Default);
    }

    #[test]
    fn confirm_dispatches_stored_reason_once() {
        let (mut flow, recorder) = flow_for(Some(EMAIL));
        flow.submit_form(FormValues::new("too many emails", EMAIL))
            .unwrap();
        assert_eq!(flow.reason_for_leaving(), "too many emails");

        flow.confirm_destruction().unwrap();
        assert_eq!(flow.state(), FlowState::Submitted);
        assert!(!flow.is_dialog_visible());
        assert_eq!(*recorder.dispatched.borrow(), vec!["too many emails"]);

        // A second confirm from the same interaction is refused.
        assert!(matches!(
            flow.confirm_destruction(),
            Err(FlowError::InvalidTransition {
                state: FlowState::Submitted,
                ..
            })
        ));
        assert_eq!(recorder.dispatched.borrow().len(), 1);
    }

    #[test]
    fn reason_is_stored_verbatim() {
        let (mut flow, recorder) = flow_for(Some(EMAIL));
        let reason = "  Too many\nemails!  ";
        flow.submit_form(FormValues::new(reason, EMAIL)).unwrap();
        flow.confirm_destruction().unwrap();
        assert_eq!(*recorder.dispatched.borrow(), vec![reason]);
    }

    #[test]
    fn cancel_returns_to_editing_and_keeps_reason() {
        let (mut flow, recorder) = flow_for(Some(EMAIL));
        flow.submit_form(FormValues::new("too many emails", EMAIL))
            .unwrap();
        flow.cancel_destruction().unwrap();

        assert_eq!(flow.state(), FlowState::Editing);
        assert!(!flow.is_dialog_visible());
        assert_eq!(flow.reason_for_leaving(), "too many emails");
        assert!(recorder.dispatched.borrow().is_empty());

        // The user can resubmit.
        flow.submit_form(FormValues::new("too many emails", EMAIL))
            .unwrap();
        flow.confirm_destruction().unwrap();
        assert_eq!(*recorder.dispatched.borrow(), vec!["too many emails"]);
    }

    #[test]
    fn confirm_and_cancel_require_open_dialog() {
        let (mut flow, recorder) = flow_for(Some(EMAIL));
        assert!(matches!(
            flow.confirm_destruction(),
            Err(FlowError::InvalidTransition {
                operation: "confirm_destruction",
                state: FlowState::Editing,
            })
        ));
        assert!(matches!(
            flow.cancel_destruction(),
            Err(FlowError::InvalidTransition {
                operation: "cancel_destruction",
                ..
            })
        ));
        assert!(recorder.dispatched.borrow().is_empty());
    }

    #[test]
    fn submit_is_refused_while_dialog_open() {
        let (mut flow, _) = flow_for(Some(EMAIL));
        flow.submit_form(FormValues::new("first", EMAIL)).unwrap();
        assert!(matches!(
            flow.submit_form(FormValues::new("second", EMAIL)),
            Err(FlowError::InvalidTransition {
                operation: "submit_form",
                state: FlowState::AwaitingConfirmation,
            })
        ));
        assert_eq!(flow.reason_for_leaving(), "first");
    }

    #[test]
    fn successful_submit_clears_previous_field_error() {
        let (mut flow, _) = flow_for(Some(EMAIL));
        assert!(flow.submit_form(FormValues::new("", "nope")).is_err());
        assert!(flow.field_error().is_some());
        flow.submit_form(FormValues::new("", EMAIL)).unwrap();
        assert!(flow.field_error().is_none());
    }

    #[test]
    fn identity_is_read_on_every_submit() {
        let session = Rc::new(MutableSession::default());
        let recorder = Rc::new(Recorder::default());
        let mut flow = CloseAccountFlow::new(session.clone(), recorder.clone());

        assert!(flow.submit_form(FormValues::new("", EMAIL)).is_err());
        *session.0.borrow_mut() = Some(EMAIL.to_string());
        flow.submit_form(FormValues::new("", EMAIL)).unwrap();
        assert!(flow.is_dialog_visible());
    }

    #[test]
    fn comparison_uses_formatted_contact() {
        let recorder = Rc::new(Recorder::default());
        let formatter = PhoneAwareFormatter::new(Some("@sms.example.net".to_string()));
        let mut flow = CloseAccountFlow::with_formatter(
            Some("+15555550123@sms.example.net".to_string()),
            recorder,
            formatter,
        );
        assert_eq!(flow.display_contact().as_deref(), Some("+15555550123"));
        assert_eq!(flow.input_hint(), InputHint::Default);
        assert!(
            flow.submit_form(FormValues::new("", "+15555550123@sms.example.net"))
                .is_err()
        );
        flow.submit_form(FormValues::new("", "+15555550123")).unwrap();
    }

    #[test]
    fn email_identity_hints_email_keyboard() {
        let (flow, _) = flow_for(Some(EMAIL));
        assert_eq!(flow.input_hint(), InputHint::Email);
    }

    #[test]
    fn teardown_clears_error_once_in_every_state() {
        let (flow, recorder) = flow_for(Some(EMAIL));
        flow.teardown();
        assert_eq!(recorder.cleared.get(), 1);

        let (mut flow, recorder) = flow_for(Some(EMAIL));
        flow.submit_form(FormValues::new("", EMAIL)).unwrap();
        drop(flow);
        assert_eq!(recorder.cleared.get(), 1);

        let (mut flow, recorder) = flow_for(Some(EMAIL));
        flow.submit_form(FormValues::new("", EMAIL)).unwrap();
        flow.confirm_destruction().unwrap();
        assert_eq!(recorder.cleared.get(), 0);
        flow.teardown();
        assert_eq!(recorder.cleared.get(), 1);
    }

    #[test]
    fn closure_error_is_not_cleared_on_resubmit() {
        let (mut flow, recorder) = flow_for(Some(EMAIL));
        assert!(flow.submit_form(FormValues::new("", "wrong")).is_err());
        flow.submit_form(FormValues::new("", EMAIL)).unwrap();
        flow.cancel_destruction().unwrap();
        assert_eq!(recorder.cleared.get(), 0);
    }
}
