use std::io::{BufRead, Write};
use std::sync::Arc;

use adieu_core::error::{ErrorBody, codes};
use adieu_core::{
    ClosureActions, CloseAccountFlow, ContactFormatter, FlowError, FlowState, FormValues,
    InputHint, Navigator, PhoneAwareFormatter, SessionSource,
};
use clap::Args;
use serde_json::json;

use crate::closer::{ClosureErrorStore, HttpAccountCloser};
use crate::util::{
    StoredSession, closure_error_path, eprint_json, exit_error, exit_with, print_json,
    resolve_token,
};

/// Typed at any prompt to leave the screen, like the header back button.
pub const BACK_COMMAND: &str = ":back";

/// Typed at the reason prompt to drop a reason kept from an earlier attempt.
pub const CLEAR_COMMAND: &str = "-";

#[derive(Args, Debug, Default)]
pub struct CloseArgs {
    /// Why you are leaving (optional)
    #[arg(long)]
    pub reason: Option<String>,
    /// Your email or phone number, typed exactly as on the account.
    /// Skips the interactive screen.
    #[arg(long)]
    pub confirm_contact: Option<String>,
    /// Answer "yes" to the final warning (required with --confirm-contact)
    #[arg(long)]
    pub yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenExit {
    Submitted,
    NavigatedBack,
}

/// Back navigation for the terminal: report where the user went.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackToSecuritySettings;

impl Navigator for BackToSecuritySettings {
    fn navigate_back(&self) {
        tracing::debug!("leaving close-account screen");
        print_json(&json!({
            "status": "navigated_back",
            "route": "settings/security"
        }));
    }
}

pub async fn run(api_url: &str, sms_domain: Option<String>, args: CloseArgs) -> i32 {
    let token = match resolve_token() {
        Ok(t) => t,
        Err(e) => exit_error(
            &e.to_string(),
            Some("Closing an account requires a signed-in session."),
        ),
    };

    let errors = ClosureErrorStore::at(closure_error_path());
    let closer = Arc::new(HttpAccountCloser::new(
        tokio::runtime::Handle::current(),
        api_url,
        token,
        errors.clone(),
    ));
    let flow = CloseAccountFlow::with_formatter(
        StoredSession,
        closer.clone(),
        PhoneAwareFormatter::new(sms_domain),
    );

    let (flow, exit) = if args.confirm_contact.is_some() {
        let mut flow = flow;
        match run_scripted(&mut flow, args) {
            Ok(exit) => (flow, exit),
            Err((body, code)) => {
                eprint_json(&body);
                return code;
            }
        }
    } else {
        let screen_errors = errors.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let mut flow = flow;
            let stdin = std::io::stdin();
            let mut screen = Screen::new(
                stdin.lock(),
                std::io::stdout(),
                BackToSecuritySettings,
                screen_errors,
            );
            let exit = screen.run(&mut flow).map_err(|e| e.to_string());
            (flow, exit)
        })
        .await;
        match joined {
            Ok((flow, Ok(exit))) => (flow, exit),
            Ok((flow, Err(message))) => {
                // exit skips destructors
                flow.teardown();
                exit_with(&message, None, 2)
            }
            // The flow was dropped, and torn down, while the task unwound.
            Err(e) => exit_with(&format!("Close-account screen crashed: {e}"), None, 2),
        }
    };

    if exit == ScreenExit::NavigatedBack {
        flow.teardown();
        return 0;
    }
    settle(flow, &closer).await
}

/// Tear the screen down, then report the dispatched closure.
///
/// Teardown clears the error shown on this visit. A failure reported afterwards
/// stays in the store and is shown the next time the screen opens.
pub async fn settle<S, A, F>(flow: CloseAccountFlow<S, A, F>, closer: &HttpAccountCloser) -> i32
where
    S: SessionSource,
    A: ClosureActions,
    F: ContactFormatter,
{
    flow.teardown();
    match closer.wait().await {
        Ok(response) => {
            print_json(&json!({
                "status": "account_closed",
                "response": response
            }));
            0
        }
        Err(failure) => {
            eprint_json(&failure.body);
            failure.exit_code
        }
    }
}

/// Non-interactive path: one submit, then confirm only with `--yes`.
pub fn run_scripted<S, A, F>(
    flow: &mut CloseAccountFlow<S, A, F>,
    args: CloseArgs,
) -> Result<ScreenExit, (ErrorBody, i32)>
where
    S: SessionSource,
    A: ClosureActions,
    F: ContactFormatter,
{
    let values = FormValues::new(
        args.reason.unwrap_or_default(),
        args.confirm_contact.unwrap_or_default(),
    );
    if let Err(e) = flow.submit_form(values) {
        return Err((ErrorBody::from(&e), 1));
    }

    if !args.yes {
        flow.cancel_destruction().map_err(|e| (ErrorBody::from(&e), 4))?;
        return Err((
            ErrorBody::new(
                codes::CLI_ERROR,
                "Closing your account is permanent and deletes all of its data.",
            )
            .with_docs_hint("Add --yes to proceed: adieu close --confirm-contact <contact> --yes"),
            4,
        ));
    }

    flow.confirm_destruction()
        .map_err(|e| (ErrorBody::from(&e), 4))?;
    Ok(ScreenExit::Submitted)
}

/// Line-based rendering of the close-account screen.
pub struct Screen<R, W, N> {
    input: R,
    output: W,
    navigator: N,
    errors: ClosureErrorStore,
}

impl<R, W, N> Screen<R, W, N>
where
    R: BufRead,
    W: Write,
    N: Navigator,
{
    pub fn new(input: R, output: W, navigator: N, errors: ClosureErrorStore) -> Self {
        Self {
            input,
            output,
            navigator,
            errors,
        }
    }

    pub fn run<S, A, F>(
        &mut self,
        flow: &mut CloseAccountFlow<S, A, F>,
    ) -> Result<ScreenExit, Box<dyn std::error::Error>>
    where
        S: SessionSource,
        A: ClosureActions,
        F: ContactFormatter,
    {
        writeln!(self.output, "Close account")?;
        writeln!(self.output, "(type {BACK_COMMAND} at any prompt to go back)")?;

        loop {
            match flow.state() {
                FlowState::Editing => {
                    let Some(values) = self.edit(flow)? else {
                        return Ok(self.back());
                    };
                    match flow.submit_form(values) {
                        Ok(()) => {}
                        Err(FlowError::Validation(err)) => {
                            writeln!(self.output, "  ✗ {err}")?;
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                FlowState::AwaitingConfirmation => {
                    writeln!(self.output)?;
                    writeln!(self.output, "⚠ Are you sure you want to close your account?")?;
                    writeln!(
                        self.output,
                        "  This will permanently delete your account and all of its data."
                    )?;
                    let answer = self.prompt("Yes, continue? [y/N] ")?;
                    match answer.as_deref().map(str::to_lowercase).as_deref() {
                        Some("y") | Some("yes") => flow.confirm_destruction()?,
                        Some(_) => flow.cancel_destruction()?,
                        None => {
                            flow.cancel_destruction()?;
                            return Ok(self.back());
                        }
                    }
                }
                FlowState::Submitted => {
                    writeln!(self.output, "Closing your account…")?;
                    return Ok(ScreenExit::Submitted);
                }
            }
        }
    }

    fn edit<S, A, F>(
        &mut self,
        flow: &CloseAccountFlow<S, A, F>,
    ) -> std::io::Result<Option<FormValues>>
    where
        S: SessionSource,
        A: ClosureActions,
        F: ContactFormatter,
    {
        if let Some(failure) = self.errors.current() {
            writeln!(self.output, "! Closing your account failed: {}", failure.message())?;
        }

        writeln!(self.output)?;
        writeln!(self.output, "Please tell us why you're leaving (optional).")?;
        let kept = flow.reason_for_leaving().to_string();
        let label = if kept.is_empty() {
            "Reason: ".to_string()
        } else {
            format!("Reason [{kept}] (enter to keep, {CLEAR_COMMAND} to clear): ")
        };
        let Some(typed) = self.prompt(&label)? else {
            return Ok(None);
        };
        let reason = match typed.as_str() {
            "" => kept,
            CLEAR_COMMAND => String::new(),
            _ => typed,
        };

        match flow.display_contact() {
            Some(contact) => writeln!(
                self.output,
                "Enter your default contact method to confirm: {contact}."
            )?,
            None => writeln!(
                self.output,
                "This session has no contact method; the account cannot be closed here."
            )?,
        }
        let hint = match flow.input_hint() {
            InputHint::Email => "email address",
            InputHint::Default => "phone number or email",
        };
        let Some(confirmation) = self.prompt(&format!("Default contact ({hint}): "))? else {
            return Ok(None);
        };

        Ok(Some(FormValues::new(reason, confirmation)))
    }

    /// `None` on EOF or the back command. Only the line terminator is removed.
    fn prompt(&mut self, label: &str) -> std::io::Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(&line)
            .to_string();
        if line == BACK_COMMAND {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn back(&mut self) -> ScreenExit {
        self.navigator.navigate_back();
        ScreenExit::NavigatedBack
    }
}
