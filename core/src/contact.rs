use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@.]{2,}$").expect("email regex is valid")
});

/// Optional leading `+`, then digits with the usual separators. At least 7 digits overall.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9][0-9 ().\-]{5,}[0-9]$").expect("phone regex is valid")
});

/// Turns the raw session identity into the form shown to (and typed back by) the user.
pub trait ContactFormatter {
    fn format_contact(&self, identity: &str) -> String;
}

impl<F> ContactFormatter for F
where
    F: Fn(&str) -> String,
{
    fn format_contact(&self, identity: &str) -> String {
        self(identity)
    }
}

/// Default formatter. Phone logins are stored as `<number><sms_domain>`; the suffix is
/// dropped and the number canonicalized to `+` and digits. Emails pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct PhoneAwareFormatter {
    sms_domain: Option<String>,
}

impl PhoneAwareFormatter {
    pub fn new(sms_domain: Option<String>) -> Self {
        Self {
            sms_domain: sms_domain.filter(|d| !d.is_empty()),
        }
    }
}

impl ContactFormatter for PhoneAwareFormatter {
    fn format_contact(&self, identity: &str) -> String {
        let bare = match &self.sms_domain {
            Some(domain) => identity.strip_suffix(domain.as_str()).unwrap_or(identity),
            None => identity,
        };
        if is_phone_like(bare) {
            canonical_phone(bare)
        } else {
            bare.to_string()
        }
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

fn is_phone_like(value: &str) -> bool {
    PHONE_RE.is_match(value) && value.chars().filter(char::is_ascii_digit).count() >= 7
}

fn canonical_phone(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    if value.starts_with('+') {
        out.push('+');
    }
    out.extend(value.chars().filter(char::is_ascii_digit));
    out
}

/// Which keyboard/prompt hint to offer for the confirmation field.
/// Purely presentational; never consulted by validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputHint {
    Email,
    Default,
}

impl InputHint {
    pub fn for_contact(formatted_contact: &str) -> Self {
        if is_valid_email(formatted_contact) {
            InputHint::Email
        } else {
            InputHint::Default
        }
    }
}
