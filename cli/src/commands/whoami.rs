use adieu_core::{ContactFormatter, InputHint, PhoneAwareFormatter};
use serde_json::json;

use crate::util::{IdentitySource, print_json, resolve_identity};

pub fn run(sms_domain: Option<String>) -> i32 {
    let formatter = PhoneAwareFormatter::new(sms_domain);
    print_json(&describe(resolve_identity(), &formatter));
    0
}

/// What the close-account screen would ask the user to type back.
pub fn describe(
    identity: Option<(String, IdentitySource)>,
    formatter: &impl ContactFormatter,
) -> serde_json::Value {
    match identity {
        Some((raw, source)) => {
            let contact = formatter.format_contact(&raw);
            json!({
                "signed_in": true,
                "source": source,
                "contact": contact,
                "input_hint": InputHint::for_contact(&contact),
            })
        }
        None => json!({
            "signed_in": false,
            "contact": null,
            "input_hint": InputHint::Default,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_phone_login() {
        let formatter = PhoneAwareFormatter::new(Some("@sms.example.net".to_string()));
        let out = describe(
            Some((
                "+1 555 555 0123@sms.example.net".to_string(),
                IdentitySource::Stored,
            )),
            &formatter,
        );
        assert_eq!(out["contact"], "+15555550123");
        assert_eq!(out["input_hint"], "default");
        assert_eq!(out["source"], "stored");
    }

    #[test]
    fn describes_email_login() {
        let out = describe(
            Some(("user@example.com".to_string(), IdentitySource::Env)),
            &PhoneAwareFormatter::default(),
        );
        assert_eq!(out["input_hint"], "email");
        assert_eq!(out["signed_in"], true);
    }

    #[test]
    fn describes_missing_session() {
        let out = describe(None, &PhoneAwareFormatter::default());
        assert_eq!(out["signed_in"], false);
        assert!(out["contact"].is_null());
    }
}
