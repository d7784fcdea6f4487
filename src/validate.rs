//! Envelope validation.
//!
//! [`validate`] is a pure gate: it checks that a raw webhook body is a WhatsApp
//! Business webhook addressed to the expected business account, and hands back
//! a [`ValidEnvelope`] that [`normalize`](crate::normalize()) accepts. It never
//! mutates the envelope and never performs I/O.
//!
//! Checks run in a fixed order and the first failure short-circuits:
//!
//! 1. the envelope is not `null`
//! 2. `entry` is an array
//! 3. `object` is `whatsapp_business_account`
//! 4. `entry[0].id` equals the expected account id
//! 5. `entry[0].changes[0].field` is `messages`
//!
//! An account id of `"0"` (Meta's test subscription) records a
//! [`ValidationWarning::TestAccountId`] but does not by itself fail validation.

use std::fmt;

use serde_json::Value;
use tracing::warn;

use crate::{
    envelope::{MESSAGES_FIELD, WHATSAPP_BUSINESS_ACCOUNT},
    error::{ValidationError, ValidationErrorKind},
};

/// The account id Meta uses for test-subscription webhooks.
const TEST_ACCOUNT_ID: &str = "0";

/// A non-fatal finding recorded while validating an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationWarning {
    /// `entry[0].id` is `"0"`, which Meta uses for test-subscription traffic
    /// rather than real customer messages.
    TestAccountId,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TestAccountId => f.write_str(
                "WABA id is 0. You seem to be testing with the Meta test subscription. \
                 This is not a real WABA id; send an actual message from a real \
                 WhatsApp customer number.",
            ),
        }
    }
}

/// An envelope that passed [`validate`].
///
/// Borrows the caller's JSON; the only way to obtain one is through
/// [`validate`], so [`normalize`](crate::normalize()) can rely on `entry[0]`
/// and `entry[0].changes[0]` being present.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidEnvelope<'a> {
    envelope: &'a Value,
    account_id: &'a str,
    warnings: Vec<ValidationWarning>,
}

impl<'a> ValidEnvelope<'a> {
    /// The envelope, unchanged.
    pub fn envelope(&self) -> &'a Value {
        self.envelope
    }

    /// The business account id the envelope is addressed to.
    pub fn account_id(&self) -> &'a str {
        self.account_id
    }

    /// Warnings recorded during validation.
    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    /// `entry[0].changes[0].value`, if present.
    pub(crate) fn change_value(&self) -> Option<&'a Value> {
        self.envelope.pointer("/entry/0/changes/0/value")
    }
}

/// Validates a raw webhook body against the expected business account id.
///
/// # Example
/// ```rust
/// use serde_json::json;
/// use whatsapp_webhook_rs::validate;
///
/// let body = json!({
///     "object": "whatsapp_business_account",
///     "entry": [{
///         "id": "442476028955381",
///         "changes": [{ "field": "messages", "value": {} }]
///     }]
/// });
///
/// let valid = validate(&body, "442476028955381").unwrap();
/// assert!(valid.warnings().is_empty());
///
/// assert!(validate(&body, "another-account").is_err());
/// ```
pub fn validate<'a>(
    envelope: &'a Value,
    account_id: &str,
) -> Result<ValidEnvelope<'a>, ValidationError> {
    let mut warnings = Vec::new();

    macro_rules! reject {
        ($kind:expr) => {
            return Err(ValidationError::new($kind, warnings))
        };
    }

    if envelope.is_null() {
        reject!(ValidationErrorKind::MissingEnvelope);
    }

    if account_id.is_empty() {
        reject!(ValidationErrorKind::MissingAccountId);
    }

    let Some(entries) = envelope.get("entry").and_then(Value::as_array) else {
        reject!(ValidationErrorKind::InvalidEntry);
    };

    let object = envelope.get("object").and_then(Value::as_str);
    if object != Some(WHATSAPP_BUSINESS_ACCOUNT) {
        reject!(ValidationErrorKind::InvalidObject {
            found: object.map(str::to_owned),
        });
    }

    let entry = entries.first();
    let waba_id = entry.and_then(|entry| entry.get("id")).and_then(Value::as_str);

    if waba_id == Some(TEST_ACCOUNT_ID) {
        let warning = ValidationWarning::TestAccountId;
        warn!(waba_id = TEST_ACCOUNT_ID, "{warning}");
        warnings.push(warning);
    }

    let account_id = match waba_id {
        Some(id) if id == account_id => id,
        found => reject!(ValidationErrorKind::AccountMismatch {
            found: found.map(str::to_owned),
        }),
    };

    let first_change = entry
        .and_then(|entry| entry.get("changes"))
        .and_then(Value::as_array)
        .and_then(|changes| changes.first());

    let field = first_change
        .and_then(|change| change.get("field"))
        .and_then(Value::as_str);

    if field != Some(MESSAGES_FIELD) {
        reject!(ValidationErrorKind::InvalidChanges);
    }

    Ok(ValidEnvelope {
        envelope,
        account_id,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WABA_ID: &str = "442476028955381";

    fn envelope(waba_id: &str) -> Value {
        json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": waba_id,
                "changes": [{
                    "field": "messages",
                    "value": { "messaging_product": "whatsapp" }
                }]
            }]
        })
    }

    #[test]
    fn accepts_matching_account() {
        let body = envelope(WABA_ID);
        let valid = validate(&body, WABA_ID).unwrap();

        assert_eq!(valid.account_id(), WABA_ID);
        assert!(valid.warnings().is_empty());
        assert_eq!(valid.envelope(), &body);
        assert!(valid.change_value().is_some());
    }

    #[test]
    fn rejects_null_envelope() {
        let err = validate(&Value::Null, WABA_ID).unwrap_err();
        assert_eq!(err.kind(), &ValidationErrorKind::MissingEnvelope);
    }

    #[test]
    fn rejects_empty_expected_account() {
        let body = envelope(WABA_ID);
        let err = validate(&body, "").unwrap_err();
        assert_eq!(err.kind(), &ValidationErrorKind::MissingAccountId);
    }

    #[test]
    fn rejects_non_array_entry() {
        let body = json!({ "object": "whatsapp_business_account", "entry": {} });
        let err = validate(&body, WABA_ID).unwrap_err();
        assert_eq!(err.kind(), &ValidationErrorKind::InvalidEntry);

        let body = json!({ "object": "whatsapp_business_account" });
        let err = validate(&body, WABA_ID).unwrap_err();
        assert_eq!(err.kind(), &ValidationErrorKind::InvalidEntry);
    }

    #[test]
    fn rejects_wrong_object_regardless_of_other_fields() {
        let mut body = envelope(WABA_ID);
        body["object"] = json!("page");

        let err = validate(&body, WABA_ID).unwrap_err();
        assert_eq!(
            err.kind(),
            &ValidationErrorKind::InvalidObject {
                found: Some("page".into())
            }
        );

        body.as_object_mut().unwrap().remove("object");
        let err = validate(&body, WABA_ID).unwrap_err();
        assert_eq!(err.kind(), &ValidationErrorKind::InvalidObject { found: None });
    }

    #[test]
    fn entry_check_runs_before_object_check() {
        let body = json!({ "object": "page", "entry": "nope" });
        let err = validate(&body, WABA_ID).unwrap_err();
        assert_eq!(err.kind(), &ValidationErrorKind::InvalidEntry);
    }

    #[test]
    fn rejects_foreign_account() {
        let body = envelope("111111111111111");
        let err = validate(&body, WABA_ID).unwrap_err();
        assert_eq!(
            err.kind(),
            &ValidationErrorKind::AccountMismatch {
                found: Some("111111111111111".into())
            }
        );
        assert!(err.warnings().is_empty());
    }

    #[test]
    fn rejects_empty_entry_array() {
        let body = json!({ "object": "whatsapp_business_account", "entry": [] });
        let err = validate(&body, WABA_ID).unwrap_err();
        assert_eq!(err.kind(), &ValidationErrorKind::AccountMismatch { found: None });
    }

    #[test]
    fn test_account_id_warns_and_still_fails_on_mismatch() {
        let body = envelope("0");
        let err = validate(&body, WABA_ID).unwrap_err();

        assert!(matches!(err.kind(), ValidationErrorKind::AccountMismatch { .. }));
        assert_eq!(err.warnings(), &[ValidationWarning::TestAccountId]);
    }

    #[test]
    fn test_account_id_warns_and_passes_when_expected() {
        let body = envelope("0");
        let valid = validate(&body, "0").unwrap();
        assert_eq!(valid.warnings(), &[ValidationWarning::TestAccountId]);
    }

    #[test]
    fn rejects_missing_or_foreign_changes() {
        let mut body = envelope(WABA_ID);
        body["entry"][0]["changes"] = json!([]);
        let err = validate(&body, WABA_ID).unwrap_err();
        assert_eq!(err.kind(), &ValidationErrorKind::InvalidChanges);

        let mut body = envelope(WABA_ID);
        body["entry"][0]["changes"][0]["field"] = json!("account_update");
        let err = validate(&body, WABA_ID).unwrap_err();
        assert_eq!(err.kind(), &ValidationErrorKind::InvalidChanges);

        let mut body = envelope(WABA_ID);
        body["entry"][0].as_object_mut().unwrap().remove("changes");
        let err = validate(&body, WABA_ID).unwrap_err();
        assert_eq!(err.kind(), &ValidationErrorKind::InvalidChanges);
    }
}
