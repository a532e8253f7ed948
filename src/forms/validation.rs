//! Sign-in and sign-up form validation.
//!
//! Field names in [`FieldErrors`] use the camelCase keys the web form posts,
//! so the client can put each message straight under its input.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::roles::Role;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_NAME_LEN: usize = 2;
pub const MAX_NAME_LEN: usize = 100;

const EMAIL_MESSAGE: &str = "Please enter a valid email address";
const PASSWORD_MESSAGE: &str = "Password must be at least 6 characters";
const NAME_SHORT_MESSAGE: &str = "Full name must be at least 2 characters";
const NAME_LONG_MESSAGE: &str = "Full name must be at most 100 characters";
const ROLE_MESSAGE: &str = "Please select a role";
const MISMATCH_MESSAGE: &str = "Passwords don't match";

static EMAIL_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
        .unwrap()
});

pub fn is_valid_email(email: &str) -> bool {
    !email.starts_with('.') && !email.contains("..") && EMAIL_RE.is_match(email)
}

/// First error message per field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Record `message` unless the field already has one.
    pub fn add(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_owned())
            .or_insert_with(|| message.to_owned());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn into_result<T>(self, ok: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(ok) } else { Err(self) }
    }
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if !is_valid_email(email) {
        errors.add("email", EMAIL_MESSAGE);
    }
}

fn check_password(errors: &mut FieldErrors, field: &str, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(field, PASSWORD_MESSAGE);
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SignInForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ValidSignIn {
    pub email: String,
    #[serde(skip)]
    pub password: String,
}

impl SignInForm {
    pub fn validate(&self) -> Result<ValidSignIn, FieldErrors> {
        let email = self.email.trim();
        let mut errors = FieldErrors::default();
        check_email(&mut errors, email);
        check_password(&mut errors, "password", &self.password);
        errors.into_result(ValidSignIn {
            email: email.to_lowercase(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SignUpForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ValidSignUp {
    pub email: String,
    #[serde(skip)]
    pub password: String,
    pub full_name: String,
    pub role: Role,
    pub dashboard: super::roles::Dashboard,
}

impl SignUpForm {
    /// Validate every field, then check that the passwords agree.
    ///
    /// The mismatch message is only reported once every field is individually
    /// valid, so a user fixing a short password is not told about both at once.
    pub fn validate(&self) -> Result<ValidSignUp, FieldErrors> {
        let email = self.email.trim();
        let full_name = self.full_name.trim();
        let mut errors = FieldErrors::default();

        check_email(&mut errors, email);
        check_password(&mut errors, "password", &self.password);
        check_password(&mut errors, "confirmPassword", &self.confirm_password);

        let name_len = full_name.chars().count();
        if name_len < MIN_NAME_LEN {
            errors.add("fullName", NAME_SHORT_MESSAGE);
        } else if name_len > MAX_NAME_LEN {
            errors.add("fullName", NAME_LONG_MESSAGE);
        }

        let role = self
            .role
            .as_deref()
            .and_then(|r| r.parse::<Role>().ok())
            .filter(|r| Role::SELECTABLE.contains(r));
        if role.is_none() {
            errors.add("role", ROLE_MESSAGE);
        }

        if errors.is_empty() && self.password != self.confirm_password {
            errors.add("confirmPassword", MISMATCH_MESSAGE);
        }

        match role {
            Some(role) if errors.is_empty() => Ok(ValidSignUp {
                email: email.to_lowercase(),
                password: self.password.clone(),
                full_name: full_name.to_owned(),
                role,
                dashboard: role.dashboard(),
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_up(email: &str, password: &str, confirm: &str, name: &str, role: Option<&str>) -> SignUpForm {
        SignUpForm {
            email: email.to_owned(),
            password: password.to_owned(),
            confirm_password: confirm.to_owned(),
            full_name: name.to_owned(),
            role: role.map(str::to_owned),
        }
    }

    #[test]
    fn email_shapes() {
        for good in ["a@b.co", "first.last+tag@uni.ac.in", "x_y@sub-domain.example.org"] {
            assert!(is_valid_email(good), "{good}");
        }
        for bad in ["", "plain", "a@b", "@b.com", ".a@b.com", "a..b@c.com", "a@b.c", "a b@c.com"] {
            assert!(!is_valid_email(bad), "{bad}");
        }
    }

    #[test]
    fn sign_in_reports_each_field() {
        let form = SignInForm {
            email: "nope".into(),
            password: "123".into(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("email"), Some(EMAIL_MESSAGE));
        assert_eq!(errors.get("password"), Some(PASSWORD_MESSAGE));

        let ok = SignInForm {
            email: "  Teacher@College.EDU ".into(),
            password: "secret1".into(),
        }
        .validate()
        .unwrap();
        assert_eq!(ok.email, "teacher@college.edu");
    }

    #[test]
    fn sign_up_accepts_valid_forms() {
        let ok = sign_up("hod@college.edu", "secret1", "secret1", " Meera Iyer ", Some("hod"))
            .validate()
            .unwrap();
        assert_eq!(ok.full_name, "Meera Iyer");
        assert_eq!(ok.role, Role::Hod);
        assert_eq!(ok.dashboard, super::super::roles::Dashboard::Department);
    }

    #[test]
    fn sign_up_rejects_bad_roles() {
        for role in [None, Some(""), Some("admin"), Some("dean")] {
            let errors = sign_up("a@b.co", "secret1", "secret1", "Al", role)
                .validate()
                .unwrap_err();
            assert_eq!(errors.get("role"), Some(ROLE_MESSAGE));
        }
    }

    #[test]
    fn name_length_bounds() {
        let errors = sign_up("a@b.co", "secret1", "secret1", "A", Some("student"))
            .validate()
            .unwrap_err();
        assert_eq!(errors.get("fullName"), Some(NAME_SHORT_MESSAGE));

        let long = "x".repeat(101);
        let errors = sign_up("a@b.co", "secret1", "secret1", &long, Some("student"))
            .validate()
            .unwrap_err();
        assert_eq!(errors.get("fullName"), Some(NAME_LONG_MESSAGE));
    }

    #[test]
    fn mismatch_only_after_fields_pass() {
        let errors = sign_up("a@b.co", "secret1", "secret2", "Al", Some("teacher"))
            .validate()
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("confirmPassword"), Some(MISMATCH_MESSAGE));

        let errors = sign_up("bad", "secret1", "secret2", "Al", Some("teacher"))
            .validate()
            .unwrap_err();
        assert_eq!(errors.get("confirmPassword"), None);
        assert_eq!(errors.get("email"), Some(EMAIL_MESSAGE));
    }
}
