//! Form validation and role-based routing for the campus portal.

pub mod roles;
pub mod validation;

pub use roles::{Dashboard, NavItem, Role};
pub use validation::{FieldErrors, SignInForm, SignUpForm, ValidSignIn, ValidSignUp};
