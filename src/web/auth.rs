//! Form validation and role routing for the sign-in and sign-up pages.
//!
//! Credentials are checked by the hosted auth provider; these endpoints only
//! tell the client whether a form is acceptable and where a role lands.

use axum::extract::Query;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::forms::{Dashboard, NavItem, Role, SignInForm, SignUpForm, ValidSignIn, ValidSignUp};
use crate::web::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct NavigationParams {
    pub role: Option<String>,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NavigationResponse {
    pub role: Role,
    pub dashboard: Dashboard,
    pub section_label: &'static str,
    pub items: &'static [NavItem],
}

impl From<Role> for NavigationResponse {
    fn from(role: Role) -> Self {
        Self {
            role,
            dashboard: role.dashboard(),
            section_label: role.section_label(),
            items: role.navigation(),
        }
    }
}

/// `POST /api/auth/validate/sign-in`
pub async fn validate_sign_in(Json(form): Json<SignInForm>) -> Result<Json<ValidSignIn>, ApiError> {
    form.validate().map(Json).map_err(|fields| {
        debug!(fields = fields.len(), "sign-in form rejected");
        ApiError::validation(fields)
    })
}

/// `POST /api/auth/validate/sign-up`
pub async fn validate_sign_up(Json(form): Json<SignUpForm>) -> Result<Json<ValidSignUp>, ApiError> {
    form.validate().map(Json).map_err(|fields| {
        debug!(fields = fields.len(), "sign-up form rejected");
        ApiError::validation(fields)
    })
}

/// `GET /api/navigation?role=`
///
/// Unknown or missing roles get the student menu.
pub async fn navigation(Query(params): Query<NavigationParams>) -> Json<NavigationResponse> {
    let role = Role::parse_or_student(params.role.as_deref());
    Json(role.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_follows_role() {
        let hod = NavigationResponse::from(Role::Hod);
        assert_eq!(hod.dashboard, Dashboard::Department);
        assert_eq!(hod.section_label, "Management");
        assert!(hod.items.iter().any(|i| i.url == "/attendance-reports"));

        let teacher = NavigationResponse::from(Role::Teacher);
        assert!(teacher.items.iter().any(|i| i.url == "/live-classroom"));
    }
}
