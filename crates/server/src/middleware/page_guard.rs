//! Advisory redirects for page navigation.
//!
//! The API enforces access on every call. This guard only keeps browsers on
//! sensible pages: anonymous visitors to a protected area go to sign-in with
//! a return path, signed-in users skip the auth pages, and users without the
//! area's role land on their own dashboard. It trusts the role inside the
//! token and never touches the database.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use sparkure_core::Role;

use super::cookie::token_from_headers;
use crate::state::AppState;

/// Protected page areas and the role each one requires.
const PROTECTED: &[(&str, Role)] = &[
    ("/dashboard", Role::User),
    ("/booking", Role::User),
    ("/employee", Role::Employee),
    ("/admin", Role::Admin),
];

const SIGN_IN: &str = "/sign-in";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageDecision {
    Allow,
    Redirect(String),
}

/// Decide where a page request for `path` (with optional `query`) should go.
#[must_use]
pub fn decide(path: &str, query: Option<&str>, role: Option<Role>) -> PageDecision {
    if is_auth_page(path) {
        return match role {
            Some(role) => PageDecision::Redirect(role.landing_path().to_string()),
            None => PageDecision::Allow,
        };
    }

    let Some(required) = required_role(path) else {
        return PageDecision::Allow;
    };

    match role {
        None => {
            let target = match query {
                Some(q) if !q.is_empty() => format!("{path}?{q}"),
                _ => path.to_string(),
            };
            PageDecision::Redirect(format!(
                "{SIGN_IN}?returnTo={}&reason=booking",
                urlencoding::encode(&target)
            ))
        }
        Some(role) if role.satisfies(required) => PageDecision::Allow,
        Some(role) => PageDecision::Redirect(role.landing_path().to_string()),
    }
}

fn is_auth_page(path: &str) -> bool {
    let path = path.trim_end_matches('/');
    path.ends_with("/sign-in") || path.ends_with("/sign-up")
}

fn required_role(path: &str) -> Option<Role> {
    PROTECTED
        .iter()
        .find(|(prefix, _)| {
            path == *prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
        .map(|&(_, role)| role)
}

/// Apply [`decide`] to browser navigation. API and health routes pass through.
pub async fn page_guard_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    if request.method() != Method::GET || path.starts_with("/api/") || path.starts_with("/health")
    {
        return next.run(request).await;
    }

    let role = token_from_headers(request.headers())
        .and_then(|token| state.tokens().verify(&token).ok())
        .map(|claims| claims.role);

    match decide(&path, request.uri().query(), role) {
        PageDecision::Allow => next.run(request).await,
        PageDecision::Redirect(location) => {
            tracing::debug!(from = %path, to = %location, "Page guard redirect");
            Redirect::to(&location).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redirect(to: &str) -> PageDecision {
        PageDecision::Redirect(to.to_string())
    }

    #[test]
    fn test_anonymous_visit_keeps_return_path() {
        assert_eq!(
            decide("/booking", Some("service=DEEP_CLEANING"), None),
            redirect("/sign-in?returnTo=%2Fbooking%3Fservice%3DDEEP_CLEANING&reason=booking")
        );
        assert_eq!(
            decide("/dashboard/history", None, None),
            redirect("/sign-in?returnTo=%2Fdashboard%2Fhistory&reason=booking")
        );
    }

    #[test]
    fn test_public_pages_allowed() {
        assert_eq!(decide("/", None, None), PageDecision::Allow);
        assert_eq!(decide("/services", None, Some(Role::User)), PageDecision::Allow);
        assert_eq!(decide("/administrators", None, None), PageDecision::Allow);
    }

    #[test]
    fn test_signed_in_users_skip_auth_pages() {
        assert_eq!(decide("/sign-in", None, Some(Role::User)), redirect("/dashboard"));
        assert_eq!(decide("/admin/sign-in", None, Some(Role::Admin)), redirect("/admin"));
        assert_eq!(decide("/sign-up", None, Some(Role::Employee)), redirect("/employee"));
        assert_eq!(decide("/admin/sign-in", None, None), PageDecision::Allow);
    }

    #[test]
    fn test_role_mismatch_goes_home() {
        assert_eq!(decide("/admin", None, Some(Role::User)), redirect("/dashboard"));
        assert_eq!(decide("/dashboard", None, Some(Role::Employee)), redirect("/employee"));
        assert_eq!(decide("/employee/jobs", None, Some(Role::Employee)), PageDecision::Allow);
    }

    #[test]
    fn test_admin_bypass() {
        for path in ["/dashboard", "/booking", "/employee", "/admin/invite"] {
            assert_eq!(decide(path, None, Some(Role::Admin)), PageDecision::Allow);
        }
    }
}
