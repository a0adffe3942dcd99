//! Page access decisions.
//!
//! `evaluate` is a pure function of the requested path and the caller's
//! session so it can be exercised without HTTP; the middleware in
//! `crate::middleware::guard` only gathers the session and turns the
//! decision into a redirect.

use super::permissions::{has_any_role, has_permission, Role};
use super::routes::{find_route_config, is_public_route, RouteConfig, DEFAULT_ROUTE, LOGIN_ROUTE};

/// What the guard knows about an authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardSession {
    pub is_platform_admin: bool,
    /// Role in the current organization, if the caller has one
    pub role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

/// Decide whether `path` may be served to the given session
pub fn evaluate(path: &str, session: Option<&GuardSession>) -> GuardDecision {
    let is_public = is_public_route(path);

    let session = match session {
        Some(session) => session,
        None if is_public => return GuardDecision::Allow,
        None => return GuardDecision::Redirect(login_redirect(path)),
    };

    if path == "/login" || path == "/register" {
        return GuardDecision::Redirect(DEFAULT_ROUTE.to_string());
    }

    match find_route_config(path) {
        Some(rule) if !rule_allows(rule, session) => {
            GuardDecision::Redirect(DEFAULT_ROUTE.to_string())
        }
        _ => GuardDecision::Allow,
    }
}

fn rule_allows(rule: &RouteConfig, session: &GuardSession) -> bool {
    if rule.platform_admin_only {
        return session.is_platform_admin;
    }

    // Every remaining rule is role based; no organization means no role
    let role = match session.role {
        Some(role) => role,
        None => return false,
    };

    if let Some(min_role) = rule.min_role {
        if !has_permission(role, min_role) {
            return false;
        }
    }

    if let Some(roles) = rule.roles {
        if !has_any_role(role, roles) {
            return false;
        }
    }

    true
}

/// Login URL that brings the visitor back to `path` afterwards
pub fn login_redirect(path: &str) -> String {
    let mut url = format!("{}?", LOGIN_ROUTE);
    url.push_str(
        &url::form_urlencoded::Serializer::new(String::new())
            .append_pair("redirect", path)
            .finish(),
    );
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(role: Role) -> GuardSession {
        GuardSession { is_platform_admin: false, role: Some(role) }
    }

    fn redirect(to: &str) -> GuardDecision {
        GuardDecision::Redirect(to.to_string())
    }

    #[test]
    fn anonymous_visitors_are_sent_to_login() {
        assert_eq!(evaluate("/participant", None), redirect("/login?redirect=%2Fparticipant"));
        assert_eq!(
            evaluate("/admin/journeys", None),
            redirect("/login?redirect=%2Fadmin%2Fjourneys")
        );
        assert_eq!(evaluate("/login", None), GuardDecision::Allow);
        assert_eq!(evaluate("/reset-password", None), GuardDecision::Allow);
    }

    #[test]
    fn signed_in_users_skip_login_and_register() {
        let session = member(Role::Participante);
        assert_eq!(evaluate("/login", Some(&session)), redirect("/participant"));
        assert_eq!(evaluate("/register", Some(&session)), redirect("/participant"));
        assert_eq!(evaluate("/forgot-password", Some(&session)), GuardDecision::Allow);
    }

    #[test]
    fn role_rules_apply_most_specific_first() {
        let facilitador = member(Role::Facilitador);
        assert_eq!(evaluate("/admin", Some(&facilitador)), GuardDecision::Allow);
        assert_eq!(evaluate("/admin/journeys/5", Some(&facilitador)), GuardDecision::Allow);
        assert_eq!(evaluate("/admin/analytics", Some(&facilitador)), redirect("/participant"));

        let admin = member(Role::Admin);
        assert_eq!(evaluate("/admin/analytics", Some(&admin)), GuardDecision::Allow);
        assert_eq!(evaluate("/settings/team", Some(&admin)), GuardDecision::Allow);
        assert_eq!(evaluate("/settings/organization", Some(&admin)), redirect("/participant"));

        let owner = member(Role::Owner);
        assert_eq!(evaluate("/settings/organization", Some(&owner)), GuardDecision::Allow);

        let participant = member(Role::Participante);
        assert_eq!(evaluate("/admin", Some(&participant)), redirect("/participant"));
        assert_eq!(evaluate("/participant", Some(&participant)), GuardDecision::Allow);
    }

    #[test]
    fn backoffice_needs_platform_admin() {
        let owner = member(Role::Owner);
        assert_eq!(evaluate("/backoffice/users", Some(&owner)), redirect("/participant"));

        let staff = GuardSession { is_platform_admin: true, role: None };
        assert_eq!(evaluate("/backoffice/users", Some(&staff)), GuardDecision::Allow);
        // Platform staff without a membership still fail role rules
        assert_eq!(evaluate("/admin", Some(&staff)), redirect("/participant"));
    }
}
