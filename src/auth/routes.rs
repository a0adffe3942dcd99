//! Page route table: which portal paths are public and which require a role.

use super::permissions::Role;

/// Landing page for authenticated users and the target of failed role checks
pub const DEFAULT_ROUTE: &str = "/participant";

/// Page shown to unauthenticated visitors
pub const LOGIN_ROUTE: &str = "/login";

/// Routes reachable without a session
pub const PUBLIC_ROUTES: &[&str] = &[
    "/login",
    "/register",
    "/forgot-password",
    "/reset-password",
    "/auth/callback",
];

/// Access rule for a protected page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteConfig {
    pub path: &'static str,
    pub roles: Option<&'static [Role]>,
    pub min_role: Option<Role>,
    pub platform_admin_only: bool,
}

impl RouteConfig {
    const fn min_role(path: &'static str, role: Role) -> Self {
        Self { path, roles: None, min_role: Some(role), platform_admin_only: false }
    }

    const fn roles(path: &'static str, roles: &'static [Role]) -> Self {
        Self { path, roles: Some(roles), min_role: None, platform_admin_only: false }
    }

    const fn platform_admin(path: &'static str) -> Self {
        Self { path, roles: None, min_role: None, platform_admin_only: true }
    }
}

/// Protected routes; first match wins, so specific paths precede their prefixes
pub const PROTECTED_ROUTES: &[RouteConfig] = &[
    // Admin routes
    RouteConfig::min_role("/admin/analytics", Role::Admin),
    RouteConfig::min_role("/admin/gamification", Role::Admin),
    RouteConfig::min_role("/admin/journeys", Role::Facilitador),
    RouteConfig::min_role("/admin/participants", Role::Facilitador),
    RouteConfig::min_role("/admin", Role::Facilitador),
    // Settings routes
    RouteConfig::min_role("/settings/team", Role::Admin),
    RouteConfig::roles("/settings/organization", &[Role::Owner]),
    // Backoffice routes
    RouteConfig::platform_admin("/backoffice"),
];

/// Check if a path matches a route pattern: exact, `/*` wildcard, or nested prefix
pub fn match_route(path: &str, pattern: &str) -> bool {
    if path == pattern {
        return true;
    }

    if let Some(base) = pattern.strip_suffix("/*") {
        return path == base || path.starts_with(&format!("{}/", base));
    }

    path.starts_with(&format!("{}/", pattern))
}

/// Find the access rule that governs a path, if any
pub fn find_route_config(path: &str) -> Option<&'static RouteConfig> {
    PROTECTED_ROUTES.iter().find(|route| match_route(path, route.path))
}

pub fn is_public_route(path: &str) -> bool {
    PUBLIC_ROUTES.iter().any(|route| match_route(path, route))
}
