//! Sidebar navigation trees, filtered per caller.

use serde::Serialize;

use super::permissions::{has_any_role, has_permission, Role};

#[derive(Debug, Clone, Copy)]
pub struct NavItem {
    pub label: &'static str,
    pub href: &'static str,
    pub icon: &'static str,
    /// Accessible to every authenticated user when both role fields are `None`
    pub roles: Option<&'static [Role]>,
    pub min_role: Option<Role>,
    pub platform_admin_only: bool,
    pub children: &'static [NavItem],
}

impl NavItem {
    const fn open(label: &'static str, href: &'static str, icon: &'static str) -> Self {
        Self {
            label,
            href,
            icon,
            roles: None,
            min_role: None,
            platform_admin_only: false,
            children: &[],
        }
    }

    const fn min_role(mut self, role: Role) -> Self {
        self.min_role = Some(role);
        self
    }

    const fn roles(mut self, roles: &'static [Role]) -> Self {
        self.roles = Some(roles);
        self
    }

    const fn platform_admin(mut self) -> Self {
        self.platform_admin_only = true;
        self
    }

    const fn children(mut self, children: &'static [NavItem]) -> Self {
        self.children = children;
        self
    }

    fn visible_to(&self, role: Option<Role>, is_platform_admin: bool) -> bool {
        if self.platform_admin_only {
            return is_platform_admin;
        }
        if self.min_role.is_none() && self.roles.is_none() {
            return true;
        }

        let Some(role) = role else {
            return false;
        };
        self.min_role.map_or(true, |min| has_permission(role, min))
            && self.roles.map_or(true, |roles| has_any_role(role, roles))
    }
}

pub const MAIN_NAV: &[NavItem] = &[
    NavItem::open("Dashboard", "/", "layout-dashboard"),
    NavItem::open("Mi Viaje", "/journey", "map"),
    NavItem::open("Comunidad", "/community", "users"),
    NavItem::open("Eventos", "/events", "calendar"),
];

const ADMIN_CHILDREN: &[NavItem] = &[
    NavItem::open("Journeys", "/admin/journeys", "book-open").min_role(Role::Facilitador),
    NavItem::open("Participantes", "/admin/participants", "users").min_role(Role::Facilitador),
    NavItem::open("Analytics", "/admin/analytics", "bar-chart-3").min_role(Role::Admin),
    NavItem::open("Gamificación", "/admin/gamification", "trophy").min_role(Role::Admin),
];

const SETTINGS_CHILDREN: &[NavItem] = &[
    NavItem::open("Mi Perfil", "/settings/profile", "users"),
    NavItem::open("Equipo", "/settings/team", "users").min_role(Role::Admin),
    NavItem::open("Organización", "/settings/organization", "building-2").roles(&[Role::Owner]),
];

const BACKOFFICE_CHILDREN: &[NavItem] = &[
    NavItem::open("Organizaciones", "/backoffice/organizations", "building-2").platform_admin(),
    NavItem::open("Usuarios", "/backoffice/users", "users").platform_admin(),
    NavItem::open("Auditoría", "/backoffice/audit", "shield").platform_admin(),
];

pub const ADMIN_NAV: &[NavItem] = &[NavItem::open("Gestión", "/admin", "bar-chart-3")
    .min_role(Role::Admin)
    .children(ADMIN_CHILDREN)];

pub const SETTINGS_NAV: &[NavItem] =
    &[NavItem::open("Configuración", "/settings", "settings").children(SETTINGS_CHILDREN)];

pub const BACKOFFICE_NAV: &[NavItem] = &[NavItem::open("Backoffice", "/backoffice", "shield")
    .platform_admin()
    .children(BACKOFFICE_CHILDREN)];

/// Serializable nav entry after filtering
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NavEntry {
    pub label: &'static str,
    pub href: &'static str,
    pub icon: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Navigation {
    pub main: Vec<NavEntry>,
    pub admin: Vec<NavEntry>,
    pub settings: Vec<NavEntry>,
    pub backoffice: Vec<NavEntry>,
}

fn filter(items: &[NavItem], role: Option<Role>, is_platform_admin: bool) -> Vec<NavEntry> {
    items
        .iter()
        .filter(|item| item.visible_to(role, is_platform_admin))
        .map(|item| NavEntry {
            label: item.label,
            href: item.href,
            icon: item.icon,
            children: filter(item.children, role, is_platform_admin),
        })
        .collect()
}

/// Navigation trees with every entry the caller may not open removed
pub fn navigation_for(role: Option<Role>, is_platform_admin: bool) -> Navigation {
    Navigation {
        main: filter(MAIN_NAV, role, is_platform_admin),
        admin: filter(ADMIN_NAV, role, is_platform_admin),
        settings: filter(SETTINGS_NAV, role, is_platform_admin),
        backoffice: filter(BACKOFFICE_NAV, role, is_platform_admin),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hrefs(entries: &[NavEntry]) -> Vec<&str> {
        entries
            .iter()
            .flat_map(|e| std::iter::once(e.href).chain(e.children.iter().map(|c| c.href)))
            .collect()
    }

    #[test]
    fn participants_see_main_and_profile_only() {
        let nav = navigation_for(Some(Role::Participante), false);
        assert_eq!(nav.main.len(), 4);
        assert!(nav.admin.is_empty());
        assert_eq!(hrefs(&nav.settings), vec!["/settings", "/settings/profile"]);
        assert!(nav.backoffice.is_empty());
    }

    #[test]
    fn admins_see_management_but_not_org_settings() {
        let nav = navigation_for(Some(Role::Admin), false);
        assert_eq!(
            hrefs(&nav.admin),
            vec!["/admin", "/admin/journeys", "/admin/participants", "/admin/analytics", "/admin/gamification"]
        );
        assert!(!hrefs(&nav.settings).contains(&"/settings/organization"));
        assert!(hrefs(&nav.settings).contains(&"/settings/team"));
    }

    #[test]
    fn owners_and_platform_admins() {
        let owner = navigation_for(Some(Role::Owner), false);
        assert!(hrefs(&owner.settings).contains(&"/settings/organization"));
        assert!(owner.backoffice.is_empty());

        let staff = navigation_for(None, true);
        assert_eq!(hrefs(&staff.backoffice).len(), 4);
        assert!(staff.admin.is_empty());
    }
}
