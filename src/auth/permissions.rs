//! Role-based access control for organization members.
//!
//! Every membership carries exactly one [`Role`]. Roles form a total order
//! (owner > admin > facilitador > participante) and all checks reduce to
//! either a rank comparison or a lookup in the static [`Permission`] table.

use serde_json::Value;

crate::string_enum! {
    /// Organization-scoped role held by a member
    pub enum Role {
        Owner => "owner",
        Admin => "admin",
        Facilitador => "facilitador",
        Participante => "participante",
    }
}

impl Role {
    /// Position in the hierarchy - higher number = more permissions
    pub fn rank(&self) -> u8 {
        match self {
            Role::Owner => 4,
            Role::Admin => 3,
            Role::Facilitador => 2,
            Role::Participante => 1,
        }
    }

    /// All roles in hierarchy order (highest first)
    pub fn all() -> [Role; 4] {
        [Role::Owner, Role::Admin, Role::Facilitador, Role::Participante]
    }

    /// Human-facing role name shown in the portal
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Owner => "Propietario",
            Role::Admin => "Administrador",
            Role::Facilitador => "Facilitador",
            Role::Participante => "Participante",
        }
    }
}

/// Check if a role has at least the required permission level
pub fn has_permission(current: Role, required: Role) -> bool {
    current.rank() >= required.rank()
}

/// Check if the role is one of the allowed roles
pub fn has_any_role(current: Role, allowed: &[Role]) -> bool {
    allowed.contains(&current)
}

/// Roles that a member holding `assigner` may hand out: strictly below their own
pub fn assignable_roles(assigner: Role) -> Vec<Role> {
    Role::all()
        .into_iter()
        .filter(|role| role.rank() < assigner.rank())
        .collect()
}

/// Named actions gated by role membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    // Team management
    ManageTeam,
    InviteMembers,
    ChangeRoles,
    RemoveMembers,
    // Content management
    EditContent,
    CreateJourneys,
    DeleteJourneys,
    PublishJourneys,
    // Organization
    DeleteOrg,
    EditOrgSettings,
    // Analytics
    ViewAnalytics,
    ExportData,
    /// Platform staff only, never granted through an organization role
    AccessBackoffice,
}

impl Permission {
    pub fn allowed_roles(&self) -> &'static [Role] {
        use Role::*;

        match self {
            Permission::ManageTeam
            | Permission::InviteMembers
            | Permission::ChangeRoles
            | Permission::RemoveMembers => &[Owner, Admin],
            Permission::EditContent | Permission::CreateJourneys => &[Owner, Admin, Facilitador],
            Permission::DeleteJourneys | Permission::PublishJourneys => &[Owner, Admin],
            Permission::DeleteOrg => &[Owner],
            Permission::EditOrgSettings => &[Owner, Admin],
            Permission::ViewAnalytics => &[Owner, Admin, Facilitador],
            Permission::ExportData => &[Owner, Admin],
            Permission::AccessBackoffice => &[],
        }
    }
}

/// Check if a role can perform a specific action
pub fn can_perform(role: Role, permission: Permission) -> bool {
    has_any_role(role, permission.allowed_roles())
}

/// Check if organization settings enable a feature flag (`settings.features` array)
pub fn has_feature(settings: &Value, feature: &str) -> bool {
    settings
        .get("features")
        .and_then(Value::as_array)
        .map(|features| features.iter().any(|f| f.as_str() == Some(feature)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn has_permission_matches_rank_order_for_every_pair() {
        for current in Role::all() {
            for required in Role::all() {
                assert_eq!(
                    has_permission(current, required),
                    current.rank() >= required.rank(),
                    "{} vs {}",
                    current,
                    required
                );
            }
        }
    }

    #[test]
    fn hierarchy_is_strict() {
        assert!(has_permission(Role::Owner, Role::Admin));
        assert!(has_permission(Role::Facilitador, Role::Facilitador));
        assert!(!has_permission(Role::Participante, Role::Facilitador));
        assert!(!has_permission(Role::Admin, Role::Owner));
    }

    #[test]
    fn action_table() {
        assert!(can_perform(Role::Admin, Permission::InviteMembers));
        assert!(!can_perform(Role::Facilitador, Permission::InviteMembers));
        assert!(can_perform(Role::Facilitador, Permission::CreateJourneys));
        assert!(!can_perform(Role::Facilitador, Permission::PublishJourneys));
        assert!(can_perform(Role::Owner, Permission::DeleteOrg));
        assert!(!can_perform(Role::Admin, Permission::DeleteOrg));
        for role in Role::all() {
            assert!(!can_perform(role, Permission::AccessBackoffice));
        }
    }

    #[test]
    fn assignable_roles_are_strictly_lower() {
        assert_eq!(
            assignable_roles(Role::Owner),
            vec![Role::Admin, Role::Facilitador, Role::Participante]
        );
        assert_eq!(assignable_roles(Role::Admin), vec![Role::Facilitador, Role::Participante]);
        assert!(assignable_roles(Role::Participante).is_empty());
    }

    #[test]
    fn feature_flags_read_from_settings() {
        let settings = json!({ "features": ["crm", "chat"] });
        assert!(has_feature(&settings, "crm"));
        assert!(!has_feature(&settings, "bi"));
        assert!(!has_feature(&json!({ "features": "crm" }), "crm"));
        assert!(!has_feature(&json!({}), "crm"));
    }

    #[test]
    fn roles_serialize_lower_case() {
        assert_eq!(serde_json::to_value(Role::Facilitador).unwrap(), json!("facilitador"));
        assert_eq!("participante".parse::<Role>().unwrap(), Role::Participante);
        assert_eq!(Role::Owner.display_name(), "Propietario");
    }
}
