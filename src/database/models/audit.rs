use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

crate::string_enum! {
    pub enum AuditCategory {
        Auth => "auth",
        Org => "org",
        Profile => "profile",
        Journey => "journey",
        System => "system",
    }
}

crate::string_enum! {
    pub enum AuditAction {
        Login => "LOGIN",
        Logout => "LOGOUT",
        Register => "REGISTER",
        PasswordChange => "PASSWORD_CHANGE",
        AddMember => "ADD_MEMBER",
        RemoveMember => "REMOVE_MEMBER",
        UpdateMember => "UPDATE_MEMBER",
        Create => "CREATE",
        Update => "UPDATE",
        Delete => "DELETE",
    }
}

/// One successful mutating request, as written to `audit_logs`
#[derive(Debug, Clone, Serialize)]
pub struct NewAuditEntry {
    pub actor_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub category: AuditCategory,
    pub action: AuditAction,
    pub resource: String,
    pub metadata: Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: Uuid,
    #[serde(flatten)]
    pub entry: NewAuditEntry,
    pub created_at: DateTime<Utc>,
}
