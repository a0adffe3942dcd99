use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::{IdentityProvider, InvitationMetadata};
use super::{authorize, ServiceError, ServiceResult};
use crate::auth::org_context::CurrentOrganization;
use crate::auth::permissions::assignable_roles;
use crate::auth::{Permission, Role};
use crate::database::models::{MemberWithProfile, MembershipStatus, NewMember, OrganizationMember};
use crate::database::PortalStore;

#[derive(Debug, Clone, Deserialize)]
pub struct InviteRequest {
    pub email: String,
    pub role: Role,
}

/// What an invitation did: an existing account joins right away, an unknown
/// address gets an email from the identity provider
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InviteOutcome {
    Added { member: OrganizationMember },
    Invited { email: String },
}

/// Team management within the caller's current organization
pub struct MemberService {
    store: Arc<dyn PortalStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl MemberService {
    pub fn new(store: Arc<dyn PortalStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    pub async fn list(&self, org: &CurrentOrganization) -> ServiceResult<Vec<MemberWithProfile>> {
        Ok(self.store.list_members(org.id()).await?)
    }

    pub async fn invite(
        &self,
        org: &CurrentOrganization,
        caller: Uuid,
        request: InviteRequest,
    ) -> ServiceResult<InviteOutcome> {
        authorize(org.role, Permission::InviteMembers)?;
        ensure_assignable(org.role, request.role)?;

        let email = request.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(ServiceError::invalid("A valid email address is required"));
        }

        if let Some(profile) = self.store.find_profile_by_email(&email).await? {
            if self.store.find_member(org.id(), profile.id).await?.is_some() {
                return Err(ServiceError::conflict("User is already a member of this organization"));
            }

            let member = self
                .store
                .insert_member(&NewMember {
                    organization_id: org.id(),
                    user_id: profile.id,
                    role: request.role,
                    status: MembershipStatus::Active,
                    invited_by: Some(caller),
                })
                .await?;

            tracing::info!("Added {} to organization {} as {}", email, org.id(), request.role);
            return Ok(InviteOutcome::Added { member });
        }

        let invitation = InvitationMetadata {
            invited_to_org: org.id(),
            invited_role: request.role,
            invited_by: Some(caller),
        };
        self.identity.invite_user_by_email(&email, &invitation).await?;

        tracing::info!("Sent invitation for organization {} to {}", org.id(), email);
        Ok(InviteOutcome::Invited { email })
    }

    pub async fn change_role(
        &self,
        org: &CurrentOrganization,
        caller: Uuid,
        member_id: Uuid,
        role: Role,
    ) -> ServiceResult<OrganizationMember> {
        authorize(org.role, Permission::ChangeRoles)?;
        ensure_assignable(org.role, role)?;
        self.load_target(org, caller, member_id).await?;

        Ok(self.store.update_member_role(member_id, role).await?)
    }

    pub async fn remove(&self, org: &CurrentOrganization, caller: Uuid, member_id: Uuid) -> ServiceResult<()> {
        authorize(org.role, Permission::RemoveMembers)?;
        self.load_target(org, caller, member_id).await?;

        self.store.delete_member(member_id).await?;
        tracing::info!("Removed member {} from organization {}", member_id, org.id());
        Ok(())
    }

    pub async fn suspend(
        &self,
        org: &CurrentOrganization,
        caller: Uuid,
        member_id: Uuid,
    ) -> ServiceResult<OrganizationMember> {
        authorize(org.role, Permission::ManageTeam)?;
        self.load_target(org, caller, member_id).await?;

        Ok(self.store.update_member_status(member_id, MembershipStatus::Suspended).await?)
    }

    pub async fn reactivate(
        &self,
        org: &CurrentOrganization,
        caller: Uuid,
        member_id: Uuid,
    ) -> ServiceResult<OrganizationMember> {
        authorize(org.role, Permission::ManageTeam)?;
        self.load_target(org, caller, member_id).await?;

        Ok(self.store.update_member_status(member_id, MembershipStatus::Active).await?)
    }

    pub async fn resend_invitation(
        &self,
        org: &CurrentOrganization,
        caller: Uuid,
        member_id: Uuid,
    ) -> ServiceResult<()> {
        authorize(org.role, Permission::InviteMembers)?;
        let target = self.load_target(org, caller, member_id).await?;

        if target.status != MembershipStatus::Invited {
            return Err(ServiceError::conflict("Member has no pending invitation"));
        }

        let profile = self
            .store
            .get_profile(target.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Profile not found"))?;

        let invitation = InvitationMetadata {
            invited_to_org: org.id(),
            invited_role: target.role,
            invited_by: Some(caller),
        };
        self.identity.send_magic_link(&profile.email, &invitation).await?;
        Ok(())
    }

    /// Member of the current organization the caller may act on: never
    /// themselves, never someone of equal or higher rank
    async fn load_target(
        &self,
        org: &CurrentOrganization,
        caller: Uuid,
        member_id: Uuid,
    ) -> ServiceResult<OrganizationMember> {
        let target = self
            .store
            .get_member(org.id(), member_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Member not found"))?;

        if target.user_id == caller {
            return Err(ServiceError::forbidden("You cannot modify your own membership"));
        }
        if target.role.rank() >= org.role.rank() {
            return Err(ServiceError::forbidden("You cannot modify a member with an equal or higher role"));
        }
        Ok(target)
    }
}

fn ensure_assignable(assigner: Role, role: Role) -> ServiceResult<()> {
    if assignable_roles(assigner).contains(&role) {
        Ok(())
    } else {
        Err(ServiceError::forbidden(format!("You cannot assign the role '{}'", role)))
    }
}
