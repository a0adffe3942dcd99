pub mod chat;
pub mod crm;
pub mod enrollment_service;
pub mod gamification;
pub mod identity;
pub mod journey_service;
pub mod member_service;
pub mod organization_service;
pub mod superset;

use thiserror::Error;

use crate::auth::{can_perform, Permission, Role};
use crate::database::StoreError;
use identity::IdentityError;

/// Errors from the portal services. Store failures pass through unchanged so
/// the HTTP layer can tell a missing row from an outage.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::Invalid(message.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Fail with 403 unless `role` grants `permission`
pub fn authorize(role: Role, permission: Permission) -> ServiceResult<()> {
    if can_perform(role, permission) {
        Ok(())
    } else {
        tracing::warn!("Role '{}' denied {:?}", role, permission);
        Err(ServiceError::forbidden("You do not have permission to perform this action"))
    }
}
