pub mod audit;
pub mod auth;
pub mod cookies;
pub mod guard;
pub mod org_context;
pub mod response;
pub mod validate_user;

pub use audit::audit_middleware;
pub use auth::{jwt_auth_middleware, AuthUser};
pub use guard::page_guard_middleware;
pub use org_context::org_context_middleware;
pub use response::{ApiResponse, ApiResult};
pub use validate_user::{validate_user_middleware, ValidatedUser};
