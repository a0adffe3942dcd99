pub mod invite;
pub mod list;
pub mod manage;

pub use invite::post as invite_post;
pub use list::get as list_get;
pub use manage::{delete as member_delete, reactivate as member_reactivate, resend_invitation as member_resend};
pub use manage::{role_patch as member_role_patch, suspend as member_suspend};
