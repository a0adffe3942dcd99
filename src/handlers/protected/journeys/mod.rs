pub mod admin;
pub mod list;
pub mod roster;
pub mod show;
pub mod steps;

pub use admin::{archive as journey_archive, create as journey_create, delete as journey_delete};
pub use admin::{publish as journey_publish, update as journey_update};
pub use list::get as list_get;
pub use roster::{get as roster_get, post as roster_post};
pub use show::get as show_get;
pub use steps::{delete as step_delete, patch as step_patch, post as step_post, reorder as steps_reorder};
