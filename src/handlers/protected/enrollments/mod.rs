pub mod complete;
pub mod enroll;
pub mod list;
pub mod progress;

pub use complete::post as step_complete_post;
pub use enroll::{drop_post, post as enroll_post};
pub use list::get as list_get;
pub use progress::get as progress_get;
