pub mod create;
pub mod current;
pub mod list;

pub use create::post as create_post;
pub use current::get as current_get;
pub use current::patch as current_patch;
pub use current::switch as current_switch;
pub use list::get as list_get;
