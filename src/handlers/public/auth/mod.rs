// handlers/public/auth/mod.rs - Account and browser session endpoints
pub mod login; // POST /auth/login - password sign-in, sets the session cookie
pub mod logout; // POST /auth/logout - clears session and organization cookies
pub mod password; // POST /auth/password/{reset,update} - recovery flow
pub mod refresh; // POST /auth/refresh - new session from a refresh token
pub mod register; // POST /auth/register - account plus portal profile

pub use login::login_post;
pub use logout::logout_post;
pub use password::{reset_post as password_reset_post, update_post as password_update_post};
pub use refresh::refresh_post;
pub use register::register_post;
