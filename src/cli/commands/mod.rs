pub mod crm;
pub mod health;
pub mod level;
pub mod token;
