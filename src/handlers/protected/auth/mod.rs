pub mod context;

pub use context::get as context_get;
