pub mod handlers;
pub mod service;

pub use handlers::{get_count, update_count};
