pub mod models;

pub use models::{delete_counter, increment_counter, init_db, query_counter};
