pub mod client;
pub mod handler;
pub mod lines;

pub use client::create_client;
pub use handler::{siliconflow_stream, AppState};
