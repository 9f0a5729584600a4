pub mod exchange;
pub mod service;

pub use exchange::exchange;
pub use service::{health, root};
