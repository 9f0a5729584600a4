pub mod flags;
pub mod members;
pub mod session;
