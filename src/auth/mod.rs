pub mod cookie;
pub mod exchange;
pub mod provider;
pub mod role;
pub mod token;

pub use exchange::{AuthExchangeService, SessionIssued};
pub use role::{Role, RoleClaim};
pub use token::{Claims, TokenCodec, TokenError};
