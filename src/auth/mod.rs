mod middleware;
mod token;

pub use middleware::{AuthError, RequireUser};
pub use token::{TokenGenerator, parse_token};
