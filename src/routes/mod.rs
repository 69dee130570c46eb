mod api;
mod auth;

pub use api::*;
pub use auth::AuthUser;
