//! OAuth2 Flows
//!
//! Token exchange against the OAuth endpoints and the redirect login built
//! on top of it.

pub mod oauth2;
pub mod redirect_login;

pub use oauth2::*;
pub use redirect_login::*;
