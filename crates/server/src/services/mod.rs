//! Business logic services.

pub mod auth;
pub mod email;
pub mod maintenance;
pub mod territories;

pub use auth::{AuthError, AuthService, AuthSettings, JwtKeys, TokenPurpose};
pub use email::{EmailError, EmailService, MessageKind};
pub use territories::{TerritoryError, TerritoryService};
