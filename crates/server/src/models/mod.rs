//! Domain models for the territory server.
//!
//! These are validated domain objects, separate from the sqlx row types in
//! [`crate::db`]. Types that cross the API boundary serialize in camelCase
//! for the frontend.

pub mod session;
pub mod territory;
pub mod user;

pub use session::{AuthUser, Session};
pub use territory::{Territory, TerritoryImage, TerritorySummary};
pub use user::User;
