//! Login accounts backing credential issuance.

pub mod directory;
pub mod models;

pub use directory::{verify_password, InMemoryUserDirectory, UserDirectory};
pub use models::{NewUser, User, UserSummary};
