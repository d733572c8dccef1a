//! `iothub-auth` — credential hashing, password policy, user persistence and
//! stateless session tokens.

pub mod db;
pub mod error;
pub mod password;
pub mod policy;
pub mod service;
pub mod store;
pub mod token;

pub use error::{AuthError, Result};
pub use service::AuthService;
pub use store::UserStore;
pub use token::{Claims, IssuedToken, SessionManager};
