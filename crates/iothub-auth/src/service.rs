use std::sync::{Arc, OnceLock};

use iothub_core::Owner;
use tracing::{info, warn};

use crate::error::{AuthError, Result};
use crate::password::{hash_password, verify_password};
use crate::policy::{check_email, check_password};
use crate::store::UserStore;
use crate::token::{IssuedToken, SessionManager};

/// Signup, login and token verification in one place.
///
/// Password hashing is CPU-bound (100k PBKDF2 rounds); async callers should
/// run `signup` and `login` on a blocking thread.
pub struct AuthService {
    users: UserStore,
    sessions: Arc<SessionManager>,
}

impl AuthService {
    pub fn new(users: UserStore, sessions: Arc<SessionManager>) -> Self {
        Self { users, sessions }
    }

    /// Validate, hash and store a new account.
    pub fn signup(&self, email: &str, password: &str) -> Result<()> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput(
                "Email and password required.".to_string(),
            ));
        }
        check_email(email).map_err(|v| AuthError::InvalidInput(v.to_string()))?;
        check_password(password).map_err(|v| AuthError::InvalidInput(v.to_string()))?;

        let hash = hash_password(password);
        self.users.create(email, &hash)?;
        info!(email, "user created");
        Ok(())
    }

    /// Check credentials and issue a 24h session token.
    ///
    /// Unknown email and wrong password both yield `InvalidCredentials`.
    pub fn login(&self, email: &str, password: &str) -> Result<IssuedToken> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput(
                "Email and password required.".to_string(),
            ));
        }

        let valid = match self.users.password_hash(email)? {
            Some(stored) => verify_password(password, &stored),
            None => {
                // Burn the same PBKDF2 cost so response time does not reveal
                // whether the account exists.
                let _ = verify_password(password, dummy_hash());
                false
            }
        };
        if !valid {
            warn!("login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self.sessions.issue(email)?;
        info!(email, "login succeeded");
        Ok(issued)
    }

    /// Resolve a bearer/cookie token to its owner.
    pub fn authenticate(&self, token: &str) -> Option<Owner> {
        self.sessions.verify(token)
    }
}

fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_password("timing-equaliser"))
}
