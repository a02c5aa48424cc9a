//! In-memory store doubles for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::model::{RefreshToken, User};
use super::store::{CredentialStore, RefreshTokenStore, StoreError};
use crate::claims::UserClaim;

pub const TEST_SECRET: &[u8] = b"unit-test-secret-0123456789abcdef";

fn unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

#[derive(Default)]
pub struct MemoryCredentials {
    users: Mutex<Vec<(User, String)>>,
    claims: Mutex<HashMap<String, Vec<UserClaim>>>,
    fail_writes: AtomicBool,
}

impl MemoryCredentials {
    /// Make every write fail as if the database were unreachable.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

impl CredentialStore for MemoryCredentials {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|(u, _)| u.email.eq_ignore_ascii_case(email))
            .map(|(u, _)| u.clone()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|(u, _)| u.id == id).map(|(u, _)| u.clone()))
    }

    async fn create_user(
        &self,
        email: &str,
        password: &str,
        claims: &[UserClaim],
    ) -> Result<Option<User>, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|(u, _)| u.email.eq_ignore_ascii_case(email)) {
            return Ok(None);
        }
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: String::new(),
        };
        users.push((user.clone(), password.to_string()));
        self.claims
            .lock()
            .unwrap()
            .insert(user.id.clone(), claims.to_vec());
        Ok(Some(user))
    }

    async fn check_password(&self, user: &User, password: &str) -> Result<bool, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .any(|(u, p)| u.id == user.id && p.as_str() == password))
    }

    async fn get_claims(&self, user_id: &str) -> Result<Vec<UserClaim>, StoreError> {
        let claims = self.claims.lock().unwrap();
        Ok(claims.get(user_id).cloned().unwrap_or_default())
    }

    async fn add_claim(&self, user_id: &str, claim: &UserClaim) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut claims = self.claims.lock().unwrap();
        let entry = claims.entry(user_id.to_string()).or_default();
        entry.retain(|c| c.kind != claim.kind);
        entry.push(claim.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRefreshTokens {
    tokens: Mutex<HashMap<String, RefreshToken>>,
    fail_writes: AtomicBool,
}

impl MemoryRefreshTokens {
    /// Make `add` and `rotate` fail as if the database were unreachable.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.lock().unwrap().is_empty()
    }
}

impl RefreshTokenStore for MemoryRefreshTokens {
    async fn add(&self, token: &RefreshToken) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.tokens
            .lock()
            .unwrap()
            .insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>, StoreError> {
        Ok(self.tokens.lock().unwrap().get(token).cloned())
    }

    async fn update(&self, token: &RefreshToken) -> Result<bool, StoreError> {
        let mut tokens = self.tokens.lock().unwrap();
        match tokens.get_mut(&token.token) {
            Some(stored) => {
                *stored = token.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn rotate(&self, token: &str, replacement: &RefreshToken) -> Result<bool, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut tokens = self.tokens.lock().unwrap();
        match tokens.get_mut(token) {
            Some(stored) if !stored.used && !stored.invalidated => {
                stored.used = true;
            }
            _ => return Ok(false),
        }
        tokens.insert(replacement.token.clone(), replacement.clone());
        Ok(true)
    }

    async fn invalidate_for_user(&self, user_id: &str) -> Result<u64, StoreError> {
        let mut tokens = self.tokens.lock().unwrap();
        let mut count = 0;
        for stored in tokens.values_mut() {
            if stored.user_id == user_id && !stored.used && !stored.invalidated {
                stored.invalidated = true;
                count += 1;
            }
        }
        Ok(count)
    }
}
