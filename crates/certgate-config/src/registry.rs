//! In-memory user registry holding argon2-hashed enrollment secrets.
//!
//! # Design
//! - Secrets are hashed on insert and verified on login; plaintext is never stored.
//! - A successful login counts as one enrollment. Identities with a ceiling
//!   are refused once it is reached.
//! - The map lock is never held across a hash verification; the ceiling is
//!   re-checked under the lock when the enrollment is recorded.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use argon2::Argon2;
use argon2::password_hash::{
    Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    rand_core::OsRng,
};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::capability::UserRegistry;
use crate::error::UserRegistryError;
use crate::model::Identity;

struct RegisteredUser {
    secret_hash: String,
    max_enrollments: Option<u32>,
    enrollments: u32,
}

/// [`UserRegistry`] backed by a process-local map.
#[derive(Default)]
pub struct MemoryUserRegistry {
    users: Mutex<HashMap<String, RegisteredUser>>,
}

impl MemoryUserRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an identity with its enrollment secret.
    ///
    /// `max_enrollments` of `None` allows unlimited logins.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret cannot be hashed.
    pub fn insert_user(
        &self,
        username: &str,
        secret: &str,
        max_enrollments: Option<u32>,
    ) -> Result<(), UserRegistryError> {
        let secret_hash = hash_secret(secret)?;
        self.lock().insert(
            username.to_string(),
            RegisteredUser {
                secret_hash,
                max_enrollments,
                enrollments: 0,
            },
        );
        info!(username, "registered identity");
        Ok(())
    }

    /// Number of successful logins recorded for `username`.
    #[must_use]
    pub fn enrollments(&self, username: &str) -> Option<u32> {
        self.lock().get(username).map(|user| user.enrollments)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RegisteredUser>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserRegistry for MemoryUserRegistry {
    async fn login_basic_auth(
        &self,
        username: &str,
        secret: &str,
    ) -> Result<Identity, UserRegistryError> {
        let expected_hash = self
            .lock()
            .get(username)
            .map(|user| user.secret_hash.clone())
            .ok_or_else(|| UserRegistryError::UnknownIdentity {
                username: username.to_string(),
            })?;

        // argon2 runs off the executor and without the map lock held.
        let candidate = secret.to_string();
        let hash = expected_hash.clone();
        let matched = tokio::task::spawn_blocking(move || verify_secret(&hash, &candidate))
            .await
            .map_err(|err| UserRegistryError::Unavailable {
                operation: "login_basic_auth.verify",
                detail: err.to_string(),
            })??;
        if !matched {
            return Err(UserRegistryError::InvalidSecret {
                username: username.to_string(),
            });
        }

        let mut users = self.lock();
        let user = users
            .get_mut(username)
            .ok_or_else(|| UserRegistryError::UnknownIdentity {
                username: username.to_string(),
            })?;
        // The identity was re-registered while the secret was being checked.
        if user.secret_hash != expected_hash {
            return Err(UserRegistryError::InvalidSecret {
                username: username.to_string(),
            });
        }

        if let Some(max_enrollments) = user.max_enrollments
            && user.enrollments >= max_enrollments
        {
            return Err(UserRegistryError::EnrollmentLimitReached {
                username: username.to_string(),
                max_enrollments,
            });
        }

        user.enrollments = user.enrollments.saturating_add(1);
        debug!(username, enrollments = user.enrollments, "identity enrolled");
        Ok(Identity {
            name: username.to_string(),
        })
    }
}

fn hash_secret(input: &str) -> Result<String, UserRegistryError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(input.as_bytes(), &salt)
        .map_err(|detail| UserRegistryError::SecretHashFailed { detail })?;
    Ok(hash.to_string())
}

fn verify_secret(expected_hash: &str, candidate: &str) -> Result<bool, UserRegistryError> {
    let parsed = PasswordHash::new(expected_hash)
        .map_err(|detail| UserRegistryError::StoredHashInvalid { detail })?;
    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PasswordHashError::Password) => Ok(false),
        Err(detail) => Err(UserRegistryError::SecretVerifyFailed { detail }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn login_accepts_matching_secret_and_counts_enrollment() -> anyhow::Result<()> {
        let registry = MemoryUserRegistry::new();
        registry.insert_user("alice", "s3cret", None)?;

        let identity = registry.login_basic_auth("alice", "s3cret").await?;
        assert_eq!(identity.name, "alice");
        assert_eq!(registry.enrollments("alice"), Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn login_rejects_wrong_secret_without_counting() -> anyhow::Result<()> {
        let registry = MemoryUserRegistry::new();
        registry.insert_user("alice", "s3cret", None)?;

        let err = registry
            .login_basic_auth("alice", "guess")
            .await
            .unwrap_err();
        assert!(matches!(err, UserRegistryError::InvalidSecret { .. }));
        assert_eq!(registry.enrollments("alice"), Some(0));
        Ok(())
    }

    #[tokio::test]
    async fn login_rejects_unknown_identity() {
        let registry = MemoryUserRegistry::new();
        let err = registry
            .login_basic_auth("mallory", "anything")
            .await
            .unwrap_err();
        assert!(matches!(err, UserRegistryError::UnknownIdentity { .. }));
        assert_eq!(registry.enrollments("mallory"), None);
    }

    #[tokio::test]
    async fn enrollment_ceiling_is_enforced() -> anyhow::Result<()> {
        let registry = MemoryUserRegistry::new();
        registry.insert_user("bob", "pw", Some(1))?;

        registry.login_basic_auth("bob", "pw").await?;
        let err = registry.login_basic_auth("bob", "pw").await.unwrap_err();
        assert!(matches!(
            err,
            UserRegistryError::EnrollmentLimitReached {
                max_enrollments: 1,
                ..
            }
        ));
        assert_eq!(registry.enrollments("bob"), Some(1));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn lookups_are_not_held_up_by_a_login_in_flight() -> anyhow::Result<()> {
        let registry = Arc::new(MemoryUserRegistry::new());
        registry.insert_user("alice", "s3cret", None)?;
        registry.insert_user("bob", "pw", None)?;

        let started = Instant::now();
        registry.login_basic_auth("alice", "s3cret").await?;
        let single_login = started.elapsed();

        let in_flight = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                for _ in 0..3 {
                    registry.login_basic_auth("alice", "s3cret").await?;
                }
                Ok::<_, UserRegistryError>(())
            })
        };

        let mut worst = Duration::ZERO;
        while !in_flight.is_finished() {
            let started = Instant::now();
            assert_eq!(registry.enrollments("bob"), Some(0));
            worst = worst.max(started.elapsed());
            tokio::task::yield_now().await;
        }
        in_flight.await??;

        assert!(
            worst < single_login / 2,
            "lookup waited {worst:?} while a login took {single_login:?}"
        );
        assert_eq!(registry.enrollments("alice"), Some(4));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_logins_respect_the_ceiling() -> anyhow::Result<()> {
        let registry = Arc::new(MemoryUserRegistry::new());
        registry.insert_user("bob", "pw", Some(1))?;

        let attempts: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.login_basic_auth("bob", "pw").await })
            })
            .collect();
        let mut accepted = 0;
        for attempt in attempts {
            if attempt.await?.is_ok() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(registry.enrollments("bob"), Some(1));
        Ok(())
    }

    #[test]
    fn corrupted_hash_is_reported() {
        let err = verify_secret("not-a-phc-string", "pw").unwrap_err();
        assert!(matches!(err, UserRegistryError::StoredHashInvalid { .. }));
    }
}
