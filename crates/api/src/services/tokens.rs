//! Issuing of single-use user tokens.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use domain::models::{NewUserToken, TokenType, UserToken};
use domain::services::{StoreError, UnitOfWork, UnitOfWorkFactory};
use shared::token::token_from_random_bytes;

#[derive(Debug, Error)]
pub enum TokenIssueError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Every candidate collided with an existing token. With 128 random bits
    /// this points at a broken random source, not bad luck.
    #[error("No unique token found after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },
}

/// Source of candidate token values.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> Uuid;
}

/// 128 bits from the thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenGenerator;

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> Uuid {
        token_from_random_bytes(rand::random())
    }
}

/// Generates tokens that do not collide with any stored token and persists them.
#[derive(Clone)]
pub struct UniqueTokenIssuer {
    store: Arc<dyn UnitOfWorkFactory>,
    generator: Arc<dyn TokenGenerator>,
    max_attempts: u32,
}

impl UniqueTokenIssuer {
    pub fn new(store: Arc<dyn UnitOfWorkFactory>, max_attempts: u32) -> Self {
        Self::with_generator(store, Arc::new(RandomTokenGenerator), max_attempts)
    }

    pub fn with_generator(
        store: Arc<dyn UnitOfWorkFactory>,
        generator: Arc<dyn TokenGenerator>,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            generator,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Draws candidates until one is unknown to `uow`.
    ///
    /// The check and the later insert are separate statements; the unique
    /// index on the token column rejects a concurrent duplicate.
    pub async fn generate_unique(&self, uow: &mut dyn UnitOfWork) -> Result<Uuid, TokenIssueError> {
        for attempt in 1..=self.max_attempts {
            let candidate = self.generator.generate();
            if uow.get_user_token_by_guid(candidate).await?.is_none() {
                return Ok(candidate);
            }

            counter!("user_token_collisions_total").increment(1);
            warn!(attempt, "Generated user token already exists, regenerating");
        }

        Err(TokenIssueError::AttemptsExhausted {
            attempts: self.max_attempts,
        })
    }

    /// Generates and stores a token inside the caller's unit of work.
    /// Nothing is persisted until the caller commits.
    pub async fn issue_within(
        &self,
        uow: &mut dyn UnitOfWork,
        user_id: Uuid,
        token_type: TokenType,
        created_by: Uuid,
    ) -> Result<UserToken, TokenIssueError> {
        let token = self.generate_unique(uow).await?;
        let created = uow
            .create_user_token(NewUserToken {
                user_id,
                token,
                token_type,
                created_by,
            })
            .await?;

        info!(
            user_id = %user_id,
            token_type = %token_type,
            token_id = created.id,
            "User token issued"
        );
        Ok(created)
    }

    /// Issues a token in its own unit of work and commits it.
    pub async fn issue(
        &self,
        user_id: Uuid,
        token_type: TokenType,
        created_by: Uuid,
    ) -> Result<UserToken, TokenIssueError> {
        let mut uow = self.store.begin().await?;
        let token = self
            .issue_within(uow.as_mut(), user_id, token_type, created_by)
            .await?;
        uow.commit().await?;
        Ok(token)
    }
}
