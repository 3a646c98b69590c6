//! Transactional email flows.
//!
//! Each token flow runs its store work (look up the user, issue the token,
//! commit) in one unit of work before anything is rendered or sent. A send
//! failure therefore leaves the committed token in place.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use domain::models::configuration::{CONTACT_EMAIL_ADDRESS, SYSTEM_FROM_EMAIL_ADDRESS};
use domain::models::{TokenType, User, UserToken, SYSTEM_USER_ID};
use domain::services::{EmailError, EmailMessage, EmailProvider, StoreError, UnitOfWorkFactory};
use shared::links::{
    normalize_base_url, token_link, ACTIVATE_ACCOUNT_PATH, FORGOT_PASSWORD_RESET_PATH,
    RESET_PASSWORD_PATH,
};
use shared::token::format_token;

use crate::services::cache::{CacheError, CacheManager};
use crate::services::templates::{
    EmailTemplate, EmailTemplateRepository, TemplateError, TemplateRenderer,
};
use crate::services::tokens::{TokenIssueError, UniqueTokenIssuer};

#[derive(Debug, Error)]
pub enum EmailFlowError {
    #[error("User {0} not found")]
    UserNotFound(Uuid),

    #[error("Configuration value {0} is not set")]
    MissingConfiguration(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenIssueError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Email(#[from] EmailError),
}

/// A message submitted through the contact form.
#[derive(Debug, Clone)]
pub struct ContactMessage {
    pub name: String,
    pub email_address: String,
    pub message: String,
}

#[derive(Clone)]
pub struct EmailService {
    store: Arc<dyn UnitOfWorkFactory>,
    cache: CacheManager,
    tokens: UniqueTokenIssuer,
    templates: EmailTemplateRepository,
    provider: Arc<dyn EmailProvider>,
}

impl EmailService {
    pub fn new(
        store: Arc<dyn UnitOfWorkFactory>,
        cache: CacheManager,
        tokens: UniqueTokenIssuer,
        templates: EmailTemplateRepository,
        provider: Arc<dyn EmailProvider>,
    ) -> Self {
        Self {
            store,
            cache,
            tokens,
            templates,
            provider,
        }
    }

    /// Issues an account activation token for `user_id` and emails the
    /// activation link to the user's address.
    pub async fn send_account_activation(
        &self,
        user_id: Uuid,
        base_url: &str,
    ) -> Result<(), EmailFlowError> {
        let from = self.system_from_address().await?;
        let (user, token) = self
            .issue_for_user(user_id, TokenType::AccountActivation)
            .await?;

        let template = EmailTemplate::AccountActivation {
            activation_url: token_link(base_url, ACTIVATE_ACCOUNT_PATH, &format_token(&token.token)),
            application_url: normalize_base_url(base_url).to_string(),
        };
        self.deliver(template, from, user.email_address).await
    }

    /// Issues a reset password token for `user_id` and emails the reset link
    /// to the user's address.
    pub async fn send_reset_password(
        &self,
        user_id: Uuid,
        base_url: &str,
    ) -> Result<(), EmailFlowError> {
        let from = self.system_from_address().await?;
        let (user, token) = self
            .issue_for_user(user_id, TokenType::ResetPassword)
            .await?;

        let template = EmailTemplate::ResetPassword {
            reset_password_url: token_link(base_url, RESET_PASSWORD_PATH, &format_token(&token.token)),
            application_url: normalize_base_url(base_url).to_string(),
        };
        self.deliver(template, from, user.email_address).await
    }

    /// Emails a reset link to `email_address` when it belongs to a user.
    ///
    /// Unknown addresses return `Ok` without issuing a token or sending
    /// anything, so callers cannot tell which accounts exist.
    pub async fn send_forgot_password(
        &self,
        email_address: &str,
        base_url: &str,
    ) -> Result<(), EmailFlowError> {
        let mut uow = self.store.begin().await?;
        let Some(user) = uow.get_user_by_email(email_address).await? else {
            debug!("Forgot password requested for unknown email address");
            return Ok(());
        };

        let from = self.system_from_address().await?;
        let token = self
            .tokens
            .issue_within(uow.as_mut(), user.id, TokenType::ForgotPassword, SYSTEM_USER_ID)
            .await?;
        uow.commit().await?;

        let template = EmailTemplate::ForgotPassword {
            reset_password_url: token_link(
                base_url,
                FORGOT_PASSWORD_RESET_PATH,
                &format_token(&token.token),
            ),
            application_url: normalize_base_url(base_url).to_string(),
        };
        self.deliver(template, from, email_address.trim().to_string())
            .await
    }

    /// Forwards a contact form message to the configured contact address.
    pub async fn send_contact_message(
        &self,
        contact: ContactMessage,
        base_url: &str,
    ) -> Result<(), EmailFlowError> {
        let configuration = self.cache.configuration().await?;
        let to = configuration
            .contact_email_address()
            .ok_or(EmailFlowError::MissingConfiguration(CONTACT_EMAIL_ADDRESS))?
            .to_string();

        let from = contact.email_address.clone();
        let template = EmailTemplate::ContactMessage {
            name: contact.name,
            email_address: contact.email_address,
            message: contact.message,
            application_url: normalize_base_url(base_url).to_string(),
        };
        self.deliver(template, from, to).await
    }

    async fn system_from_address(&self) -> Result<String, EmailFlowError> {
        let configuration = self.cache.configuration().await?;
        configuration
            .system_from_email_address()
            .map(str::to_string)
            .ok_or(EmailFlowError::MissingConfiguration(SYSTEM_FROM_EMAIL_ADDRESS))
    }

    async fn issue_for_user(
        &self,
        user_id: Uuid,
        token_type: TokenType,
    ) -> Result<(User, UserToken), EmailFlowError> {
        let mut uow = self.store.begin().await?;
        let user = uow
            .get_user_by_id(user_id)
            .await?
            .ok_or(EmailFlowError::UserNotFound(user_id))?;
        let token = self
            .tokens
            .issue_within(uow.as_mut(), user.id, token_type, SYSTEM_USER_ID)
            .await?;
        uow.commit().await?;
        Ok((user, token))
    }

    async fn deliver(
        &self,
        template: EmailTemplate,
        from: String,
        to: String,
    ) -> Result<(), EmailFlowError> {
        let kind = template.kind();
        let markup = self.templates.get(kind).await?;
        let rendered = TemplateRenderer::render(&markup, &template);

        self.provider
            .send(EmailMessage {
                from,
                to,
                subject: rendered.subject,
                body: rendered.body,
            })
            .await?;

        counter!("emails_sent_total", "kind" => kind.as_str()).increment(1);
        info!(kind = kind.as_str(), "Email dispatched");
        Ok(())
    }
}
