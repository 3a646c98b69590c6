//! Email templates and `{{Field}}` placeholder rendering.
//!
//! Markup is looked up per [`EmailTemplateKind`] in an optional override
//! directory and falls back to the templates compiled into the binary.

use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to read template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmailTemplateKind {
    AccountActivation,
    ResetPassword,
    ForgotPassword,
    ContactMessage,
}

impl EmailTemplateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EmailTemplateKind::AccountActivation => "account_activation",
            EmailTemplateKind::ResetPassword => "reset_password",
            EmailTemplateKind::ForgotPassword => "forgot_password",
            EmailTemplateKind::ContactMessage => "contact_message",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.html", self.as_str())
    }

    fn subject(self) -> &'static str {
        match self {
            EmailTemplateKind::AccountActivation => "Activate your account",
            EmailTemplateKind::ResetPassword => "Reset your password",
            EmailTemplateKind::ForgotPassword => "Forgot your password?",
            EmailTemplateKind::ContactMessage => "Contact message from {{Name}}",
        }
    }

    fn builtin(self) -> &'static str {
        match self {
            EmailTemplateKind::AccountActivation => {
                include_str!("../../templates/account_activation.html")
            }
            EmailTemplateKind::ResetPassword => include_str!("../../templates/reset_password.html"),
            EmailTemplateKind::ForgotPassword => {
                include_str!("../../templates/forgot_password.html")
            }
            EmailTemplateKind::ContactMessage => {
                include_str!("../../templates/contact_message.html")
            }
        }
    }
}

/// Resolves template markup.
#[derive(Debug, Clone, Default)]
pub struct EmailTemplateRepository {
    dir: Option<PathBuf>,
}

impl EmailTemplateRepository {
    /// `dir` may be empty, in which case only built-in templates are used.
    pub fn new(dir: &str) -> Self {
        let dir = dir.trim();
        Self {
            dir: (!dir.is_empty()).then(|| PathBuf::from(dir)),
        }
    }

    pub async fn get(&self, kind: EmailTemplateKind) -> Result<String, TemplateError> {
        let Some(dir) = &self.dir else {
            return Ok(kind.builtin().to_string());
        };

        let path = dir.join(kind.file_name());
        match tokio::fs::read_to_string(&path).await {
            Ok(markup) => Ok(markup),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Template override missing, using built-in");
                Ok(kind.builtin().to_string())
            }
            Err(source) => Err(TemplateError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

/// Typed substitution fields for each template.
#[derive(Debug, Clone)]
pub enum EmailTemplate {
    AccountActivation {
        activation_url: String,
        application_url: String,
    },
    ResetPassword {
        reset_password_url: String,
        application_url: String,
    },
    ForgotPassword {
        reset_password_url: String,
        application_url: String,
    },
    ContactMessage {
        name: String,
        email_address: String,
        message: String,
        application_url: String,
    },
}

impl EmailTemplate {
    pub fn kind(&self) -> EmailTemplateKind {
        match self {
            EmailTemplate::AccountActivation { .. } => EmailTemplateKind::AccountActivation,
            EmailTemplate::ResetPassword { .. } => EmailTemplateKind::ResetPassword,
            EmailTemplate::ForgotPassword { .. } => EmailTemplateKind::ForgotPassword,
            EmailTemplate::ContactMessage { .. } => EmailTemplateKind::ContactMessage,
        }
    }

    fn fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            EmailTemplate::AccountActivation {
                activation_url,
                application_url,
            } => vec![
                ("ActivationUrl", activation_url.as_str()),
                ("ApplicationUrl", application_url.as_str()),
            ],
            EmailTemplate::ResetPassword {
                reset_password_url,
                application_url,
            }
            | EmailTemplate::ForgotPassword {
                reset_password_url,
                application_url,
            } => vec![
                ("ResetPasswordUrl", reset_password_url.as_str()),
                ("ApplicationUrl", application_url.as_str()),
            ],
            EmailTemplate::ContactMessage {
                name,
                email_address,
                message,
                application_url,
            } => vec![
                ("Name", name.as_str()),
                ("EmailAddress", email_address.as_str()),
                ("Message", message.as_str()),
                ("ApplicationUrl", application_url.as_str()),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

pub struct TemplateRenderer;

impl TemplateRenderer {
    /// Fills the subject and `markup`. Body values are HTML-escaped; subject
    /// values have line breaks flattened.
    pub fn render(markup: &str, template: &EmailTemplate) -> RenderedEmail {
        let fields = template.fields();
        let mut subject = template.kind().subject().to_string();
        let mut body = markup.to_string();

        for (name, value) in fields {
            let placeholder = format!("{{{{{}}}}}", name);
            subject = subject.replace(&placeholder, &value.replace(['\r', '\n'], " "));
            body = body.replace(&placeholder, &escape_html(value));
        }

        RenderedEmail { subject, body }
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
