//! Transactional email: account confirmation and password reset.
//!
//! Messages are rendered from the askama layout in `templates/email/` as a
//! plain text and HTML alternative, then sent over SMTP with lettre. Without
//! SMTP settings the service runs as a development outbox and only logs what
//! it would have sent.

mod content;

pub use content::{MessageContent, all_rights, content};

use askama::Template;
use chrono::{Datelike, Utc};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use territory_core::{Email, Locale};

use crate::config::EmailConfig;

/// Kinds of message the application sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Link confirming a new account's address.
    Confirmation,
    /// Link to choose a new password.
    Reset,
}

impl MessageKind {
    /// Frontend path the emailed link points to.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Confirmation => "/confirm-email",
            Self::Reset => "/reset-password",
        }
    }
}

#[derive(Template)]
#[template(path = "email/layout.html")]
struct LayoutHtml<'a> {
    lang: &'a str,
    title: &'a str,
    greeting: &'a str,
    children: &'a [&'a str],
    button: &'a str,
    link: &'a str,
    footnote: &'a str,
    year: i32,
    allrights: &'a str,
}

#[derive(Template)]
#[template(path = "email/layout.txt")]
struct LayoutText<'a> {
    title: &'a str,
    greeting: &'a str,
    children: &'a [&'a str],
    button: &'a str,
    link: &'a str,
    footnote: &'a str,
    year: i32,
    allrights: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Render `kind` in `locale` for a recipient called `name`.
///
/// # Errors
///
/// Returns `EmailError::Template` if a template fails to render.
pub fn render(
    kind: MessageKind,
    locale: Locale,
    name: &str,
    link: &str,
    year: i32,
) -> Result<RenderedEmail, EmailError> {
    let copy = content(kind, locale);
    let greeting = copy.greeting.replace("{name}", name);
    let allrights = all_rights(locale);

    let html = LayoutHtml {
        lang: locale.language_tag(),
        title: copy.title,
        greeting: &greeting,
        children: copy.paragraphs,
        button: copy.button,
        link,
        footnote: copy.footnote,
        year,
        allrights,
    }
    .render()?;

    let text = LayoutText {
        title: copy.title,
        greeting: &greeting,
        children: copy.paragraphs,
        button: copy.button,
        link,
        footnote: copy.footnote,
        year,
        allrights,
    }
    .render()?;

    Ok(RenderedEmail {
        subject: copy.subject.to_string(),
        text,
        html,
    })
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
    base_url: String,
}

impl EmailService {
    /// Create the service; `None` settings give a log-only outbox.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: Option<&EmailConfig>, base_url: &str) -> Result<Self, SmtpError> {
        let Some(config) = config else {
            return Ok(Self::outbox(base_url));
        };

        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer: Some(mailer),
            from_address: config.from_address.clone(),
            base_url: base_url.to_string(),
        })
    }

    /// A service that logs messages instead of sending them.
    #[must_use]
    pub fn outbox(base_url: &str) -> Self {
        Self {
            mailer: None,
            from_address: "no-reply@localhost".to_string(),
            base_url: base_url.to_string(),
        }
    }

    /// Absolute frontend link for `kind` carrying `token`.
    #[must_use]
    pub fn link(&self, kind: MessageKind, token: &str) -> String {
        format!(
            "{}{}?token={}",
            self.base_url,
            kind.path(),
            urlencoding::encode(token)
        )
    }

    /// Render and send `kind` to `to` with a link carrying `token`.
    ///
    /// # Errors
    ///
    /// Returns error if rendering, building or delivery fails.
    pub async fn send(
        &self,
        to: &Email,
        kind: MessageKind,
        locale: Locale,
        token: &str,
    ) -> Result<(), EmailError> {
        let link = self.link(kind, token);
        let message = render(kind, locale, to.local_part(), &link, Utc::now().year())?;

        let Some(mailer) = &self.mailer else {
            tracing::info!(
                to = %to,
                subject = %message.subject,
                link = %link,
                "SMTP not configured, email not sent"
            );
            return Ok(());
        };

        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .as_str()
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(&message.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(message.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(message.html),
                    ),
            )?;

        mailer.send(email).await?;

        tracing::info!(to = %to, subject = %message.subject, "Email sent");
        Ok(())
    }
}
