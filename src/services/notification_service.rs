use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::application::{looks_like_email, ApplicationStatus};

/// Total delivery attempts per email (1 initial + 2 retries).
pub const MAX_SEND_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Seam over the SMTP layer so delivery can be faked in tests.
/// Returns the transport's message id on success.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, mail: OutgoingMail) -> anyhow::Result<String>;
}

/// Real SMTP delivery through lettre.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| Error::Config(format!("Invalid SMTP host: {}", e)))?
            .port(config.smtp_port);
        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_pass) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, mail: OutgoingMail) -> anyhow::Result<String> {
        let message = Message::builder()
            .from(mail.from.parse()?)
            .to(mail.to.parse()?)
            .subject(&mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)?;
        let response = self.transport.send(message).await?;
        Ok(response.message().collect::<Vec<_>>().join(" "))
    }
}

/// Outcome of one notification request. Failures are data, not errors:
/// the caller's transaction is already committed by the time we get here.
#[derive(Debug, Clone, Serialize)]
pub struct EmailOutcome {
    pub sent: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl EmailOutcome {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            sent: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// Composes status emails and pushes them through the transport with a
/// bounded fixed-delay retry. Never returns an error to the caller.
#[derive(Clone)]
pub struct NotificationService {
    transport: Arc<dyn MailTransport>,
    mail_from: String,
    retry_delay: Duration,
}

impl NotificationService {
    pub fn new(transport: Arc<dyn MailTransport>, mail_from: String, retry_delay: Duration) -> Self {
        Self {
            transport,
            mail_from,
            retry_delay,
        }
    }

    /// Send a status notification to the applicant. The optional message
    /// fully replaces the generated body; the subject stays status-derived.
    pub async fn send_status_email(
        &self,
        to: &str,
        applicant_name: &str,
        tenant_name: &str,
        role_title: &str,
        status: ApplicationStatus,
        message: Option<&str>,
    ) -> EmailOutcome {
        if !looks_like_email(to) {
            return EmailOutcome::failed("Invalid or missing recipient email");
        }

        let (subject, generated_body) =
            compose_status_message(applicant_name, tenant_name, role_title, status);
        let body = message.map(str::to_string).unwrap_or(generated_body);
        let mail = OutgoingMail {
            from: self.mail_from.clone(),
            to: to.trim().to_string(),
            subject,
            body,
        };

        let mut last_error = String::new();
        for attempt in 1..=MAX_SEND_ATTEMPTS {
            match self.transport.deliver(mail.clone()).await {
                Ok(message_id) => {
                    return EmailOutcome {
                        sent: true,
                        message_id: Some(message_id),
                        error: None,
                    };
                }
                Err(err) => {
                    last_error = err.to_string();
                    tracing::warn!(
                        to = %mail.to,
                        attempt,
                        error = %last_error,
                        "Email delivery attempt failed"
                    );
                    if attempt < MAX_SEND_ATTEMPTS {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
        tracing::error!(to = %mail.to, error = %last_error, "Email delivery gave up");
        EmailOutcome::failed(last_error)
    }
}

/// Subject and body per status. The review endpoint only routes
/// approval/rejection transitions here; the remaining branches are kept in
/// step with the dashboard copy and serve the submission acknowledgement
/// and manual smoke-test paths.
fn compose_status_message(
    applicant_name: &str,
    tenant_name: &str,
    role_title: &str,
    status: ApplicationStatus,
) -> (String, String) {
    let subject = match status {
        s if s.is_approved_like() => format!("Application approved – {}", tenant_name),
        ApplicationStatus::Interviewing => format!("Interview invitation – {}", tenant_name),
        _ => format!("Application update – {}", tenant_name),
    };
    let body = match status {
        s if s.is_approved_like() => format!(
            "Hello {applicant_name},\n\nYour application for {role_title} at {tenant_name} has been approved. \
             The team will be in touch with next steps.\n\nBest regards,\n{tenant_name}"
        ),
        ApplicationStatus::Rejected => format!(
            "Hello {applicant_name},\n\nThank you for your interest in {role_title} at {tenant_name}. \
             After review, we have decided not to move forward with your application at this time. \
             We encourage you to apply for other roles that match your experience.\n\nBest regards,\n{tenant_name}"
        ),
        ApplicationStatus::Interviewing => format!(
            "Hello {applicant_name},\n\nGood news: {tenant_name} would like to invite you to an interview \
             for {role_title}. The team will contact you shortly to arrange a time.\n\nBest regards,\n{tenant_name}"
        ),
        ApplicationStatus::Reviewed => format!(
            "Hello {applicant_name},\n\nYour application for {role_title} at {tenant_name} has been reviewed. \
             We will get back to you with a decision soon.\n\nBest regards,\n{tenant_name}"
        ),
        ApplicationStatus::Pending => format!(
            "Hello {applicant_name},\n\nYour application for {role_title} at {tenant_name} is back in the \
             queue and awaiting review.\n\nBest regards,\n{tenant_name}"
        ),
        _ => format!(
            "Hello {applicant_name},\n\nThere is an update on your application for {role_title} at \
             {tenant_name}.\n\nBest regards,\n{tenant_name}"
        ),
    };
    (subject, body)
}
