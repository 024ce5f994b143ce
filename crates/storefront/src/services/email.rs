//! Email service for invoices and password reset links.
//!
//! Uses SMTP via lettre when a relay is configured. Without one, messages
//! are written to the log so local development needs no mail server.
//! Bodies are rendered from Askama text templates.

use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use bazaar_core::Email;

use crate::config::EmailConfig;
use crate::models::{Order, OrderLine};

/// Plain text invoice sent after checkout.
#[derive(Template)]
#[template(path = "email/invoice.txt")]
struct InvoiceEmailText<'a> {
    order: &'a Order,
    lines: &'a [OrderLine],
}

/// Plain text password reset message.
#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetEmailText<'a> {
    username: &'a str,
    reset_url: &'a str,
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

    /// The transport refused the message.
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// A message captured by an [`Outbox`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// In-memory transport for tests. Clones share the same mailbox.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    sent: Arc<Mutex<Vec<SentEmail>>>,
    failing: Arc<AtomicBool>,
}

impl Outbox {
    /// Messages delivered so far.
    #[must_use]
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make every later delivery fail.
    pub fn fail_deliveries(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn deliver(&self, email: SentEmail) -> Result<(), EmailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmailError::Delivery("mailbox unavailable".to_owned()));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(email);
        Ok(())
    }
}

#[derive(Clone)]
enum Transport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    Log,
    Memory(Outbox),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    transport: Transport,
    from_address: String,
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let transport = match self.transport {
            Transport::Smtp(_) => "smtp",
            Transport::Log => "log",
            Transport::Memory(_) => "memory",
        };
        f.debug_struct("EmailService")
            .field("transport", &transport)
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl EmailService {
    /// Create an email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let transport = match &config.smtp {
            Some(smtp) => {
                let credentials = Credentials::new(
                    smtp.username.clone(),
                    smtp.password.expose_secret().to_string(),
                );
                let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
                    .port(smtp.port)
                    .credentials(credentials)
                    .build();
                Transport::Smtp(mailer)
            }
            None => {
                tracing::info!("SMTP_HOST not set, emails will be logged instead of sent");
                Transport::Log
            }
        };

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }

    /// An email service that records messages in `outbox`.
    #[must_use]
    pub fn in_memory(from_address: impl Into<String>, outbox: Outbox) -> Self {
        Self {
            transport: Transport::Memory(outbox),
            from_address: from_address.into(),
        }
    }

    /// Send the invoice for a freshly placed order.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_invoice(
        &self,
        to: &Email,
        order: &Order,
        lines: &[OrderLine],
    ) -> Result<(), EmailError> {
        let body = InvoiceEmailText { order, lines }.render()?;
        self.send_text_email(to.as_str(), &format!("Invoice for Order #{}", order.id), &body)
            .await
    }

    /// Send a password reset link.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_password_reset(
        &self,
        to: &Email,
        username: &str,
        reset_url: &str,
    ) -> Result<(), EmailError> {
        let body = PasswordResetEmailText {
            username,
            reset_url,
        }
        .render()?;
        self.send_text_email(to.as_str(), "Password Reset Request", &body)
            .await
    }

    async fn send_text_email(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        match &self.transport {
            Transport::Smtp(mailer) => {
                let email = Message::builder()
                    .from(
                        self.from_address
                            .parse()
                            .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
                    )
                    .to(to
                        .parse()
                        .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
                    .subject(subject)
                    .header(ContentType::TEXT_PLAIN)
                    .body(body.to_string())?;

                mailer.send(email).await?;
                tracing::info!(to = %to, subject = %subject, "Email sent");
                Ok(())
            }
            Transport::Log => {
                tracing::info!(
                    from = %self.from_address,
                    to = %to,
                    subject = %subject,
                    body = %body,
                    "Email (not sent, SMTP not configured)"
                );
                Ok(())
            }
            Transport::Memory(outbox) => outbox.deliver(SentEmail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use bazaar_core::{Money, OrderId, ProductId, UserId};

    use super::*;

    fn order() -> Order {
        Order {
            id: OrderId::new(42),
            buyer_id: UserId::new(1),
            total_amount: Money::parse("47.00").expect("valid"),
            invoice_sent: false,
            created_at: Utc
                .with_ymd_and_hms(2026, 3, 1, 12, 30, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    fn lines() -> Vec<OrderLine> {
        vec![
            OrderLine {
                product_id: ProductId::new(1),
                product_name: "Mug".to_owned(),
                quantity: 2,
                price: Money::parse("8.50").expect("valid"),
            },
            OrderLine {
                product_id: ProductId::new(2),
                product_name: "Teapot".to_owned(),
                quantity: 1,
                price: Money::parse("30").expect("valid"),
            },
        ]
    }

    fn buyer_email() -> Email {
        Email::parse("buyer@example.com").expect("valid email")
    }

    #[tokio::test]
    async fn test_invoice_lists_lines_and_total() {
        let outbox = Outbox::default();
        let service = EmailService::in_memory("shop@example.com", outbox.clone());

        service
            .send_invoice(&buyer_email(), &order(), &lines())
            .await
            .expect("delivered");

        let sent = outbox.sent();
        assert_eq!(sent.len(), 1);
        let email = &sent[0];
        assert_eq!(email.to, "buyer@example.com");
        assert_eq!(email.subject, "Invoice for Order #42");
        assert!(email.body.contains("Order Number: #42"));
        assert!(email.body.contains("Date: 2026-03-01 12:30:00"));
        assert!(email.body.contains("- Mug x2 @ $8.50 = $17.00"));
        assert!(email.body.contains("- Teapot x1 @ $30.00 = $30.00"));
        assert!(email.body.contains("Total: $47.00"));
    }

    #[tokio::test]
    async fn test_password_reset_contains_link() {
        let outbox = Outbox::default();
        let service = EmailService::in_memory("shop@example.com", outbox.clone());

        service
            .send_password_reset(
                &buyer_email(),
                "buyer",
                "http://localhost:3000/password-reset-confirm/abc/",
            )
            .await
            .expect("delivered");

        let sent = outbox.sent();
        assert_eq!(sent[0].subject, "Password Reset Request");
        assert!(
            sent[0]
                .body
                .contains("http://localhost:3000/password-reset-confirm/abc/")
        );
        assert!(sent[0].body.contains("This link will expire in 24 hours."));
    }

    #[tokio::test]
    async fn test_failing_outbox_reports_error() {
        let outbox = Outbox::default();
        outbox.fail_deliveries(true);
        let service = EmailService::in_memory("shop@example.com", outbox.clone());

        let result = service.send_invoice(&buyer_email(), &order(), &lines()).await;
        assert!(matches!(result, Err(EmailError::Delivery(_))));
        assert!(outbox.sent().is_empty());
    }

    #[tokio::test]
    async fn test_log_transport_accepts_messages() {
        let config = EmailConfig {
            from_address: "noreply@bazaar.local".to_owned(),
            smtp: None,
        };
        let service = EmailService::new(&config).expect("log transport");
        assert!(
            service
                .send_invoice(&buyer_email(), &order(), &lines())
                .await
                .is_ok()
        );
    }
}
