//! Outgoing account mail
//!
//! Messages are composed here and handed to the log; there is no SMTP
//! transport.

use crate::config::MailConfig;

/// A composed email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Clone)]
pub struct Mailer {
    from_address: String,
    frontend_url: String,
}

impl Mailer {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            from_address: config.from_address.clone(),
            frontend_url: config.frontend_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn verification_email(&self, to: &str, name: &str, token: &str) -> OutgoingMail {
        let link = format!("{}/verify-email?token={}", self.frontend_url, token);
        OutgoingMail {
            to: to.to_string(),
            subject: "Verify your email address".to_string(),
            body: format!(
                "Hello {},\n\nConfirm your email address to activate your account:\n{}\n\n\
                 If you did not create an account you can ignore this message.",
                name, link
            ),
        }
    }

    pub fn password_reset_email(&self, to: &str, name: &str, token: &str) -> OutgoingMail {
        let link = format!("{}/reset-password?token={}", self.frontend_url, token);
        OutgoingMail {
            to: to.to_string(),
            subject: "Reset your password".to_string(),
            body: format!(
                "Hello {},\n\nUse the link below to choose a new password:\n{}\n\n\
                 The link expires soon. If you did not ask for a reset, ignore this message.",
                name, link
            ),
        }
    }

    pub fn send(&self, mail: &OutgoingMail) {
        tracing::info!(
            from = %self.from_address,
            to = %mail.to,
            subject = %mail.subject,
            "Outgoing mail"
        );
        tracing::debug!(body = %mail.body, "Outgoing mail body");
    }
}
