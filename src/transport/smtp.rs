//! SMTP delivery via lettre.
//!
//! Sessions use opportunistic STARTTLS and credential login, one connection
//! per send. The sender address doubles as the login username.

use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};

use super::{MailTransport, OutgoingMail};

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn build_transport(&self) -> Result<SmtpTransport> {
        let tls = TlsParameters::new(self.config.host.clone())
            .with_context(|| format!("TLS parameters for {}", self.config.host))?;
        Ok(SmtpTransport::builder_dangerous(&self.config.host)
            .port(self.config.port)
            .tls(Tls::Opportunistic(tls))
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .build())
    }
}

impl MailTransport for SmtpMailer {
    fn send(&mut self, mail: &OutgoingMail<'_>) -> Result<()> {
        let from: Mailbox = mail.from.parse().context("parse sender address")?;
        let to: Mailbox = mail.to.parse().context("parse recipient address")?;
        let builder = Message::builder().from(from).to(to).subject(mail.subject);

        let body = SinglePart::plain(mail.subject.to_string());
        let message = match &mail.attachment {
            Some(attachment) => {
                let content_type = ContentType::parse(attachment.content_type)
                    .with_context(|| format!("content type {}", attachment.content_type))?;
                builder
                    .multipart(
                        MultiPart::mixed().singlepart(body).singlepart(
                            Attachment::new(attachment.file_name.to_string())
                                .body(attachment.bytes.to_vec(), content_type),
                        ),
                    )
                    .context("assemble message")?
            }
            None => builder.singlepart(body).context("assemble message")?,
        };

        let transport = self.build_transport()?;
        transport
            .send(&message)
            .with_context(|| format!("smtp delivery via {}", self.config.host))?;
        Ok(())
    }
}
