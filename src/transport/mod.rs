//! Notification transports.
//!
//! Delivery is best-effort: a transport failure is reported to the caller,
//! logged, and never crashes the capture pipeline.

mod smtp;

use anyhow::Result;

pub use smtp::{SmtpConfig, SmtpMailer};

/// One outbound notification.
pub struct OutgoingMail<'a> {
    pub subject: &'a str,
    pub from: &'a str,
    pub to: &'a str,
    pub attachment: Option<MailAttachment<'a>>,
}

pub struct MailAttachment<'a> {
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

/// Delivery capability. Implementations classify failures into the returned
/// error; they do not retry.
pub trait MailTransport: Send {
    fn send(&mut self, mail: &OutgoingMail<'_>) -> Result<()>;
}
