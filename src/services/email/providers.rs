use super::{EmailMessage, Mailer};
use crate::config::SmtpConfig;
use anyhow::Result;
use lettre::message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::info;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let builder = if config.username.is_empty() {
            // local catch-all servers (mailhog and friends) speak plain SMTP
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        } else if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
                .credentials(Credentials::new(config.username.clone(), config.password.clone()))
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
                .credentials(Credentials::new(config.username.clone(), config.password.clone()))
        };

        let transport = builder.port(config.port).build();
        let from: Mailbox = config.from.parse()?;

        info!("✅ SMTP mailer ready ({}:{})", config.host, config.port);

        Ok(Self { transport, from })
    }

    fn build_message(&self, message: EmailMessage) -> Result<Message> {
        let to = Mailbox::new(message.to_name, message.to.parse()?);

        let body = match message.inline_image {
            None => MultiPart::alternative_plain_html(message.text_body, message.html_body),
            Some(image) => {
                let content_type = ContentType::parse(&image.content_type)?;
                MultiPart::alternative()
                    .singlepart(SinglePart::plain(message.text_body))
                    .multipart(
                        MultiPart::related()
                            .singlepart(SinglePart::html(message.html_body))
                            .singlepart(Attachment::new_inline(image.content_id).body(image.content, content_type)),
                    )
            }
        };

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject)
            .multipart(body)?;

        Ok(email)
    }
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        let email = self.build_message(message)?;
        self.transport.send(email).await?;
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "smtp"
    }
}

/// Development mailer: writes the email to the log instead of sending it.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        info!(
            "📨 [dev] email to {} <{}>: {}{}",
            message.to_name.as_deref().unwrap_or(""),
            message.to,
            message.subject,
            message
                .inline_image
                .as_ref()
                .map(|img| format!(" (inline {}, {} bytes)", img.filename, img.content.len()))
                .unwrap_or_default()
        );
        info!("📨 [dev] body:\n{}", message.text_body);
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::email::InlineImage;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "localhost".to_string(),
            port: 1025,
            username: String::new(),
            password: String::new(),
            from: "FastTix <no-reply@fasttix.id>".to_string(),
        }
    }

    fn message(inline: bool) -> EmailMessage {
        EmailMessage {
            to: "buyer@example.com".to_string(),
            to_name: Some("Buyer".to_string()),
            subject: "FastTix : Ticket Jazz Night!".to_string(),
            html_body: "<img src=\"cid:qr-1\">".to_string(),
            text_body: "ticket".to_string(),
            inline_image: inline.then(|| InlineImage {
                content_id: "qr-1".to_string(),
                content_type: "image/png".to_string(),
                filename: "qr.png".to_string(),
                content: vec![0x89, b'P', b'N', b'G'],
            }),
        }
    }

    #[tokio::test]
    async fn builds_multipart_with_inline_image() {
        let mailer = SmtpMailer::new(&config()).unwrap();
        let raw = String::from_utf8(mailer.build_message(message(true)).unwrap().formatted()).unwrap();

        assert!(raw.contains("multipart/related"));
        assert!(raw.contains("Content-ID: <qr-1>"));
        assert!(raw.contains("Content-Disposition: inline"));
    }

    #[tokio::test]
    async fn rejects_bad_recipient() {
        let mailer = SmtpMailer::new(&config()).unwrap();
        let mut bad = message(false);
        bad.to = "not an address".to_string();
        assert!(mailer.build_message(bad).is_err());
    }

    #[tokio::test]
    async fn log_mailer_never_fails() {
        assert!(LogMailer.send(message(true)).await.is_ok());
    }
}
