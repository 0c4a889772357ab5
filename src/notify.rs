use crate::config::DeliveryConfig;
use lettre::address::{AddressError, Envelope};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub const ALERT_SUBJECT: &str = "Critical system snapshot saved";
pub const ALERT_BODY: &str = "A critical system snapshot was saved and is attached.";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to read attachment {path}: {source}")]
    Attachment {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid mail address: {0}")]
    Address(#[from] AddressError),
    #[error("invalid mail envelope: {0}")]
    Envelope(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Builds the alert message with the artifact bytes appended after the body.
///
/// Known limitation: there is no MIME multipart boundary, so strict mail
/// clients show the attachment inline as part of the body text.
pub fn compose_alert(config: &DeliveryConfig, attachment: &[u8]) -> Vec<u8> {
    let headers = format!(
        "Subject: {ALERT_SUBJECT}\r\n\
         To: {}\r\n\
         From: {}\r\n\
         MIME-version: 1.0\r\n\
         Content-Type: text/plain; charset=\"UTF-8\"\r\n\
         \r\n\
         {ALERT_BODY}",
        config.recipient, config.sender
    );
    let mut message = Vec::with_capacity(headers.len() + attachment.len());
    message.extend_from_slice(headers.as_bytes());
    message.extend_from_slice(attachment);
    message
}

/// Sends one alert for the artifact at `artifact_path`. No retry.
pub async fn send_critical_alert(
    config: &DeliveryConfig,
    artifact_path: &Path,
) -> Result<(), NotifyError> {
    let attachment =
        tokio::fs::read(artifact_path)
            .await
            .map_err(|source| NotifyError::Attachment {
                path: artifact_path.display().to_string(),
                source,
            })?;

    let sender: Address = config.sender.parse()?;
    let recipient: Address = config.recipient.parse()?;
    let envelope = Envelope::new(Some(sender), vec![recipient])?;
    let message = compose_alert(config, &attachment);

    let mailer = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.server.as_str())
        .port(config.port)
        .tls(Tls::Opportunistic(TlsParameters::new(config.server.clone())?))
        .credentials(Credentials::new(
            config.username.clone(),
            config.password.clone(),
        ))
        .authentication(vec![Mechanism::Plain])
        .build();

    mailer.send_raw(&envelope, &message).await?;
    info!(
        server = %config.server,
        port = config.port,
        recipient = %config.recipient,
        bytes = message.len(),
        "critical alert delivered"
    );
    Ok(())
}
