//! The single-run transfer state machine.
//!
//! Validate → connect mail → search → connect storage → per-message loop →
//! teardown. Only the first four stages can abort a run; everything inside the
//! loop is logged and counted in the [`TransferSummary`].

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::{Config, Settings};
use crate::drive::StorageSink;
use crate::email::{Attachment, MailSource, MessageRef};
use crate::error::Result;

use super::summary::TransferSummary;

/// Validates `settings` and runs one transfer.
///
/// When validation fails neither adapter is touched.
pub async fn run<M, S>(settings: Settings, mail: &mut M, storage: &mut S) -> Result<TransferSummary>
where
    M: MailSource,
    S: StorageSink,
{
    let config = match settings.validate() {
        Ok(config) => config,
        Err(e) => {
            error!(
                "{}. Check the environment or the .env file; no connections were made.",
                e
            );
            return Err(e.into());
        }
    };

    run_with_config(&config, mail, storage).await
}

/// Runs one transfer with an already validated configuration.
///
/// Once the mail session is open it is always closed before returning, and a
/// completion line is logged whether or not the run succeeded.
pub async fn run_with_config<M, S>(
    config: &Config,
    mail: &mut M,
    storage: &mut S,
) -> Result<TransferSummary>
where
    M: MailSource,
    S: StorageSink,
{
    if let Err(e) = mail.connect(&config.mail).await {
        error!("Could not connect to mailbox: {}", e);
        return Err(e.into());
    }

    let outcome = process_mailbox(config, mail, storage).await;

    if let Err(e) = mail.disconnect().await {
        warn!("Failed to log out of mailbox cleanly: {}", e);
    }

    match &outcome {
        Ok(summary) => info!("Processing complete. Disconnected from email. {}", summary),
        Err(e) => error!("Run aborted: {}. Disconnected from email.", e),
    }

    outcome
}

async fn process_mailbox<M, S>(
    config: &Config,
    mail: &mut M,
    storage: &mut S,
) -> Result<TransferSummary>
where
    M: MailSource,
    S: StorageSink,
{
    let messages = mail.find_matching_messages(&config.sender_filter).await?;
    let mut summary = TransferSummary::new(messages.len());

    if messages.is_empty() {
        info!("No new emails from {}.", config.sender_filter);
        return Ok(summary);
    }

    info!(
        "Found {} new emails from {}",
        messages.len(),
        config.sender_filter
    );

    storage.authenticate(&config.drive).await?;

    for message in messages {
        let span = info_span!("message", uid = %message);
        process_message(config, message, mail, storage, &mut summary)
            .instrument(span)
            .await;
    }

    Ok(summary)
}

/// Fetches one message and transfers its attachments. A fetch failure skips
/// only this message.
async fn process_message<M, S>(
    config: &Config,
    message: MessageRef,
    mail: &mut M,
    storage: &mut S,
    summary: &mut TransferSummary,
) where
    M: MailSource,
    S: StorageSink,
{
    let attachments = match mail.fetch_attachments(message, &config.attachments).await {
        Ok(attachments) => attachments,
        Err(e) => {
            error!("Error processing email ID {}: {}", message, e);
            summary.messages_failed += 1;
            return;
        }
    };
    summary.messages_processed += 1;

    if attachments.is_empty() {
        debug!("Email ID {} has no matching attachments", message);
    }

    for attachment in attachments {
        transfer_attachment(config, attachment, storage, summary).await;
    }
}

/// Uploads `attachment` unless a file with the same name is already in the
/// folder. Failures are logged with the filename and counted.
async fn transfer_attachment<S>(
    config: &Config,
    attachment: Attachment,
    storage: &mut S,
    summary: &mut TransferSummary,
) where
    S: StorageSink,
{
    let Attachment {
        filename,
        content,
        mime_type,
    } = attachment;

    match storage.file_exists(&config.folder_id, &filename).await {
        Ok(true) => {
            info!("Skipped upload: '{}' already exists in Google Drive.", filename);
            summary.skipped_existing += 1;
        }
        Ok(false) => match storage
            .upload(&config.folder_id, &filename, content, &mime_type)
            .await
        {
            Ok(file) => {
                info!(
                    "Uploaded '{}' to Google Drive (File ID: {})",
                    file.name, file.id
                );
                summary.uploaded.push(file);
            }
            Err(e) => {
                error!("Failed to upload '{}' to Drive: {}", filename, e);
                summary.upload_failures += 1;
            }
        },
        Err(e) => {
            error!("Failed to check Drive for '{}': {}", filename, e);
            summary.upload_failures += 1;
        }
    }
}
