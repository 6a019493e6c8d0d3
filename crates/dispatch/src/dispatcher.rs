//! Per-channel dispatch loops.
//!
//! Dispatch is sequential with configured pacing: email sleeps between
//! batches, SMS sleeps between individual sends. A campaign row is created
//! once the selection resolves; every per-recipient outcome lands in the
//! delivery log, so a campaign's log always accounts for all resolved
//! recipients.

use crate::store::{CampaignDraft, CampaignStore};
use invite_channels::email::{EmailProvider, SendPath};
use invite_channels::sms::SmsGateway;
use invite_channels::whatsapp::WhatsAppLinker;
use invite_core::types::{
    Channel, DeliveryLogEntry, DeliveryStatus, Recipient, RecipientKind, WebhookEvent,
};
use invite_core::{InviteError, InviteResult};
use invite_directory::{DirectoryStore, RecipientSelection};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Failures beyond this many are counted but not itemized in responses.
const MAX_REPORTED_FAILURES: usize = 25;

#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub channel: Channel,
    pub selection: RecipientSelection,
    pub title: String,
    pub subject: String,
    pub content: String,
    pub email_path: SendPath,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchFailure {
    pub name: String,
    pub contact: String,
    pub reason: String,
}

/// A click-to-chat link produced in WhatsApp mode.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedLink {
    pub name: String,
    pub phone: String,
    pub link: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    pub campaign_id: Uuid,
    pub channel: Channel,
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
    pub failures: Vec<DispatchFailure>,
    pub links: Vec<GeneratedLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetryReport {
    pub attempted: usize,
    pub retried: usize,
    pub still_failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub checked: usize,
    pub updated: usize,
}

pub struct CampaignDispatcher {
    directory: Arc<DirectoryStore>,
    store: Arc<CampaignStore>,
    email: EmailProvider,
    sms: SmsGateway,
    whatsapp: WhatsAppLinker,
}

impl CampaignDispatcher {
    pub fn new(
        directory: Arc<DirectoryStore>,
        store: Arc<CampaignStore>,
        email: EmailProvider,
        sms: SmsGateway,
        whatsapp: WhatsAppLinker,
    ) -> Self {
        Self {
            directory,
            store,
            email,
            sms,
            whatsapp,
        }
    }

    pub fn store(&self) -> &Arc<CampaignStore> {
        &self.store
    }

    pub fn directory(&self) -> &Arc<DirectoryStore> {
        &self.directory
    }

    /// Run one campaign dispatch end to end.
    pub async fn dispatch(&self, req: DispatchRequest) -> InviteResult<DispatchResult> {
        if req.selection.is_empty() {
            return Err(InviteError::NoRecipients);
        }

        // Fail fast before creating any campaign state.
        match req.channel {
            Channel::Email => self.email.config().require_credentials()?,
            Channel::Sms => self.sms.config().require_credentials()?,
            Channel::WhatsApp => {}
        }

        let resolved = self.directory.resolve(&req.selection);
        if resolved.is_empty() {
            return Err(InviteError::NoRecipients);
        }

        if req.channel == Channel::Sms && resolved.len() > self.sms.max_recipients() {
            return Err(InviteError::Validation(format!(
                "SMS dispatch is limited to {} recipients per send, got {}",
                self.sms.max_recipients(),
                resolved.len()
            )));
        }

        let campaign = self.store.create_campaign(
            CampaignDraft {
                title: req.title.clone(),
                subject: req.subject.clone(),
                content: req.content.clone(),
                channel: req.channel,
            },
            resolved.len(),
        );

        info!(
            campaign_id = %campaign.id,
            channel = req.channel.display_name(),
            recipients = resolved.len(),
            "Dispatch started"
        );

        let mut result = DispatchResult {
            campaign_id: campaign.id,
            channel: req.channel,
            attempted: resolved.len(),
            sent: 0,
            failed: 0,
            failures: Vec::new(),
            links: Vec::new(),
        };

        let total = resolved.len();
        for (i, recipient) in resolved.iter().enumerate() {
            self.send_one(&req, campaign.id, recipient, &mut result);
            self.pace(req.channel, i, total).await;
        }

        metrics::counter!(
            "dispatch.sent",
            "channel" => req.channel.display_name()
        )
        .increment(result.sent as u64);
        metrics::counter!(
            "dispatch.failed",
            "channel" => req.channel.display_name()
        )
        .increment(result.failed as u64);

        info!(
            campaign_id = %campaign.id,
            sent = result.sent,
            failed = result.failed,
            "Dispatch finished"
        );
        Ok(result)
    }

    /// Dispatch the same composed message over several channels. Channels
    /// are independent: one channel failing wholesale does not stop the
    /// others, and each successful channel gets its own campaign row.
    pub async fn dispatch_combo(
        &self,
        channels: &[Channel],
        selection: RecipientSelection,
        title: &str,
        subject: &str,
        content: &str,
        email_path: SendPath,
    ) -> Vec<(Channel, InviteResult<DispatchResult>)> {
        let mut outcomes = Vec::with_capacity(channels.len());
        for &channel in channels {
            let req = DispatchRequest {
                channel,
                selection: selection.clone(),
                title: format!("{} ({})", title, channel.display_name()),
                subject: subject.to_string(),
                content: content.to_string(),
                email_path,
            };
            outcomes.push((channel, self.dispatch(req).await));
        }
        outcomes
    }

    fn send_one(
        &self,
        req: &DispatchRequest,
        campaign_id: Uuid,
        recipient: &Recipient,
        result: &mut DispatchResult,
    ) {
        let vars = personalization_vars(recipient);
        let body = invite_content::render(&req.content, &vars);
        let subject = invite_content::render(&req.subject, &vars);

        let contact = if req.channel.requires_phone() {
            recipient.phone.clone()
        } else {
            Some(recipient.email.clone())
        };
        let Some(contact) = contact else {
            self.record_failure(
                req,
                campaign_id,
                recipient,
                String::new(),
                &body,
                "no phone number on file",
                result,
            );
            return;
        };

        let submitted: InviteResult<(Option<String>, DeliveryStatus)> = match req.channel {
            Channel::Email => self
                .email
                .send(
                    &contact,
                    &recipient.name,
                    &subject,
                    &body,
                    req.email_path,
                    campaign_id,
                )
                .map(|pid| (Some(pid), DeliveryStatus::Sent)),
            Channel::Sms => self
                .sms
                .send(&contact, &body)
                .map(|pid| (Some(pid), DeliveryStatus::Sent)),
            Channel::WhatsApp => self.whatsapp.build_link(&contact, &body).map(|link| {
                result.links.push(GeneratedLink {
                    name: recipient.name.clone(),
                    phone: contact.clone(),
                    link,
                });
                (None, DeliveryStatus::Generated)
            }),
        };

        match submitted {
            Ok((provider_message_id, status)) => {
                result.sent += 1;
                self.store.record_entry(DeliveryLogEntry {
                    id: Uuid::new_v4(),
                    campaign_id,
                    recipient: recipient.reference(),
                    recipient_name: recipient.name.clone(),
                    contact,
                    channel: req.channel,
                    content: body,
                    provider_message_id,
                    status,
                    sent_at: chrono::Utc::now(),
                    delivered_at: None,
                    opened_at: None,
                    clicked_at: None,
                    error: None,
                });
            }
            Err(e) => {
                let reason = e.to_string();
                self.record_failure(req, campaign_id, recipient, contact, &body, &reason, result);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record_failure(
        &self,
        req: &DispatchRequest,
        campaign_id: Uuid,
        recipient: &Recipient,
        contact: String,
        body: &str,
        reason: &str,
        result: &mut DispatchResult,
    ) {
        warn!(
            campaign_id = %campaign_id,
            recipient = %recipient.name,
            reason = %reason,
            "Send failed"
        );
        result.failed += 1;
        if result.failures.len() < MAX_REPORTED_FAILURES {
            result.failures.push(DispatchFailure {
                name: recipient.name.clone(),
                contact: contact.clone(),
                reason: reason.to_string(),
            });
        }
        self.store.record_entry(DeliveryLogEntry {
            id: Uuid::new_v4(),
            campaign_id,
            recipient: recipient.reference(),
            recipient_name: recipient.name.clone(),
            contact,
            channel: req.channel,
            content: body.to_string(),
            provider_message_id: None,
            status: DeliveryStatus::Failed,
            sent_at: chrono::Utc::now(),
            delivered_at: None,
            opened_at: None,
            clicked_at: None,
            error: Some(reason.to_string()),
        });
    }

    async fn pace(&self, channel: Channel, index: usize, total: usize) {
        if index + 1 >= total {
            return;
        }
        match channel {
            Channel::Email => {
                let batch = self.email.config().batch_size.max(1);
                if (index + 1) % batch == 0 {
                    tokio::time::sleep(Duration::from_millis(self.email.config().batch_delay_ms))
                        .await;
                }
            }
            Channel::Sms => {
                tokio::time::sleep(Duration::from_millis(self.sms.config().send_delay_ms)).await;
            }
            Channel::WhatsApp => {}
        }
    }

    /// Resubmit every failed email row of a campaign. Rows that go through
    /// flip back to `Sent` in place; the log never grows a second row for
    /// the same recipient.
    pub async fn retry_failed(&self, campaign_id: Uuid) -> InviteResult<RetryReport> {
        let campaign = self
            .store
            .get_campaign(campaign_id)
            .ok_or_else(|| InviteError::NotFound(format!("campaign {campaign_id}")))?;
        self.email.config().require_credentials()?;

        let failed = self.store.failed_email_entries(campaign_id);
        let mut report = RetryReport {
            attempted: failed.len(),
            retried: 0,
            still_failed: 0,
        };
        if failed.is_empty() {
            return Ok(report);
        }

        info!(campaign_id = %campaign_id, count = failed.len(), "Retrying failed emails");
        let total = failed.len();
        for (i, entry) in failed.into_iter().enumerate() {
            // The stored body is already personalized; the subject is
            // rendered again from the campaign record, as at dispatch.
            let subject = invite_content::render(&campaign.subject, &entry_vars(&entry));
            match self.email.send(
                &entry.contact,
                &entry.recipient_name,
                &subject,
                &entry.content,
                SendPath::Standard,
                campaign_id,
            ) {
                Ok(pid) => {
                    self.store.mark_sent(entry.id, pid)?;
                    report.retried += 1;
                }
                Err(e) => {
                    warn!(contact = %entry.contact, error = %e, "Retry failed again");
                    report.still_failed += 1;
                }
            }
            self.pace(Channel::Email, i, total).await;
        }
        metrics::counter!("dispatch.retried").increment(report.retried as u64);
        Ok(report)
    }

    /// Poll the email provider for rows still marked `Sent` and fold any
    /// reported state change into the log.
    pub fn reconcile_email_status(&self) -> SyncReport {
        let pending = self.store.pending_email_entries();
        let mut report = SyncReport {
            checked: pending.len(),
            updated: 0,
        };
        for entry in pending {
            let Some(pid) = entry.provider_message_id else {
                continue;
            };
            let Some(status) = self.email.check_status(&pid) else {
                continue;
            };
            if status == entry.status {
                continue;
            }
            let Some(event) = status_event(status) else {
                continue;
            };
            self.store.apply_event(&WebhookEvent {
                message_id: pid,
                event,
                email: Some(entry.contact),
                timestamp: None,
                reason: None,
            });
            report.updated += 1;
        }
        report
    }

    /// Delete a recipient, refusing while delivery history references it.
    pub fn delete_recipient(&self, kind: RecipientKind, id: Uuid) -> InviteResult<Recipient> {
        let recipient = self
            .directory
            .get(id)
            .filter(|r| r.kind() == kind)
            .ok_or_else(|| InviteError::NotFound(format!("recipient {id}")))?;
        let history = self.store.count_for_recipient(recipient.reference());
        if history > 0 {
            return Err(InviteError::Conflict(format!(
                "recipient {id} has {history} delivery-log rows; delete the campaigns first"
            )));
        }
        self.directory.delete(id)
    }
}

fn personalization_vars(recipient: &Recipient) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("name".to_string(), recipient.name.clone());
    vars.insert("email".to_string(), recipient.email.clone());
    vars
}

/// Personalization vars reconstructed from a delivery-log row, for
/// resubmission after the original `Recipient` lookup is no longer needed.
fn entry_vars(entry: &DeliveryLogEntry) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("name".to_string(), entry.recipient_name.clone());
    vars.insert("email".to_string(), entry.contact.clone());
    vars
}

fn status_event(status: DeliveryStatus) -> Option<invite_core::types::DeliveryEventType> {
    use invite_core::types::DeliveryEventType;
    match status {
        DeliveryStatus::Delivered => Some(DeliveryEventType::Delivered),
        DeliveryStatus::Opened => Some(DeliveryEventType::Opened),
        DeliveryStatus::Clicked => Some(DeliveryEventType::Clicked),
        DeliveryStatus::SoftBounced => Some(DeliveryEventType::SoftBounced),
        DeliveryStatus::Failed => Some(DeliveryEventType::Failed),
        DeliveryStatus::Sent | DeliveryStatus::Generated => None,
    }
}
