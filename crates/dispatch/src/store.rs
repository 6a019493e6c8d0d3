//! In-memory campaign and delivery-log store.
//!
//! Delivery-log rows are keyed by their own id and indexed by the
//! provider's message id for webhook lookups. Unique open/click tracking is
//! campaign-level: a per-campaign set of addresses feeds the aggregate
//! counters and never touches row status.

use chrono::Utc;
use dashmap::DashMap;
use invite_core::types::{
    Campaign, Channel, DeliveryEventType, DeliveryLogEntry, DeliveryStatus, RecipientRef,
    WebhookEvent,
};
use invite_core::{InviteError, InviteResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};
use uuid::Uuid;

/// Fields supplied when composing or editing a campaign.
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignDraft {
    pub title: String,
    pub subject: String,
    pub content: String,
    pub channel: Channel,
}

/// Aggregate delivery figures, global or for one campaign.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeliverySummary {
    pub total_sent: usize,
    pub delivered: usize,
    pub opened: usize,
    pub clicked: usize,
    pub failed: usize,
    /// Rows still `Sent`, awaiting a provider event.
    pub pending: usize,
    pub unique_opens: usize,
    pub unique_clicks: usize,
    /// Percentage of rows confirmed delivered, one decimal place.
    pub delivery_rate: f64,
    /// Percentage of rows opened, one decimal place.
    pub open_rate: f64,
}

/// What applying a webhook event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// A delivery-log row changed.
    Applied,
    /// Only a campaign-level unique counter changed.
    CounterUpdated,
    /// The provider message id matched no row; the event was dropped.
    UnknownMessage,
}

pub struct CampaignStore {
    campaigns: DashMap<Uuid, Campaign>,
    entries: DashMap<Uuid, DeliveryLogEntry>,
    /// provider_message_id -> delivery-log row id, for webhook lookups.
    provider_index: DashMap<String, Uuid>,
    unique_opens: DashMap<Uuid, HashSet<String>>,
    unique_clicks: DashMap<Uuid, HashSet<String>>,
}

impl CampaignStore {
    pub fn new() -> Self {
        Self {
            campaigns: DashMap::new(),
            entries: DashMap::new(),
            provider_index: DashMap::new(),
            unique_opens: DashMap::new(),
            unique_clicks: DashMap::new(),
        }
    }

    // ─── Campaigns ──────────────────────────────────────────────────────

    pub fn create_campaign(&self, draft: CampaignDraft, recipient_total: usize) -> Campaign {
        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4(),
            title: draft.title,
            subject: draft.subject,
            content: draft.content,
            channel: draft.channel,
            recipient_total,
            created_at: now,
            updated_at: now,
        };
        debug!(id = %campaign.id, channel = campaign.channel.display_name(), "Campaign created");
        self.campaigns.insert(campaign.id, campaign.clone());
        campaign
    }

    /// Edit the composed fields of a campaign. The channel and recipient
    /// count are stamped at dispatch and do not change afterwards.
    pub fn update_campaign(
        &self,
        id: Uuid,
        title: String,
        subject: String,
        content: String,
    ) -> InviteResult<Campaign> {
        let mut entry = self
            .campaigns
            .get_mut(&id)
            .ok_or_else(|| InviteError::NotFound(format!("campaign {id}")))?;
        let c = entry.value_mut();
        c.title = title;
        c.subject = subject;
        c.content = content;
        c.updated_at = Utc::now();
        Ok(c.clone())
    }

    pub fn get_campaign(&self, id: Uuid) -> Option<Campaign> {
        self.campaigns.get(&id).map(|c| c.clone())
    }

    /// All campaigns, newest first.
    pub fn list_campaigns(&self) -> Vec<Campaign> {
        let mut rows: Vec<Campaign> = self.campaigns.iter().map(|c| c.clone()).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }

    /// Remove a campaign and every delivery-log row attached to it.
    pub fn delete_campaign(&self, id: Uuid) -> InviteResult<Campaign> {
        let (_, campaign) = self
            .campaigns
            .remove(&id)
            .ok_or_else(|| InviteError::NotFound(format!("campaign {id}")))?;

        let doomed: Vec<Uuid> = self
            .entries
            .iter()
            .filter(|e| e.campaign_id == id)
            .map(|e| e.id)
            .collect();
        for entry_id in doomed {
            if let Some((_, entry)) = self.entries.remove(&entry_id) {
                if let Some(pid) = entry.provider_message_id {
                    self.provider_index.remove(&pid);
                }
            }
        }
        self.unique_opens.remove(&id);
        self.unique_clicks.remove(&id);
        Ok(campaign)
    }

    // ─── Delivery log ───────────────────────────────────────────────────

    pub fn record_entry(&self, entry: DeliveryLogEntry) {
        if let Some(pid) = &entry.provider_message_id {
            self.provider_index.insert(pid.clone(), entry.id);
        }
        self.entries.insert(entry.id, entry);
    }

    pub fn entry(&self, id: Uuid) -> Option<DeliveryLogEntry> {
        self.entries.get(&id).map(|e| e.clone())
    }

    /// Rows for one campaign, oldest first.
    pub fn entries_for_campaign(&self, campaign_id: Uuid) -> Vec<DeliveryLogEntry> {
        let mut rows: Vec<DeliveryLogEntry> = self
            .entries
            .iter()
            .filter(|e| e.campaign_id == campaign_id)
            .map(|e| e.clone())
            .collect();
        rows.sort_by(|a, b| a.sent_at.cmp(&b.sent_at));
        rows
    }

    /// Delivery history of one recipient across campaigns, newest first.
    pub fn entries_for_recipient(&self, recipient: RecipientRef) -> Vec<DeliveryLogEntry> {
        let mut rows: Vec<DeliveryLogEntry> = self
            .entries
            .iter()
            .filter(|e| e.recipient == recipient)
            .map(|e| e.clone())
            .collect();
        rows.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        rows
    }

    pub fn count_for_recipient(&self, recipient: RecipientRef) -> usize {
        self.entries.iter().filter(|e| e.recipient == recipient).count()
    }

    pub fn failed_email_entries(&self, campaign_id: Uuid) -> Vec<DeliveryLogEntry> {
        self.entries_for_campaign(campaign_id)
            .into_iter()
            .filter(|e| e.channel == Channel::Email && e.status == DeliveryStatus::Failed)
            .collect()
    }

    /// Email rows still awaiting a terminal state, for provider polling.
    pub fn pending_email_entries(&self) -> Vec<DeliveryLogEntry> {
        self.entries
            .iter()
            .filter(|e| {
                e.channel == Channel::Email
                    && e.status == DeliveryStatus::Sent
                    && e.provider_message_id.is_some()
            })
            .map(|e| e.clone())
            .collect()
    }

    /// Flip a previously failed row back to `Sent` after a successful
    /// resubmission, clearing the recorded error.
    pub fn mark_sent(&self, entry_id: Uuid, provider_message_id: String) -> InviteResult<()> {
        let mut entry = self
            .entries
            .get_mut(&entry_id)
            .ok_or_else(|| InviteError::NotFound(format!("delivery-log row {entry_id}")))?;
        let e = entry.value_mut();
        if let Some(old) = e.provider_message_id.take() {
            self.provider_index.remove(&old);
        }
        e.status = DeliveryStatus::Sent;
        e.error = None;
        e.sent_at = Utc::now();
        e.provider_message_id = Some(provider_message_id.clone());
        drop(entry);
        self.provider_index.insert(provider_message_id, entry_id);
        Ok(())
    }

    // ─── Webhook events ─────────────────────────────────────────────────

    /// Apply one provider event to the log. Row status is last-write-wins;
    /// the per-state timestamps are set once the matching event arrives.
    pub fn apply_event(&self, event: &WebhookEvent) -> EventOutcome {
        let entry_id = match self.provider_index.get(&event.message_id) {
            Some(id) => *id.value(),
            None => {
                warn!(message_id = %event.message_id, "Webhook event for unknown message id");
                metrics::counter!("webhooks.unknown_message").increment(1);
                return EventOutcome::UnknownMessage;
            }
        };

        let mut entry = match self.entries.get_mut(&entry_id) {
            Some(e) => e,
            None => return EventOutcome::UnknownMessage,
        };
        let e = entry.value_mut();
        let at = event.timestamp.unwrap_or_else(Utc::now);

        let outcome = match event.event {
            DeliveryEventType::Delivered => {
                e.status = DeliveryStatus::Delivered;
                e.delivered_at = Some(at);
                EventOutcome::Applied
            }
            DeliveryEventType::Opened => {
                e.status = DeliveryStatus::Opened;
                e.opened_at = Some(at);
                EventOutcome::Applied
            }
            DeliveryEventType::Clicked => {
                e.status = DeliveryStatus::Clicked;
                e.clicked_at = Some(at);
                EventOutcome::Applied
            }
            DeliveryEventType::SoftBounced => {
                e.status = DeliveryStatus::SoftBounced;
                e.error = event.reason.clone();
                EventOutcome::Applied
            }
            DeliveryEventType::Bounced | DeliveryEventType::Failed => {
                e.status = DeliveryStatus::Failed;
                e.error = event.reason.clone();
                EventOutcome::Applied
            }
            DeliveryEventType::OpenedUnique | DeliveryEventType::ClickedUnique => {
                let campaign_id = e.campaign_id;
                let who = event.email.clone().unwrap_or_else(|| e.contact.clone());
                drop(entry);
                let set = match event.event {
                    DeliveryEventType::OpenedUnique => &self.unique_opens,
                    _ => &self.unique_clicks,
                };
                set.entry(campaign_id).or_default().insert(who);
                metrics::counter!(
                    "webhooks.events",
                    "type" => "unique"
                )
                .increment(1);
                return EventOutcome::CounterUpdated;
            }
        };

        metrics::counter!(
            "webhooks.events",
            "type" => format!("{:?}", event.event)
        )
        .increment(1);
        outcome
    }

    // ─── Analytics ──────────────────────────────────────────────────────

    /// Aggregate figures. `None` scopes to all email rows; `Some(id)` to
    /// one campaign's rows regardless of channel.
    pub fn summarize(&self, campaign: Option<Uuid>) -> DeliverySummary {
        let rows: Vec<DeliveryLogEntry> = match campaign {
            Some(id) => self.entries_for_campaign(id),
            None => self
                .entries
                .iter()
                .filter(|e| e.channel == Channel::Email)
                .map(|e| e.clone())
                .collect(),
        };

        let mut summary = DeliverySummary {
            total_sent: rows.len(),
            ..Default::default()
        };
        // Delivered/opened/clicked come from the per-state timestamps, not
        // the last-write-wins status, so a row that advanced past a state
        // still counts at every state it passed through.
        for row in &rows {
            if row.delivered_at.is_some() {
                summary.delivered += 1;
            }
            if row.opened_at.is_some() {
                summary.opened += 1;
            }
            if row.clicked_at.is_some() {
                summary.clicked += 1;
            }
            if row.status == DeliveryStatus::Failed {
                summary.failed += 1;
            }
            if row.status == DeliveryStatus::Sent {
                summary.pending += 1;
            }
        }

        match campaign {
            Some(id) => {
                summary.unique_opens = self.unique_opens.get(&id).map_or(0, |s| s.len());
                summary.unique_clicks = self.unique_clicks.get(&id).map_or(0, |s| s.len());
            }
            None => {
                summary.unique_opens = self.unique_opens.iter().map(|s| s.len()).sum();
                summary.unique_clicks = self.unique_clicks.iter().map(|s| s.len()).sum();
            }
        }

        if summary.total_sent > 0 {
            let total = summary.total_sent as f64;
            summary.delivery_rate = round1(summary.delivered as f64 / total * 100.0);
            summary.open_rate = round1(summary.opened as f64 / total * 100.0);
        }
        summary
    }
}

impl Default for CampaignStore {
    fn default() -> Self {
        Self::new()
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
