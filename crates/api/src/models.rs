//! Wire DTOs for the admin REST API. Everything on the wire is camelCase;
//! the domain types stay snake_case internally.

use chrono::{DateTime, Utc};
use invite_content::{EventParams, MessageTemplate};
use invite_core::types::{
    Campaign, Channel, DeliveryLogEntry, DeliveryStatus, Recipient, RecipientProfile,
};
use invite_dispatch::{DeliverySummary, DispatchFailure, DispatchResult, GeneratedLink};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

// ─── Auth ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

// ─── Recipients ────────────────────────────────────────────────────────────

/// Create/update payload for any recipient kind; the path decides which
/// variant fields are required.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub college: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub expertise: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientDto {
    pub id: Uuid,
    pub kind: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expertise: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Recipient> for RecipientDto {
    fn from(r: Recipient) -> Self {
        let mut dto = RecipientDto {
            id: r.id,
            kind: r.kind().path_segment().to_string(),
            name: r.name,
            email: r.email,
            phone: r.phone,
            course: None,
            year: None,
            organization: None,
            designation: None,
            category: None,
            college: None,
            department: None,
            expertise: None,
            created_at: r.created_at,
        };
        match r.profile {
            RecipientProfile::Student { course, year } => {
                dto.course = Some(course);
                dto.year = Some(year);
            }
            RecipientProfile::Guest {
                organization,
                designation,
                category,
            } => {
                dto.organization = Some(organization);
                dto.designation = Some(designation);
                dto.category = category;
            }
            RecipientProfile::Professor {
                college,
                department,
                designation,
                expertise,
            } => {
                dto.college = Some(college);
                dto.department = Some(department);
                dto.designation = Some(designation);
                dto.expertise = expertise;
            }
        }
        dto
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub success: bool,
    pub imported: usize,
    pub duplicates: Vec<String>,
    pub errors: Vec<RowErrorDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowErrorDto {
    pub row: usize,
    pub message: String,
}

// ─── Dispatch ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    #[serde(default)]
    pub subject: String,
    pub content: String,
    #[serde(default)]
    pub student_ids: Vec<Uuid>,
    #[serde(default)]
    pub guest_ids: Vec<Uuid>,
    #[serde(default)]
    pub professor_ids: Vec<Uuid>,
    #[serde(default)]
    pub invitation_title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboSendRequest {
    #[serde(flatten)]
    pub base: SendRequest,
    pub channels: Vec<Channel>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub success: bool,
    pub message: String,
    pub invitation_id: Uuid,
    pub sent_count: usize,
    pub failed_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_emails: Option<Vec<FailedRecipientDto>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<GeneratedLinkDto>>,
}

impl From<DispatchResult> for SendResponse {
    fn from(r: DispatchResult) -> Self {
        SendResponse {
            success: r.failed == 0,
            message: format!(
                "{}: {} sent, {} failed",
                r.channel.display_name(),
                r.sent,
                r.failed
            ),
            invitation_id: r.campaign_id,
            sent_count: r.sent,
            failed_count: r.failed,
            failed_emails: if r.failures.is_empty() {
                None
            } else {
                Some(r.failures.into_iter().map(Into::into).collect())
            },
            links: if r.links.is_empty() {
                None
            } else {
                Some(r.links.into_iter().map(Into::into).collect())
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedRecipientDto {
    pub name: String,
    pub contact: String,
    pub reason: String,
}

impl From<DispatchFailure> for FailedRecipientDto {
    fn from(f: DispatchFailure) -> Self {
        FailedRecipientDto {
            name: f.name,
            contact: f.contact,
            reason: f.reason,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedLinkDto {
    pub name: String,
    pub phone: String,
    pub link: String,
}

impl From<GeneratedLink> for GeneratedLinkDto {
    fn from(l: GeneratedLink) -> Self {
        GeneratedLinkDto {
            name: l.name,
            phone: l.phone,
            link: l.link,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboChannelOutcome {
    pub channel: Channel,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitation_id: Option<Uuid>,
    pub sent_count: usize,
    pub failed_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboSendResponse {
    pub success: bool,
    pub results: Vec<ComboChannelOutcome>,
}

// ─── Campaign records ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationDto {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub content: String,
    pub channel: Channel,
    pub recipient_total: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Campaign> for InvitationDto {
    fn from(c: Campaign) -> Self {
        InvitationDto {
            id: c.id,
            title: c.title,
            subject: c.subject,
            content: c.content,
            channel: c.channel,
            recipient_total: c.recipient_total,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvitationRequest {
    pub title: String,
    pub subject: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryLogDto {
    pub id: Uuid,
    pub invitation_id: Uuid,
    pub recipient_id: Uuid,
    pub recipient_kind: String,
    pub name: String,
    pub contact: String,
    pub channel: Channel,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_message_id: Option<String>,
    pub sent_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clicked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<DeliveryLogEntry> for DeliveryLogDto {
    fn from(e: DeliveryLogEntry) -> Self {
        DeliveryLogDto {
            id: e.id,
            invitation_id: e.campaign_id,
            recipient_id: e.recipient.id(),
            recipient_kind: e.recipient.kind().path_segment().to_string(),
            name: e.recipient_name,
            contact: e.contact,
            channel: e.channel,
            status: e.status,
            provider_message_id: e.provider_message_id,
            sent_at: e.sent_at,
            delivered_at: e.delivered_at,
            opened_at: e.opened_at,
            clicked_at: e.clicked_at,
            error: e.error,
        }
    }
}

// ─── Retry / sync ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryRequest {
    pub invitation_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryResponse {
    pub success: bool,
    pub attempted: usize,
    pub retried: usize,
    pub still_failed: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub checked: usize,
    pub updated: usize,
}

// ─── Analytics ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub total_sent: usize,
    pub delivered: usize,
    pub opened: usize,
    pub clicked: usize,
    pub failed: usize,
    pub pending: usize,
    pub unique_opens: usize,
    pub unique_clicks: usize,
    pub delivery_rate: f64,
    pub open_rate: f64,
}

impl From<DeliverySummary> for AnalyticsResponse {
    fn from(s: DeliverySummary) -> Self {
        AnalyticsResponse {
            total_sent: s.total_sent,
            delivered: s.delivered,
            opened: s.opened,
            clicked: s.clicked,
            failed: s.failed,
            pending: s.pending,
            unique_opens: s.unique_opens,
            unique_clicks: s.unique_clicks,
            delivery_rate: s.delivery_rate,
            open_rate: s.open_rate,
        }
    }
}

// ─── Content production ────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub event_name: String,
    pub committee_name: String,
    pub event_date: String,
    pub venue: String,
    #[serde(default)]
    pub event_time: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
}

impl From<GenerateRequest> for EventParams {
    fn from(r: GenerateRequest) -> Self {
        EventParams {
            event_name: r.event_name,
            committee_name: r.committee_name,
            event_date: r.event_date,
            venue: r.venue,
            event_time: r.event_time,
            description: r.description,
            contact: r.contact,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub subject: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortMessageRequest {
    #[serde(flatten)]
    pub params: GenerateRequest,
    pub channel: Channel,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShortMessageResponse {
    pub content: String,
}

// ─── Templates ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct TemplateDto {
    pub id: String,
    pub name: String,
    pub channel: Channel,
    pub body: String,
    pub variables: Vec<String>,
}

impl From<&MessageTemplate> for TemplateDto {
    fn from(t: &MessageTemplate) -> Self {
        TemplateDto {
            id: t.id.to_string(),
            name: t.name.to_string(),
            channel: t.channel,
            body: t.body.to_string(),
            variables: t.variables.iter().map(|v| v.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderTemplateRequest {
    pub template_id: String,
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderTemplateResponse {
    pub content: String,
}

// ─── Webhooks / ops ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    pub outcome: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub node: String,
    pub uptime_seconds: u64,
}
