//! Shared domain types: recipients, campaigns, delivery log, channels.
//!
//! The three recipient kinds share identity and contact fields and diverge
//! only in their variant metadata, so they are modeled as one struct with a
//! profile sum type rather than three parallel tables. A delivery-log row
//! points at exactly one recipient through a tagged `RecipientRef`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// ─── Recipients ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientKind {
    Student,
    Guest,
    Professor,
}

impl RecipientKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            RecipientKind::Student => "Student",
            RecipientKind::Guest => "Guest",
            RecipientKind::Professor => "Professor",
        }
    }

    /// REST path segment for this kind.
    pub fn path_segment(&self) -> &'static str {
        match self {
            RecipientKind::Student => "students",
            RecipientKind::Guest => "guests",
            RecipientKind::Professor => "professors",
        }
    }
}

impl FromStr for RecipientKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "students" => Ok(RecipientKind::Student),
            "guests" => Ok(RecipientKind::Guest),
            "professors" => Ok(RecipientKind::Professor),
            _ => Err(()),
        }
    }
}

/// Variant-specific recipient metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecipientProfile {
    Student {
        course: String,
        year: String,
    },
    Guest {
        organization: String,
        designation: String,
        #[serde(default)]
        category: Option<String>,
    },
    Professor {
        college: String,
        department: String,
        designation: String,
        #[serde(default)]
        expertise: Option<String>,
    },
}

impl RecipientProfile {
    pub fn kind(&self) -> RecipientKind {
        match self {
            RecipientProfile::Student { .. } => RecipientKind::Student,
            RecipientProfile::Guest { .. } => RecipientKind::Guest,
            RecipientProfile::Professor { .. } => RecipientKind::Professor,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub profile: RecipientProfile,
}

impl Recipient {
    pub fn kind(&self) -> RecipientKind {
        self.profile.kind()
    }

    pub fn reference(&self) -> RecipientRef {
        RecipientRef::new(self.kind(), self.id)
    }
}

/// One reference with a variant tag — not three nullable foreign keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RecipientRef {
    Student(Uuid),
    Guest(Uuid),
    Professor(Uuid),
}

impl RecipientRef {
    pub fn new(kind: RecipientKind, id: Uuid) -> Self {
        match kind {
            RecipientKind::Student => RecipientRef::Student(id),
            RecipientKind::Guest => RecipientRef::Guest(id),
            RecipientKind::Professor => RecipientRef::Professor(id),
        }
    }

    pub fn kind(&self) -> RecipientKind {
        match self {
            RecipientRef::Student(_) => RecipientKind::Student,
            RecipientRef::Guest(_) => RecipientKind::Guest,
            RecipientRef::Professor(_) => RecipientKind::Professor,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            RecipientRef::Student(id) | RecipientRef::Guest(id) | RecipientRef::Professor(id) => {
                *id
            }
        }
    }
}

// ─── Channels ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    #[serde(rename = "whatsapp")]
    WhatsApp,
}

impl Channel {
    pub fn display_name(&self) -> &'static str {
        match self {
            Channel::Email => "Email",
            Channel::Sms => "SMS",
            Channel::WhatsApp => "WhatsApp",
        }
    }

    /// Phone channels address recipients by phone number rather than email.
    pub fn requires_phone(&self) -> bool {
        matches!(self, Channel::Sms | Channel::WhatsApp)
    }
}

// ─── Campaigns ──────────────────────────────────────────────────────────────

/// One composed-and-dispatched message plus its recipient count at send
/// time. Each dispatch action (including each channel of a combo send)
/// creates its own campaign row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    /// Internal label shown to administrators.
    pub title: String,
    pub subject: String,
    pub content: String,
    pub channel: Channel,
    /// Resolved recipient count stamped at send time.
    pub recipient_total: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ─── Delivery log ───────────────────────────────────────────────────────────

/// Per-recipient, per-channel-attempt delivery state.
///
/// `Generated` is the WhatsApp link mode: the link was produced but actual
/// delivery is a manual action outside the system. Unique open/click events
/// are campaign-level counters, never a row status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Opened,
    Clicked,
    SoftBounced,
    Failed,
    Generated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLogEntry {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub recipient: RecipientRef,
    pub recipient_name: String,
    /// Email address or phone number the submission targeted.
    pub contact: String,
    pub channel: Channel,
    /// Personalized body as submitted.
    pub content: String,
    /// Channel-assigned identifier, populated once the provider accepts.
    pub provider_message_id: Option<String>,
    pub status: DeliveryStatus,
    pub sent_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub opened_at: Option<DateTime<Utc>>,
    pub clicked_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

// ─── Webhook events ─────────────────────────────────────────────────────────

/// Event vocabulary reported by provider webhook callbacks. The unique
/// variants feed aggregate counters only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryEventType {
    Delivered,
    Opened,
    Clicked,
    OpenedUnique,
    ClickedUnique,
    SoftBounced,
    Bounced,
    Failed,
}

/// An asynchronous delivery-state notification, keyed by the provider's
/// message identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    pub message_id: String,
    pub event: DeliveryEventType,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reason: Option<String>,
}
