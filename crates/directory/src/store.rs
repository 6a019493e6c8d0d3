//! In-memory recipient store backed by DashMap.
//!
//! Presents the same API surface a relational store would: per-kind unique
//! email constraint, name-ordered listing, and id resolution for campaign
//! selections.

use chrono::Utc;
use dashmap::DashMap;
use invite_core::types::{Recipient, RecipientKind, RecipientProfile, RecipientRef};
use invite_core::{InviteError, InviteResult};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

/// Fields supplied when creating or replacing a recipient.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipientDraft {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(flatten)]
    pub profile: RecipientProfile,
}

/// Campaign recipient selection: three id lists, one per kind.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipientSelection {
    #[serde(default)]
    pub student_ids: Vec<Uuid>,
    #[serde(default)]
    pub guest_ids: Vec<Uuid>,
    #[serde(default)]
    pub professor_ids: Vec<Uuid>,
}

impl RecipientSelection {
    pub fn is_empty(&self) -> bool {
        self.student_ids.is_empty() && self.guest_ids.is_empty() && self.professor_ids.is_empty()
    }
}

pub struct DirectoryStore {
    recipients: DashMap<Uuid, Recipient>,
}

impl DirectoryStore {
    pub fn new() -> Self {
        info!("Recipient directory initialized (in-memory)");
        Self {
            recipients: DashMap::new(),
        }
    }

    pub fn create(&self, draft: RecipientDraft) -> InviteResult<Recipient> {
        validate_draft(&draft)?;
        let kind = draft.profile.kind();
        if self.email_taken(kind, &draft.email, None) {
            return Err(InviteError::DuplicateEmail(draft.email));
        }

        let recipient = Recipient {
            id: Uuid::new_v4(),
            name: draft.name.trim().to_string(),
            email: draft.email.trim().to_string(),
            phone: normalize_phone(draft.phone),
            created_at: Utc::now(),
            profile: draft.profile,
        };
        metrics::counter!(
            "directory.recipients.created",
            "kind" => kind.path_segment()
        )
        .increment(1);
        debug!(id = %recipient.id, kind = kind.display_name(), "Recipient created");
        self.recipients.insert(recipient.id, recipient.clone());
        Ok(recipient)
    }

    /// Full-field replace. The kind of a recipient never changes; a draft of
    /// a different kind is rejected as a validation error.
    pub fn update(&self, id: Uuid, draft: RecipientDraft) -> InviteResult<Recipient> {
        validate_draft(&draft)?;
        let existing_kind = self
            .recipients
            .get(&id)
            .map(|r| r.kind())
            .ok_or_else(|| InviteError::NotFound(format!("recipient {id}")))?;
        if existing_kind != draft.profile.kind() {
            return Err(InviteError::Validation(
                "recipient kind cannot be changed".to_string(),
            ));
        }
        if self.email_taken(existing_kind, &draft.email, Some(id)) {
            return Err(InviteError::DuplicateEmail(draft.email));
        }

        let mut entry = self
            .recipients
            .get_mut(&id)
            .ok_or_else(|| InviteError::NotFound(format!("recipient {id}")))?;
        let r = entry.value_mut();
        r.name = draft.name.trim().to_string();
        r.email = draft.email.trim().to_string();
        r.phone = normalize_phone(draft.phone);
        r.profile = draft.profile;
        Ok(r.clone())
    }

    /// Plain removal. The referential-integrity guard (no delete while
    /// delivery-log rows exist) is enforced by the dispatcher, which owns
    /// the log.
    pub fn delete(&self, id: Uuid) -> InviteResult<Recipient> {
        self.recipients
            .remove(&id)
            .map(|(_, r)| r)
            .ok_or_else(|| InviteError::NotFound(format!("recipient {id}")))
    }

    pub fn get(&self, id: Uuid) -> Option<Recipient> {
        self.recipients.get(&id).map(|r| r.clone())
    }

    /// All recipients of a kind, ordered by name ascending.
    pub fn list(&self, kind: RecipientKind) -> Vec<Recipient> {
        let mut rows: Vec<Recipient> = self
            .recipients
            .iter()
            .filter(|r| r.kind() == kind)
            .map(|r| r.clone())
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        rows
    }

    /// Resolve a selection to contact rows. Ids that do not resolve, or that
    /// resolve to a row of a different kind than the list they came from,
    /// are silently dropped.
    pub fn resolve(&self, selection: &RecipientSelection) -> Vec<Recipient> {
        let mut resolved = Vec::new();
        let lists = [
            (RecipientKind::Student, &selection.student_ids),
            (RecipientKind::Guest, &selection.guest_ids),
            (RecipientKind::Professor, &selection.professor_ids),
        ];
        for (kind, ids) in lists {
            for id in ids {
                match self.get(*id) {
                    Some(r) if r.kind() == kind => resolved.push(r),
                    Some(_) | None => {
                        debug!(id = %id, kind = kind.display_name(), "Dropping unresolvable selection id");
                    }
                }
            }
        }
        resolved
    }

    pub fn reference(&self, id: Uuid) -> Option<RecipientRef> {
        self.get(id).map(|r| r.reference())
    }

    fn email_taken(&self, kind: RecipientKind, email: &str, excluding: Option<Uuid>) -> bool {
        let email = email.trim();
        self.recipients.iter().any(|r| {
            r.kind() == kind
                && Some(r.id) != excluding
                && r.email.eq_ignore_ascii_case(email)
        })
    }
}

impl Default for DirectoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_phone(phone: Option<String>) -> Option<String> {
    phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}

fn validate_draft(draft: &RecipientDraft) -> InviteResult<()> {
    let mut missing: Vec<&str> = Vec::new();
    if draft.name.trim().is_empty() {
        missing.push("name");
    }
    if draft.email.trim().is_empty() {
        missing.push("email");
    }
    match &draft.profile {
        RecipientProfile::Student { course, year } => {
            if course.trim().is_empty() {
                missing.push("course");
            }
            if year.trim().is_empty() {
                missing.push("year");
            }
        }
        RecipientProfile::Guest {
            organization,
            designation,
            ..
        } => {
            if organization.trim().is_empty() {
                missing.push("organization");
            }
            if designation.trim().is_empty() {
                missing.push("designation");
            }
        }
        RecipientProfile::Professor {
            college,
            department,
            designation,
            ..
        } => {
            if college.trim().is_empty() {
                missing.push("college");
            }
            if department.trim().is_empty() {
                missing.push("department");
            }
            if designation.trim().is_empty() {
                missing.push("designation");
            }
        }
    }
    if !missing.is_empty() {
        return Err(InviteError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }
    if !draft.email.contains('@') {
        return Err(InviteError::Validation(format!(
            "email '{}' is not a valid address",
            draft.email.trim()
        )));
    }
    Ok(())
}
