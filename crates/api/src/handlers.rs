//! Axum REST handlers for the admin API.

use crate::auth;
use crate::error::ApiError;
use crate::models::*;
use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use invite_channels::email::SendPath;
use invite_channels::signature;
use invite_content::InviteGenerator;
use invite_core::config::AppConfig;
use invite_core::types::{Channel, RecipientKind, RecipientProfile, WebhookEvent};
use invite_core::InviteError;
use invite_directory::{csv_io, DirectoryStore, RecipientDraft, RecipientSelection};
use invite_dispatch::{CampaignDispatcher, CampaignStore, DispatchRequest, EventOutcome};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub directory: Arc<DirectoryStore>,
    pub store: Arc<CampaignStore>,
    pub dispatcher: Arc<CampaignDispatcher>,
    pub generator: Arc<InviteGenerator>,
    pub start_time: Instant,
}

fn parse_kind(segment: &str) -> Result<RecipientKind, ApiError> {
    segment
        .parse()
        .map_err(|_| ApiError(InviteError::NotFound(format!("no such collection '{segment}'"))))
}

// ─── Auth ──────────────────────────────────────────────────────────────────

pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let resp = auth::authenticate(&state.config.admin, &req).map_err(|e| match e {
        // Do not leak whether a password is configured.
        InviteError::Validation(_) | InviteError::Config(_) => {
            InviteError::Validation("invalid password".to_string())
        }
        other => other,
    })?;
    metrics::counter!("api.logins").increment(1);
    Ok(Json(resp))
}

// ─── Recipients ────────────────────────────────────────────────────────────

fn draft_from_request(kind: RecipientKind, req: RecipientRequest) -> RecipientDraft {
    let profile = match kind {
        RecipientKind::Student => RecipientProfile::Student {
            course: req.course.unwrap_or_default(),
            year: req.year.unwrap_or_default(),
        },
        RecipientKind::Guest => RecipientProfile::Guest {
            organization: req.organization.unwrap_or_default(),
            designation: req.designation.unwrap_or_default(),
            category: req.category,
        },
        RecipientKind::Professor => RecipientProfile::Professor {
            college: req.college.unwrap_or_default(),
            department: req.department.unwrap_or_default(),
            designation: req.designation.unwrap_or_default(),
            expertise: req.expertise,
        },
    };
    RecipientDraft {
        name: req.name,
        email: req.email,
        phone: req.phone,
        profile,
    }
}

pub async fn list_recipients(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<RecipientDto>>, ApiError> {
    let kind = parse_kind(&kind)?;
    let rows = state.directory.list(kind);
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

pub async fn create_recipient(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(req): Json<RecipientRequest>,
) -> Result<(StatusCode, Json<RecipientDto>), ApiError> {
    let kind = parse_kind(&kind)?;
    let recipient = state.directory.create(draft_from_request(kind, req))?;
    Ok((StatusCode::CREATED, Json(recipient.into())))
}

pub async fn get_recipient(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<Json<RecipientDto>, ApiError> {
    let kind = parse_kind(&kind)?;
    let recipient = state
        .directory
        .get(id)
        .filter(|r| r.kind() == kind)
        .ok_or_else(|| ApiError(InviteError::NotFound(format!("recipient {id}"))))?;
    Ok(Json(recipient.into()))
}

pub async fn update_recipient(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(req): Json<RecipientRequest>,
) -> Result<Json<RecipientDto>, ApiError> {
    let kind = parse_kind(&kind)?;
    let recipient = state.directory.update(id, draft_from_request(kind, req))?;
    Ok(Json(recipient.into()))
}

pub async fn delete_recipient(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let kind = parse_kind(&kind)?;
    state.dispatcher.delete_recipient(kind, id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn recipient_history(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<Json<Vec<DeliveryLogDto>>, ApiError> {
    let kind = parse_kind(&kind)?;
    let recipient = state
        .directory
        .get(id)
        .filter(|r| r.kind() == kind)
        .ok_or_else(|| ApiError(InviteError::NotFound(format!("recipient {id}"))))?;
    let rows = state.store.entries_for_recipient(recipient.reference());
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

pub async fn export_recipients(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Response, ApiError> {
    let kind = parse_kind(&kind)?;
    let csv_text = csv_io::export_csv(&state.directory, kind)?;
    let filename = format!("{}.csv", kind.path_segment());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv_text,
    )
        .into_response())
}

pub async fn import_recipients(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, ApiError> {
    let kind = parse_kind(&kind)?;

    let mut csv_text = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError(InviteError::Validation(format!("unreadable upload: {e}"))))?
    {
        if field.name() == Some("file") || csv_text.is_none() {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError(InviteError::Validation(format!("unreadable upload: {e}"))))?;
            csv_text = Some(text);
        }
    }
    let csv_text = csv_text
        .ok_or_else(|| ApiError(InviteError::Validation("no file field in upload".to_string())))?;

    let report = csv_io::import_csv(&state.directory, kind, &csv_text)?;
    Ok(Json(ImportResponse {
        success: report.errors.is_empty(),
        imported: report.imported,
        duplicates: report.duplicates,
        errors: report
            .errors
            .into_iter()
            .map(|e| RowErrorDto {
                row: e.row,
                message: e.message,
            })
            .collect(),
    }))
}

// ─── Dispatch ──────────────────────────────────────────────────────────────

fn selection_from(req: &SendRequest) -> RecipientSelection {
    RecipientSelection {
        student_ids: req.student_ids.clone(),
        guest_ids: req.guest_ids.clone(),
        professor_ids: req.professor_ids.clone(),
    }
}

fn dispatch_request(req: SendRequest, channel: Channel, email_path: SendPath) -> DispatchRequest {
    let selection = selection_from(&req);
    let title = req
        .invitation_title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| {
            if req.subject.trim().is_empty() {
                format!("{} dispatch", channel.display_name())
            } else {
                req.subject.clone()
            }
        });
    DispatchRequest {
        channel,
        selection,
        title,
        subject: req.subject,
        content: req.content,
        email_path,
    }
}

pub async fn send_bulk_email(
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let result = state
        .dispatcher
        .dispatch(dispatch_request(req, Channel::Email, SendPath::Standard))
        .await?;
    Ok(Json(result.into()))
}

pub async fn send_bulk_email_enhanced(
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let result = state
        .dispatcher
        .dispatch(dispatch_request(req, Channel::Email, SendPath::Enhanced))
        .await?;
    Ok(Json(result.into()))
}

pub async fn send_phone_sms(
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let result = state
        .dispatcher
        .dispatch(dispatch_request(req, Channel::Sms, SendPath::Standard))
        .await?;
    Ok(Json(result.into()))
}

pub async fn send_whatsapp_web(
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let result = state
        .dispatcher
        .dispatch(dispatch_request(req, Channel::WhatsApp, SendPath::Standard))
        .await?;
    Ok(Json(result.into()))
}

pub async fn send_combo_bulk(
    State(state): State<AppState>,
    Json(req): Json<ComboSendRequest>,
) -> Result<Json<ComboSendResponse>, ApiError> {
    if req.channels.is_empty() {
        return Err(ApiError(InviteError::Validation(
            "at least one channel is required".to_string(),
        )));
    }

    let title = req
        .base
        .invitation_title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| req.base.subject.clone());
    let outcomes = state
        .dispatcher
        .dispatch_combo(
            &req.channels,
            selection_from(&req.base),
            &title,
            &req.base.subject,
            &req.base.content,
            SendPath::Standard,
        )
        .await;

    let results: Vec<ComboChannelOutcome> = outcomes
        .into_iter()
        .map(|(channel, outcome)| match outcome {
            Ok(r) => ComboChannelOutcome {
                channel,
                success: r.failed == 0,
                message: format!("{} sent, {} failed", r.sent, r.failed),
                invitation_id: Some(r.campaign_id),
                sent_count: r.sent,
                failed_count: r.failed,
            },
            Err(e) => ComboChannelOutcome {
                channel,
                success: false,
                message: e.to_string(),
                invitation_id: None,
                sent_count: 0,
                failed_count: 0,
            },
        })
        .collect();

    Ok(Json(ComboSendResponse {
        success: results.iter().all(|r| r.success),
        results,
    }))
}

pub async fn retry_failed_emails(
    State(state): State<AppState>,
    Json(req): Json<RetryRequest>,
) -> Result<Json<RetryResponse>, ApiError> {
    let report = state.dispatcher.retry_failed(req.invitation_id).await?;
    Ok(Json(RetryResponse {
        success: report.still_failed == 0,
        attempted: report.attempted,
        retried: report.retried,
        still_failed: report.still_failed,
    }))
}

// ─── Campaign records ──────────────────────────────────────────────────────

pub async fn list_invitations(State(state): State<AppState>) -> Json<Vec<InvitationDto>> {
    Json(
        state
            .store
            .list_campaigns()
            .into_iter()
            .map(Into::into)
            .collect(),
    )
}

pub async fn get_invitation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvitationDto>, ApiError> {
    state
        .store
        .get_campaign(id)
        .map(|c| Json(c.into()))
        .ok_or_else(|| ApiError(InviteError::NotFound(format!("campaign {id}"))))
}

/// Edits touch the stored record only; nothing is re-sent.
pub async fn update_invitation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateInvitationRequest>,
) -> Result<Json<InvitationDto>, ApiError> {
    let campaign = state
        .store
        .update_campaign(id, req.title, req.subject, req.content)?;
    Ok(Json(campaign.into()))
}

pub async fn delete_invitation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_campaign(id)?;
    metrics::counter!("api.invitations.deleted").increment(1);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn invitation_logs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<DeliveryLogDto>>, ApiError> {
    state
        .store
        .get_campaign(id)
        .ok_or_else(|| ApiError(InviteError::NotFound(format!("campaign {id}"))))?;
    let rows = state.store.entries_for_campaign(id);
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

// ─── Webhooks ──────────────────────────────────────────────────────────────

const SIGNATURE_HEADER: &str = "x-signature";

/// Static capability document, useful when registering the endpoint with a
/// provider console.
pub async fn webhook_info(Path(provider): Path<String>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "provider": provider,
        "signature": { "header": SIGNATURE_HEADER, "scheme": "hmac-sha256" },
        "events": [
            "delivered", "opened", "clicked", "opened_unique", "clicked_unique",
            "soft_bounced", "bounced", "failed"
        ],
    }))
}

/// Signed delivery-event callback. The signature covers the exact raw body
/// bytes; events with unknown message ids are acknowledged without effect so
/// providers do not retry them forever.
pub async fn handle_webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    state.config.webhook.require_secret()?;
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError(InviteError::SignatureInvalid))?;
    signature::verify_header(&state.config.webhook.secret, &body, header)?;

    // Providers post either a single event or a batch.
    let events: Vec<WebhookEvent> = match serde_json::from_slice::<Vec<WebhookEvent>>(&body) {
        Ok(batch) => batch,
        Err(_) => vec![serde_json::from_slice(&body).map_err(|e| {
            ApiError(InviteError::Validation(format!(
                "malformed webhook payload: {e}"
            )))
        })?],
    };

    let mut applied = 0;
    let mut counters = 0;
    let mut unknown = 0;
    for event in &events {
        match state.store.apply_event(event) {
            EventOutcome::Applied => applied += 1,
            EventOutcome::CounterUpdated => counters += 1,
            EventOutcome::UnknownMessage => unknown += 1,
        }
    }

    tracing::debug!(
        provider = %provider,
        applied,
        counters,
        unknown,
        "Webhook batch processed"
    );
    Ok(Json(WebhookAck {
        success: true,
        outcome: format!("{applied} applied, {counters} counters, {unknown} unknown"),
    }))
}

// ─── Analytics ─────────────────────────────────────────────────────────────

pub async fn email_analytics(State(state): State<AppState>) -> Json<AnalyticsResponse> {
    Json(state.store.summarize(None).into())
}

pub async fn campaign_analytics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    state
        .store
        .get_campaign(id)
        .ok_or_else(|| ApiError(InviteError::NotFound(format!("campaign {id}"))))?;
    Ok(Json(state.store.summarize(Some(id)).into()))
}

pub async fn sync_email_analytics(State(state): State<AppState>) -> Json<SyncResponse> {
    let report = state.dispatcher.reconcile_email_status();
    Json(SyncResponse {
        checked: report.checked,
        updated: report.updated,
    })
}

// ─── Content production ────────────────────────────────────────────────────

pub async fn generate_invitation(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Json<GenerateResponse> {
    let invite = state.generator.generate(&req.into());
    Json(GenerateResponse {
        subject: invite.subject,
        content: invite.html_body,
    })
}

pub async fn generate_short_message(
    State(state): State<AppState>,
    Json(req): Json<ShortMessageRequest>,
) -> Result<Json<ShortMessageResponse>, ApiError> {
    let content = state
        .generator
        .generate_short_form(&req.params.into(), req.channel)?;
    Ok(Json(ShortMessageResponse { content }))
}

// ─── Templates ─────────────────────────────────────────────────────────────

pub async fn sms_templates() -> Json<Vec<TemplateDto>> {
    Json(
        invite_content::list_templates(Channel::Sms)
            .into_iter()
            .map(Into::into)
            .collect(),
    )
}

pub async fn whatsapp_templates() -> Json<Vec<TemplateDto>> {
    Json(
        invite_content::list_templates(Channel::WhatsApp)
            .into_iter()
            .map(Into::into)
            .collect(),
    )
}

pub async fn render_whatsapp_template(
    Json(req): Json<RenderTemplateRequest>,
) -> Result<Json<RenderTemplateResponse>, ApiError> {
    let content = invite_content::render_template(&req.template_id, &req.variables)?;
    Ok(Json(RenderTemplateResponse { content }))
}

// ─── Ops ───────────────────────────────────────────────────────────────────

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node: state.config.node_id.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

pub async fn readiness() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ready" }))
}

pub async fn liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "alive" }))
}
