//! Route table for the admin API.

use crate::auth::auth_middleware;
use crate::handlers::{self, AppState};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Auth
        .route("/admin/login", post(handlers::handle_login))
        // Recipient collections ({kind} is students | guests | professors)
        .route(
            "/{kind}",
            get(handlers::list_recipients).post(handlers::create_recipient),
        )
        .route("/{kind}/export", get(handlers::export_recipients))
        .route("/{kind}/import", post(handlers::import_recipients))
        .route(
            "/{kind}/{id}",
            get(handlers::get_recipient)
                .put(handlers::update_recipient)
                .delete(handlers::delete_recipient),
        )
        .route("/{kind}/{id}/history", get(handlers::recipient_history))
        // Dispatch
        .route("/send-bulk-email", post(handlers::send_bulk_email))
        .route(
            "/send-bulk-email-enhanced",
            post(handlers::send_bulk_email_enhanced),
        )
        .route("/send-combo-bulk", post(handlers::send_combo_bulk))
        .route("/send-phone-sms", post(handlers::send_phone_sms))
        .route("/send-whatsapp-web", post(handlers::send_whatsapp_web))
        .route("/retry-failed-emails", post(handlers::retry_failed_emails))
        // Campaign records
        .route("/invitations", get(handlers::list_invitations))
        .route(
            "/invitations/{id}",
            get(handlers::get_invitation)
                .put(handlers::update_invitation)
                .delete(handlers::delete_invitation),
        )
        .route("/invitations/{id}/logs", get(handlers::invitation_logs))
        // Webhooks (open but HMAC-signed)
        .route(
            "/webhooks/{provider}",
            get(handlers::webhook_info).post(handlers::handle_webhook),
        )
        // Analytics
        .route("/email-analytics", get(handlers::email_analytics))
        .route(
            "/campaign-analytics/{id}",
            get(handlers::campaign_analytics),
        )
        .route(
            "/sync-email-analytics",
            post(handlers::sync_email_analytics),
        )
        // Content production
        .route("/generate-invitation", post(handlers::generate_invitation))
        .route(
            "/generate-short-message",
            post(handlers::generate_short_message),
        )
        // Templates
        .route("/sms-templates", get(handlers::sms_templates))
        .route(
            "/whatsapp-templates",
            get(handlers::whatsapp_templates).post(handlers::render_whatsapp_template),
        )
        // Operational endpoints
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness))
        .route("/live", get(handlers::liveness))
        // Middleware
        .layer(middleware::from_fn(auth_middleware))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
