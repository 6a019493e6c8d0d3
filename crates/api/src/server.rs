//! HTTP server and metrics exporter startup.

use crate::handlers::AppState;
use crate::router::build_router;
use invite_channels::email::{EmailProvider, StubEmailTransport};
use invite_channels::sms::{SmsGateway, StubSmsTransport};
use invite_channels::whatsapp::WhatsAppLinker;
use invite_content::{ApiTextModel, InviteGenerator};
use invite_core::config::AppConfig;
use invite_directory::DirectoryStore;
use invite_dispatch::{CampaignDispatcher, CampaignStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub struct ApiServer {
    config: Arc<AppConfig>,
    state: AppState,
}

impl ApiServer {
    /// Wire the full application: stores, providers, dispatcher, handlers.
    pub fn new(config: AppConfig) -> Self {
        let config = Arc::new(config);
        let directory = Arc::new(DirectoryStore::new());
        let store = Arc::new(CampaignStore::new());

        let email = EmailProvider::new(config.email.clone(), Box::new(StubEmailTransport));
        let sms = SmsGateway::new(config.sms.clone(), Box::new(StubSmsTransport));
        let whatsapp = WhatsAppLinker::new(config.whatsapp.clone());
        let dispatcher = Arc::new(CampaignDispatcher::new(
            directory.clone(),
            store.clone(),
            email,
            sms,
            whatsapp,
        ));
        let generator = Arc::new(InviteGenerator::new(Box::new(ApiTextModel::new(
            config.generator.clone(),
        ))));

        let state = AppState {
            config: config.clone(),
            directory,
            store,
            dispatcher,
            generator,
            start_time: Instant::now(),
        };
        Self { config, state }
    }

    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = build_router(self.state.clone());

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);
        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;
        Ok(())
    }

    /// Start the Prometheus exporter on the metrics port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install_recorder()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");

        // Keep the recorder alive for the process lifetime.
        std::mem::forget(handle);
        Ok(())
    }
}
