//! Gateway server implementation

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use bindgate_auth::{DirectorySettings, LdapAuthenticator};
use bindgate_core::{config::GatewayConfig, Error, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::{info, warn};

use crate::metrics::{metrics_handler, metrics_middleware, MetricsRecorder};
use crate::routes;

/// Application state shared across handlers
#[derive(Clone, Default)]
pub struct AppState {
    /// `None` when the directory configuration is incomplete
    pub authenticator: Option<Arc<LdapAuthenticator>>,
    pub metrics: Option<Arc<MetricsRecorder>>,
}

impl AppState {
    /// Build state from configuration.
    ///
    /// Missing directory settings are not fatal: the server starts and
    /// answers authentication requests with 500 until fixed.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let authenticator = match DirectorySettings::from_section(&config.ldap) {
            Ok(settings) => {
                info!(
                    server = %settings.server_url,
                    base_dn = %settings.base_dn,
                    start_tls = settings.start_tls,
                    "LDAP authenticator configured"
                );
                Some(Arc::new(LdapAuthenticator::new(settings)))
            }
            Err(Error::MissingConfiguration) => {
                warn!("LDAP configuration is missing; authentication requests will fail");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            authenticator,
            metrics: None,
        })
    }

    pub fn with_authenticator(mut self, authenticator: LdapAuthenticator) -> Self {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsRecorder) -> Self {
        self.metrics = Some(Arc::new(metrics));
        self
    }
}

/// Build the gateway router
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/healthz", get(routes::healthz))
        .route("/auth/ldap", post(routes::auth_ldap));

    if state.metrics.is_some() {
        router = router
            .route("/metrics", get(metrics_handler))
            .layer(middleware::from_fn(metrics_middleware));
    }

    router
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(state)
}

/// Gateway Server
pub struct GatewayServer {
    config: GatewayConfig,
    metrics: Option<MetricsRecorder>,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            metrics: None,
        }
    }

    /// Expose Prometheus metrics at `/metrics`
    pub fn with_metrics(mut self, metrics: MetricsRecorder) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn run(self) -> Result<()> {
        let mut state = AppState::from_config(&self.config)?;
        if let Some(metrics) = self.metrics {
            state = state.with_metrics(metrics);
        }

        let app = create_router(state);
        let addr = self.config.server.listen_address();

        let listener = TcpListener::bind(&addr).await?;

        info!("Bindgate listening on http://{}", addr);
        info!("Authentication endpoint at http://{}/auth/ldap", addr);

        axum::serve(listener, app).await?;
        Ok(())
    }
}
