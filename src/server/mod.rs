//! HTTP surface of the relay
//!
//! Health and readiness checks, the token endpoint, and the image/video
//! generation endpoints used by the demo front ends.

pub mod handlers;

use crate::auth::{MetadataTokenProvider, StaticTokenProvider, TokenProvider};
use crate::models::{Config, CredentialSource};
use crate::relay::Relay;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

/// Room for multipart framing and text fields on top of the video itself.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Shared, immutable state handed to every handler.
pub struct AppState {
    pub relay: Relay,
    pub tokens: Option<Arc<dyn TokenProvider>>,
    pub api_key_configured: bool,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        relay: Relay,
        tokens: Option<Arc<dyn TokenProvider>>,
        api_key_configured: bool,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            relay,
            tokens,
            api_key_configured,
            max_upload_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        // Reuse one HTTP connection pool across provider clients.
        let http_client = reqwest::Client::new();

        let tokens: Option<Arc<dyn TokenProvider>> = match &config.credentials {
            CredentialSource::Static(token) => {
                info!("Credential provider: static access token");
                Some(Arc::new(StaticTokenProvider::new(token.clone())))
            }
            CredentialSource::MetadataServer => {
                info!("Credential provider: metadata server");
                Some(Arc::new(MetadataTokenProvider::new_with_client(
                    http_client.clone(),
                )))
            }
            CredentialSource::None => None,
        };

        let relay = Relay::from_config(config, http_client, tokens.clone());

        Self::new(
            relay,
            tokens,
            config.gemini_api_key.is_some(),
            config.max_upload_bytes,
        )
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/api/auth/token", post(handlers::auth_token))
        .route("/api/image/generate", post(handlers::image_generate))
        .route("/api/video/upload", post(handlers::video_upload))
        .route("/api/video/generate", post(handlers::video_generate))
        .route(
            "/api/video/generate-from-uploaded",
            post(handlers::video_generate_from_uploaded),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %Uuid::new_v4(),
                )
            }),
        )
        .with_state(state)
}
