//! HTTP gateway for CodeRelay.
//!
//! Receives Slack Events API callbacks, verifies their signatures, and hands
//! each event to the turn handler on a background task. Slack expects an
//! acknowledgement within three seconds, so the HTTP response never waits
//! for inference. Redeliveries of an accepted event are acknowledged and
//! dropped, so each event produces at most one turn.
//!
//! Routes:
//! - `GET /health`
//! - `POST /slack/events`
//!
//! Built on Axum.

mod dedup;

use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use coderelay_agent::{InferenceInvoker, TurnHandler};
use coderelay_channels::{Envelope, SignatureVerifier, SlackClient, parse_envelope};
use dedup::RecentEvents;

const TIMESTAMP_HEADER: &str = "X-Slack-Request-Timestamp";
const SIGNATURE_HEADER: &str = "X-Slack-Signature";
const RETRY_HEADER: &str = "X-Slack-Retry-Num";

/// Number of event ids remembered for redelivery detection.
const RECENT_EVENT_CAPACITY: usize = 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub handler: TurnHandler,

    /// Request signature check; `None` accepts unsigned requests
    pub verifier: Option<SignatureVerifier>,

    recent: RecentEvents,
}

impl GatewayState {
    pub fn new(handler: TurnHandler, verifier: Option<SignatureVerifier>) -> Self {
        Self {
            handler,
            verifier,
            recent: RecentEvents::new(RECENT_EVENT_CAPACITY),
        }
    }

    /// Whether this delivery repeats an event already handed to a turn.
    ///
    /// Events are keyed by `event_id`. An event without an id is only
    /// treated as a repeat when Slack marks the request as a retry.
    fn is_redelivery(&self, event_id: Option<&str>, retry: Option<&str>) -> bool {
        match event_id {
            Some(id) => !self.recent.first_delivery(id),
            None => retry.is_some(),
        }
    }
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/slack/events", post(slack_events_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Builds the provider, Slack client and turn handler once and shares them
/// across requests.
pub async fn start(config: coderelay_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = coderelay_providers::build_from_config(&config);
    let slack = Arc::new(SlackClient::from_config(&config.slack)?);
    let invoker = InferenceInvoker::from_config(provider, &config);
    let handler = TurnHandler::new(invoker, slack, &config);

    let verifier = match config.slack.signing_secret.as_deref() {
        Some(secret) if !secret.is_empty() => Some(SignatureVerifier::new(
            secret,
            config.gateway.signature_tolerance_secs,
        )),
        _ => {
            warn!("No Slack signing secret configured; accepting unsigned requests");
            None
        }
    };

    let app = build_router(Arc::new(GatewayState::new(handler, verifier)));

    info!(addr = %addr, model = %config.model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct ChallengeResponse {
    challenge: String,
}

async fn slack_events_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(verifier) = &state.verifier {
        let timestamp = header_str(&headers, TIMESTAMP_HEADER);
        let signature = header_str(&headers, SIGNATURE_HEADER);
        if let Err(e) = verifier.verify(timestamp, signature, &body) {
            warn!(error = %e, "Rejected Slack request");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let retry = header_str(&headers, RETRY_HEADER);
    if let Some(retry) = retry {
        debug!(retry, "Slack redelivery");
    }

    match parse_envelope(&body) {
        Ok(Envelope::Challenge(challenge)) => Json(ChallengeResponse { challenge }).into_response(),
        Ok(Envelope::Event { event_id, event }) => {
            if state.is_redelivery(event_id.as_deref(), retry) {
                info!(event_id = ?event_id, "Dropping redelivered event");
                return StatusCode::OK.into_response();
            }
            let handler = state.handler.clone();
            tokio::spawn(async move {
                handler.handle(event).await;
            });
            StatusCode::OK.into_response()
        }
        Ok(Envelope::Ignored) => StatusCode::OK.into_response(),
        Err(e) => {
            warn!(error = %e, "Undecodable Slack payload");
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
