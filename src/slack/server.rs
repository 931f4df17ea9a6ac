use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use tracing::{debug, error, info, warn};

use super::ReplySink;
use super::events::{Envelope, Event, Mention};
use super::signature::{self, SIGNATURE_HEADER, SignatureError, TIMESTAMP_HEADER};
use crate::core::bridge::MentionBridge;

const RETRY_HEADER: &str = "x-slack-retry-num";
const RETRY_REASON_HEADER: &str = "x-slack-retry-reason";

/// State shared by the events route
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<MentionBridge>,
    pub sink: Arc<dyn ReplySink>,
    pub signing_secret: Arc<str>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/slack/events", post(events))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// POST /slack/events
// ---------------------------------------------------------------------------

async fn events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    process(&state, &headers, &body, chrono::Utc::now().timestamp())
}

/// Verify, decode and dispatch one Events API request.
///
/// Mentions are answered on a spawned task so Slack gets its acknowledgement
/// right away.
pub fn process(state: &AppState, headers: &HeaderMap, body: &[u8], now: i64) -> (StatusCode, String) {
    if let Err(e) = check_signature(&state.signing_secret, headers, body, now) {
        warn!(err = %e, "rejected Slack request");
        return (StatusCode::UNAUTHORIZED, e.to_string());
    }

    // A timed-out delivery did reach us and is already being answered. Other
    // retries (connection failures, error responses) never did.
    if let Some(retry) = header(headers, RETRY_HEADER) {
        let reason = header(headers, RETRY_REASON_HEADER).unwrap_or("-");
        if reason == "http_timeout" {
            debug!(retry, reason, "ignoring Slack retry");
            return (StatusCode::OK, String::new());
        }
        info!(retry, reason, "processing Slack retry");
    }

    let envelope = match Envelope::parse(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(err = %e, "malformed Slack event payload");
            return (StatusCode::BAD_REQUEST, "malformed event payload".to_string());
        }
    };

    match envelope {
        Envelope::UrlVerification { challenge } => {
            info!("answering Slack url_verification");
            (StatusCode::OK, challenge)
        }
        Envelope::EventCallback {
            event_id,
            event: Event::AppMention(mention),
        } => {
            info!(
                event_id = event_id.as_deref().unwrap_or("-"),
                channel = %mention.channel,
                user = mention.user.as_deref().unwrap_or("-"),
                "app_mention received"
            );
            let bridge = state.bridge.clone();
            let sink = state.sink.clone();
            tokio::spawn(async move {
                handle_mention(&bridge, sink.as_ref(), &mention).await;
            });
            (StatusCode::OK, String::new())
        }
        Envelope::EventCallback { .. } | Envelope::Other => {
            debug!("ignoring unsupported Slack event");
            (StatusCode::OK, String::new())
        }
    }
}

/// Generate a reply for a mention and post it back to its conversation.
pub async fn handle_mention(bridge: &MentionBridge, sink: &dyn ReplySink, mention: &Mention) {
    let reply = bridge.reply_to(&mention.text).await;

    if reply.trim().is_empty() {
        info!(channel = %mention.channel, "backend returned no text, nothing posted");
        return;
    }

    if let Err(e) = sink
        .say(&mention.channel, mention.thread_ts.as_deref(), &reply)
        .await
    {
        error!(channel = %mention.channel, err = %e, "failed to post reply");
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn check_signature(
    signing_secret: &str,
    headers: &HeaderMap,
    body: &[u8],
    now: i64,
) -> Result<(), SignatureError> {
    let timestamp =
        header(headers, TIMESTAMP_HEADER).ok_or(SignatureError::MissingHeader(TIMESTAMP_HEADER))?;
    let sent =
        header(headers, SIGNATURE_HEADER).ok_or(SignatureError::MissingHeader(SIGNATURE_HEADER))?;
    signature::verify(signing_secret, timestamp, body, sent, now)
}
