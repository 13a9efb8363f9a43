use axum::{
    Form, Json, Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::ask::{HttpAnswerSource, ResponseFetcher};
use crate::config::AppConfig;
use crate::session::Session;
use crate::ui::Renderer;
use crate::widget::{KeyPress, Submission, Visibility, WidgetSnapshot, WidgetUpdate};

/// How often idle sessions are swept.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

type HandlerError = (StatusCode, String);

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let source = HttpAnswerSource::new(&config.widget.endpoint, config.widget.request_timeout())?;
    info!(
        name: "widget.config.loaded",
        endpoint = %source.endpoint(),
        reply_delay_ms = config.widget.reply_delay_ms,
        keyword_filter = config.widget.keyword_filter.enabled,
        "Widget configuration loaded"
    );

    let fetcher = ResponseFetcher::new(Arc::new(source));
    let state = AppState::new(Arc::clone(&config), fetcher, Renderer::new()?);

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sessions.cleanup_expired();
            if removed > 0 {
                info!(removed, remaining = sessions.len(), "Expired widget sessions removed");
            }
        }
    });

    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the router serving the widget page and its event routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/widget/{id}/toggle", post(toggle_handler))
        .route("/widget/{id}/open", post(open_handler))
        .route("/widget/{id}/close", post(close_handler))
        .route("/widget/{id}/input", post(input_handler))
        .route("/widget/{id}/key", post(key_handler))
        .route("/widget/{id}/send", post(send_handler))
        .route("/widget/{id}/transcript", get(transcript_handler))
        .route("/widget/{id}/state", get(state_handler))
        .route("/widget/{id}/events", get(events_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Page
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - A page with a fresh widget.
async fn index_handler(State(state): State<AppState>) -> Result<Html<String>, HandlerError> {
    let session = state.sessions.create();
    tracing::debug!(session_id = %session.id(), "Created widget session");

    let snapshot = session.widget().snapshot();
    state
        .renderer
        .page(
            session.id(),
            &snapshot,
            state.config.widget.desktop_min_width,
        )
        .map(Html)
        .map_err(render_failed)
}

// ─────────────────────────────────────────────────────────────────────────────
// Visibility
// ─────────────────────────────────────────────────────────────────────────────

/// POST /widget/:id/toggle - Flip the panel.
async fn toggle_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, HandlerError> {
    let session = lookup(&state, &id)?;
    let visibility = session.widget().toggle();
    visibility_fragment(&state, &session, visibility)
}

/// POST /widget/:id/open - Show the panel.
async fn open_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, HandlerError> {
    let session = lookup(&state, &id)?;
    let visibility = session.widget().open();
    visibility_fragment(&state, &session, visibility)
}

/// POST /widget/:id/close - Hide the panel.
async fn close_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, HandlerError> {
    let session = lookup(&state, &id)?;
    let visibility = session.widget().close();
    visibility_fragment(&state, &session, visibility)
}

fn visibility_fragment(
    state: &AppState,
    session: &Session,
    visibility: Visibility,
) -> Result<Html<String>, HandlerError> {
    state
        .renderer
        .visibility(session.id(), visibility)
        .map(Html)
        .map_err(render_failed)
}

// ─────────────────────────────────────────────────────────────────────────────
// Input
// ─────────────────────────────────────────────────────────────────────────────

/// Form body carrying the textarea value.
#[derive(Debug, Deserialize)]
struct MessageForm {
    #[serde(default)]
    message: String,
}

/// Form body for a key-down in the textarea.
#[derive(Debug, Deserialize)]
struct KeyForm {
    #[serde(default)]
    message: String,
    key: String,
    #[serde(default)]
    shift: bool,
    #[serde(default)]
    ctrl: bool,
    #[serde(default)]
    alt: bool,
    #[serde(default)]
    meta: bool,
    viewport_width: u32,
}

/// Result of an input event.
#[derive(Debug, Serialize)]
struct InputResponse {
    height: u32,
}

/// Result of a send attempt.
#[derive(Debug, Serialize)]
struct SendResponse {
    submitted: bool,
    /// Correlation token of the accepted question.
    token: Option<String>,
    /// Transcript id of the user's bubble.
    entry: Option<usize>,
    /// Input height after the send.
    height: u32,
}

/// POST /widget/:id/input - Input-change event; returns the new height.
async fn input_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<MessageForm>,
) -> Result<Response, HandlerError> {
    let session = lookup(&state, &id)?;
    let height = session.widget().input(form.message);
    Ok(with_trigger(
        "input-resized",
        height,
        Json(InputResponse { height }),
    ))
}

/// POST /widget/:id/key - Key-down event; Enter may submit.
async fn key_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<KeyForm>,
) -> Result<Response, HandlerError> {
    let session = lookup(&state, &id)?;
    let widget = session.widget();
    let key = KeyPress {
        key: form.key,
        shift: form.shift,
        ctrl: form.ctrl,
        alt: form.alt,
        meta: form.meta,
    };

    if !key.is_send_shortcut(form.viewport_width, widget.settings().desktop_min_width) {
        // Ordinary text entry; the input event carries the value.
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    widget.input(form.message);
    let submission = widget.key_down(&key, form.viewport_width);
    Ok(send_response(&session, submission))
}

/// POST /widget/:id/send - Send-button activation.
async fn send_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<MessageForm>,
) -> Result<Response, HandlerError> {
    let session = lookup(&state, &id)?;
    let submission = session.widget().send_message(form.message);
    Ok(send_response(&session, submission))
}

fn send_response(session: &Session, submission: Option<Submission>) -> Response {
    let height = session.widget().snapshot().input_height;
    let body = match submission {
        Some(submission) => {
            tracing::debug!(
                session_id = %session.id(),
                token = %submission.token,
                "Question accepted"
            );
            SendResponse {
                submitted: true,
                token: Some(submission.token.to_string()),
                entry: Some(submission.outgoing.0),
                height,
            }
        }
        None => SendResponse {
            submitted: false,
            token: None,
            entry: None,
            height,
        },
    };
    with_trigger("input-reset", height, Json(body))
}

/// Attach an `HX-Trigger` header firing `event` with the input height.
fn with_trigger(event: &str, height: u32, body: impl IntoResponse) -> Response {
    let mut detail = serde_json::Map::new();
    detail.insert(event.to_string(), serde_json::json!({ "height": height }));
    let trigger = serde_json::Value::Object(detail).to_string();
    ([("HX-Trigger", trigger)], body).into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Transcript
// ─────────────────────────────────────────────────────────────────────────────

/// GET /widget/:id/transcript - All bubbles as an HTML fragment.
async fn transcript_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, HandlerError> {
    let session = lookup(&state, &id)?;
    let snapshot = session.widget().snapshot();
    state
        .renderer
        .transcript(&snapshot.entries)
        .map(Html)
        .map_err(render_failed)
}

/// GET /widget/:id/state - Widget snapshot as JSON.
async fn state_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WidgetSnapshot>, HandlerError> {
    let session = lookup(&state, &id)?;
    Ok(Json(session.widget().snapshot()))
}

/// GET /widget/:id/events - SSE stream of transcript changes.
///
/// The first frame always carries the full transcript, so a stream that
/// connects late or reconnects after a drop never misses an entry.
async fn events_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, HandlerError> {
    let session = lookup(&state, &id)?;
    let widget = session.widget().clone();
    let renderer = Arc::clone(&state.renderer);
    let mut updates = BroadcastStream::new(widget.subscribe());

    // Subscribe first: anything missing from the snapshot is still queued.
    let current = widget.snapshot().entries;
    let known = current.len();
    let catch_up = renderer.transcript(&current).map(|html| chatbox_frame(&html));

    tracing::info!(session_id = %id, entries = known, "Starting widget event stream");

    let sse_stream = async_stream::stream! {
        match catch_up {
            Ok(html) => yield Ok::<String, Infallible>(sse_event("entry", &html)),
            Err(e) => tracing::error!(session_id = %id, error = %e, "Failed to render transcript"),
        }

        while let Some(update) = updates.next().await {
            let frame = match update {
                // Already part of the catch-up frame.
                Ok(WidgetUpdate::EntryAppended { entry }) if entry.id.0 < known => continue,
                Ok(WidgetUpdate::EntryAppended { entry }) => renderer.entry(&entry, false),
                Ok(WidgetUpdate::EntryUpdated { entry }) => renderer.entry(&entry, true),
                Ok(WidgetUpdate::Visibility { .. } | WidgetUpdate::InputReset { .. }) => continue,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(session_id = %id, skipped, "Event stream lagged, resending transcript");
                    renderer.transcript(&widget.snapshot().entries).map(|html| chatbox_frame(&html))
                }
            };

            match frame {
                Ok(html) => yield Ok::<String, Infallible>(sse_event("entry", &html)),
                Err(e) => tracing::error!(session_id = %id, error = %e, "Failed to render update"),
            }
        }
    };

    Ok(build_sse_response(Body::from_stream(sse_stream)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn lookup(state: &AppState, id: &str) -> Result<Session, HandlerError> {
    state.sessions.get(id).ok_or_else(|| {
        tracing::debug!(session_id = %id, "Widget session not found");
        (StatusCode::NOT_FOUND, format!("Unknown widget: {id}"))
    })
}

fn render_failed(e: handlebars::RenderError) -> HandlerError {
    tracing::error!(error = %e, "Failed to render widget markup");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Failed to render: {e}"),
    )
}

/// Wrap a rendered transcript so it replaces the whole chat box.
fn chatbox_frame(html: &str) -> String {
    format!(r#"<ul id="chatbox" hx-swap-oob="innerHTML">{html}</ul>"#)
}

/// Format one SSE frame. Multi-line payloads get one `data:` line each.
fn sse_event(event: &str, data: &str) -> String {
    let mut frame = format!("event: {event}\n");
    for line in data.lines() {
        frame.push_str("data: ");
        frame.push_str(line);
        frame.push('\n');
    }
    frame.push('\n');
    frame
}

fn build_sse_response(body: Body) -> Response {
    let mut resp = Response::new(body);
    let h = resp.headers_mut();
    h.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    h.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    h.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    h.insert("X-Accel-Buffering", HeaderValue::from_static("no"));
    resp
}
