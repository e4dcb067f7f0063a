use axum::{
    body::Body,
    extract::State,
    response::Response,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;

use crate::config::Config;
use crate::error::AppError;
use crate::proxy::client::{self, HttpClient};
use crate::proxy::lines::LineDecoder;

pub const SILICONFLOW_MODEL: &str = "Qwen/Qwen2-7B-Instruct";

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: SqlitePool,
    pub client: HttpClient,
}

type FrameSender = mpsc::Sender<Result<Bytes, std::io::Error>>;

pub async fn siliconflow_stream(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let api_key = state
        .config
        .siliconflow_key
        .as_deref()
        .ok_or(AppError::MissingCredential)?;

    let payload = prepare_payload(&body)?;
    let timeout = state.config.upstream_timeout;

    let upstream = client::open_stream(
        &state.client,
        &state.config.siliconflow_url,
        api_key,
        payload.to_string(),
        timeout,
    )
    .await?;

    let status = upstream.status();
    if !status.is_success() {
        let detail = read_error_body(upstream, timeout).await;
        tracing::warn!("SiliconFlow returned {}: {}", status, detail);
        let message = format!("API request failed: {} - {}", status.as_u16(), detail);
        return sse_response(Body::from(sse_frame(&message)));
    }

    tracing::info!("Relaying SiliconFlow stream");
    sse_response(relay(upstream, timeout))
}

/// Validates the caller's body and pins the model and streaming flag.
fn prepare_payload(body: &[u8]) -> Result<Value, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::EmptyBody);
    }

    let mut payload: Value = serde_json::from_slice(body)?;
    if is_empty_value(&payload) {
        return Err(AppError::EmptyBody);
    }

    let object = payload.as_object_mut().ok_or(AppError::NotAnObject)?;
    object.insert("model".to_string(), Value::from(SILICONFLOW_MODEL));
    object.insert("stream".to_string(), Value::Bool(true));
    Ok(payload)
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

async fn read_error_body(upstream: hyper::Response<Incoming>, timeout: Duration) -> String {
    match tokio::time::timeout(timeout, upstream.into_body().collect()).await {
        Ok(Ok(collected)) => String::from_utf8_lossy(&collected.to_bytes()).into_owned(),
        Ok(Err(e)) => format!("<failed to read body: {}>", e),
        Err(_) => "<timed out reading body>".to_string(),
    }
}

fn sse_frame(line: &str) -> Bytes {
    Bytes::from(format!("data: {}\n\n", line))
}

fn sse_response(body: Body) -> Result<Response, AppError> {
    Response::builder()
        .header("content-type", "text/event-stream")
        .header("cache-control", "no-cache")
        .header("connection", "keep-alive")
        .header("x-accel-buffering", "no")
        .body(body)
        .map_err(|e| AppError::Http(e.to_string()))
}

/// Spawns the relay task and returns the streaming body it feeds.
///
/// The task owns the upstream response, so the connection is released on every
/// exit: clean end, read error, idle timeout or client disconnect.
fn relay(upstream: hyper::Response<Incoming>, idle_timeout: Duration) -> Body {
    let (tx, rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(100);

    tokio::spawn(async move {
        let mut frame_stream = http_body_util::BodyStream::new(upstream.into_body());
        let mut decoder = LineDecoder::default();

        loop {
            let next = tokio::select! {
                _ = tx.closed() => {
                    tracing::warn!("Client disconnected during streaming");
                    return;
                }
                next = tokio::time::timeout(idle_timeout, frame_stream.next()) => match next {
                    Ok(next) => next,
                    Err(_) => {
                        tracing::warn!("Upstream idle for {}s, closing stream", idle_timeout.as_secs());
                        return;
                    }
                },
            };

            match next {
                Some(Ok(frame)) => {
                    // Trailers carry nothing to relay.
                    let Ok(data) = frame.into_data() else {
                        continue;
                    };
                    let lines = match decoder.push(&data) {
                        Ok(lines) => lines,
                        Err(e) => {
                            tracing::error!("Dropping upstream stream: {}", e);
                            return;
                        }
                    };
                    for line in lines {
                        if !forward(&tx, &line).await {
                            tracing::warn!("Client disconnected during streaming");
                            return;
                        }
                    }
                }
                Some(Err(e)) => {
                    tracing::error!("Error reading upstream stream: {}", e);
                    return;
                }
                None => break,
            }
        }

        if let Some(line) = decoder.finish() {
            forward(&tx, &line).await;
        }
        tracing::debug!("Upstream stream finished");
    });

    Body::from_stream(tokio_stream::wrappers::ReceiverStream::new(rx))
}

/// Returns false once the client side of the channel has gone away.
async fn forward(tx: &FrameSender, line: &str) -> bool {
    tx.send(Ok(sse_frame(line))).await.is_ok()
}
