use hyper::body::Incoming;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Method, Request, Response};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

use crate::error::AppError;

pub type HttpClient = Client<hyper_tls::HttpsConnector<HttpConnector>, String>;

pub fn create_client() -> HttpClient {
    let https = hyper_tls::HttpsConnector::new();
    Client::builder(TokioExecutor::new()).build(https)
}

/// Sends the prepared chat payload upstream and waits for the response head.
///
/// The returned response owns the upstream connection; it is released when the
/// response (or its body) is dropped.
pub async fn open_stream(
    client: &HttpClient,
    url: &str,
    api_key: &str,
    payload: String,
    timeout: Duration,
) -> Result<Response<Incoming>, AppError> {
    let target_uri: hyper::Uri = url
        .parse()
        .map_err(|e| AppError::Http(format!("Invalid URL: {}", e)))?;

    let req = Request::builder()
        .method(Method::POST)
        .uri(target_uri)
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {}", api_key))
        .body(payload)
        .map_err(|e| AppError::Http(e.to_string()))?;

    match tokio::time::timeout(timeout, client.request(req)).await {
        Ok(result) => result.map_err(|e| AppError::Upstream(e.to_string())),
        Err(_) => Err(AppError::Upstream(format!(
            "no response within {}s",
            timeout.as_secs()
        ))),
    }
}
