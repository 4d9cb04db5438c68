use std::time::Instant;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use crate::handler::{IssueHandler, StringOrList};

pub const SEARCH_PATH: &str = "/jira/search";
pub const ISSUE_KEYS_PARAM: &str = "issueKeys";

/// Dispatch one inbound request. Always produces a response.
pub async fn route<B>(handler: &IssueHandler, req: Request<B>) -> Response<Full<Bytes>> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (req.method(), path.as_str()) {
        (&Method::GET, SEARCH_PATH) => search(handler, req.uri().query()).await,
        (_, SEARCH_PATH) => {
            let mut response = error_response(
                StatusCode::METHOD_NOT_ALLOWED,
                &format!("Method {} is not supported for {}", method, SEARCH_PATH),
            );
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("GET"));
            response
        }
        _ => error_response(StatusCode::NOT_FOUND, &format!("No route for {}", path)),
    };

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Handled request"
    );

    response
}

async fn search(handler: &IssueHandler, query: Option<&str>) -> Response<Full<Bytes>> {
    let values = match issue_keys_param(query) {
        Some(values) => values,
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Required request parameter '{}' is missing", ISSUE_KEYS_PARAM),
            )
        }
    };

    let batch = handler.handle(StringOrList::List(values)).await;
    json_response(StatusCode::OK, &batch)
}

/// Every `issueKeys` value in the query string, or `None` when the parameter
/// does not appear at all.
pub fn issue_keys_param(query: Option<&str>) -> Option<Vec<String>> {
    let query = query?;
    let values: Vec<String> = url::form_urlencoded::parse(query.as_bytes())
        .filter(|(name, _)| name == ISSUE_KEYS_PARAM)
        .map(|(_, value)| value.into_owned())
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, &json!({ "error": message }))
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let (status, bytes) = match serde_json::to_vec(body) {
        Ok(bytes) => (status, Bytes::from(bytes)),
        Err(e) => {
            error!(error = %e, "Failed to serialize response body");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(br#"{"error":"Internal server error"}"#),
            )
        }
    };

    let mut response = Response::new(Full::new(bytes));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
