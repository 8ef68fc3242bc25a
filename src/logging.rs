//! Middleware for logging requests and responses.

use axum::{extract::Request, http::header::CONTENT_TYPE, middleware::Next, response::Response};

const LOG_BODY_LENGTH_LIMIT: usize = 256;

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level. If the
/// response body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and logged in full at the `debug` level. Password fields in
/// JSON request bodies are redacted.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (headers, body_text) = extract_header_and_body_text_from_request(request).await;

    let is_json = headers
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if is_json {
        let display_text = redact_json_field(&body_text, "password");
        let display_text = redact_json_field(&display_text, "new_password");
        let display_text = redact_json_field(&display_text, "confirm_password");
        let display_text = redact_json_field(&display_text, "old_password");
        log_request(&headers, &display_text);
    } else {
        log_request(&headers, &body_text);
    }

    let request = Request::from_parts(headers, body_text.into());
    let response = next.run(request).await;

    let (headers, body_text) = extract_header_and_body_text_from_response(response).await;
    log_response(&headers, &body_text);

    Response::from_parts(headers, body_text.into())
}

/// Replace the string value of `field_name` in a JSON object body with
/// asterisks. Operates on the raw text so that unparseable bodies are still
/// logged (unredacted fields only appear in parseable bodies anyway).
fn redact_json_field(body_text: &str, field_name: &str) -> String {
    let Ok(mut value) = serde_json::from_str::<serde_json::Value>(body_text) else {
        return body_text.to_string();
    };

    if let Some(object) = value.as_object_mut()
        && object.contains_key(field_name)
    {
        object.insert(
            field_name.to_string(),
            serde_json::Value::String("********".to_string()),
        );
    }

    value.to_string()
}

async fn extract_header_and_body_text_from_request(
    request: Request,
) -> (axum::http::request::Parts, String) {
    let (headers, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

    (headers, String::from_utf8_lossy(&body_bytes).to_string())
}

async fn extract_header_and_body_text_from_response(
    response: Response,
) -> (axum::http::response::Parts, String) {
    let (headers, body) = response.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

    (headers, String::from_utf8_lossy(&body_bytes).to_string())
}

/// The longest prefix of `body` within the length limit that ends on a
/// character boundary. Bodies here are mostly Chinese text, so a plain
/// byte slice could split a character and panic.
fn truncated(body: &str) -> &str {
    let end = (0..=LOG_BODY_LENGTH_LIMIT)
        .rfind(|&index| body.is_char_boundary(index))
        .unwrap_or(0);

    &body[..end]
}

fn log_request(headers: &axum::http::request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {} {}\nbody: {:}...",
            headers.method,
            headers.uri,
            truncated(body)
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!(
            "Received request: {} {}\nbody: {body:?}",
            headers.method,
            headers.uri
        );
    }
}

fn log_response(headers: &axum::http::response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending response: {}\nbody: {:}...",
            headers.status,
            truncated(body)
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {}\nbody: {body:?}", headers.status);
    }
}

#[cfg(test)]
mod redact_tests {
    use super::redact_json_field;

    #[test]
    fn redacts_password_value() {
        let body = r#"{"username":"admin","password":"hunter2"}"#;

        let redacted = redact_json_field(body, "password");

        assert!(!redacted.contains("hunter2"));
        assert!(redacted.contains("admin"));
    }

    #[test]
    fn leaves_other_bodies_alone() {
        let body = r#"{"name":"张三"}"#;

        let redacted = redact_json_field(body, "password");

        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&redacted).unwrap(),
            serde_json::from_str::<serde_json::Value>(body).unwrap()
        );
    }

    #[test]
    fn passes_through_unparseable_text() {
        assert_eq!(redact_json_field("not json", "password"), "not json");
    }

    #[test]
    fn truncation_respects_character_boundaries() {
        let body = "礼".repeat(200);

        let prefix = super::truncated(&body);

        assert!(prefix.len() <= super::LOG_BODY_LENGTH_LIMIT);
        assert!(body.starts_with(prefix));
    }
}
