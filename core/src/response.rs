//! Response classification.
//!
//! Every completed exchange ends up in exactly one [`ApiResult`] shape:
//! the server either delivered the declared payload, explained a failure in
//! its error envelope, or did something else.

use http::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::{ClientError, TransportError};
use crate::http::HttpResponse;
use crate::types::ErrorEnvelope;

/// Status reported in [`ApiResult::UnexpectedError`] when no response was
/// obtained at all.
pub const TRANSPORT_FAILURE_STATUS: u16 = 0;

/// Outcome of a single API call.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum ApiResult<T> {
    Success(T),
    /// The server returned a structured error body.
    ApiError(String),
    /// Anything else: transport failure, non-JSON error, malformed body.
    UnexpectedError { status: u16, message: String },
}

impl<T> ApiResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResult::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            ApiResult::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_success(&self) -> Option<&T> {
        match self {
            ApiResult::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResult<U> {
        match self {
            ApiResult::Success(value) => ApiResult::Success(f(value)),
            ApiResult::ApiError(detail) => ApiResult::ApiError(detail),
            ApiResult::UnexpectedError { status, message } => {
                ApiResult::UnexpectedError { status, message }
            }
        }
    }

    pub(crate) fn unexpected(status: u16, message: impl Into<String>) -> Self {
        ApiResult::UnexpectedError {
            status,
            message: message.into(),
        }
    }
}

fn status_line(status: u16) -> String {
    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason());
    match reason {
        Some(reason) => format!("Error {status} {reason}"),
        None => format!("Error {status}"),
    }
}

fn is_json(response: &HttpResponse) -> bool {
    response
        .header("content-type")
        .is_some_and(|ct| ct.contains("application/json"))
}

/// Parse a success body into the endpoint's declared shape.
pub(crate) fn decode<T: DeserializeOwned>(status: u16, body: &[u8]) -> ApiResult<T> {
    match serde_json::from_slice(body) {
        Ok(value) => ApiResult::Success(value),
        Err(e) => ApiResult::unexpected(
            status,
            format!(
                "{}: invalid response body ({e}): {}",
                status_line(status),
                String::from_utf8_lossy(body)
            ),
        ),
    }
}

/// Classify a completed exchange.
pub fn classify<T: DeserializeOwned>(response: &HttpResponse) -> ApiResult<T> {
    let status = response.status;
    if (200..300).contains(&status) {
        return decode(status, &response.body);
    }

    if is_json(response) {
        if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(&response.body) {
            return ApiResult::ApiError(envelope.errors.detail);
        }
    }

    let body = String::from_utf8_lossy(&response.body);
    ApiResult::unexpected(status, format!("{}: {body}", status_line(status)))
}

/// Fold a transport fault into a result, escalating only an unreadable body
/// on a failed status.
pub fn classify_fault<T>(error: TransportError) -> Result<ApiResult<T>, ClientError> {
    match error {
        TransportError::Connect(message) => Ok(ApiResult::unexpected(
            TRANSPORT_FAILURE_STATUS,
            format!("transport failure: {message}"),
        )),
        TransportError::Body { status, message } if (200..300).contains(&status) => {
            let message = format!("{}: unreadable body: {message}", status_line(status));
            Ok(ApiResult::unexpected(status, message))
        }
        TransportError::Body { status, message } => {
            Err(ClientError::UnreadableErrorBody { status, message })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Data, StarSystem};

    #[test]
    fn ok_with_valid_json_is_success() {
        let response = HttpResponse::json(200, r#"{"data":{"id":1,"name":"Sol"}}"#);
        let result: ApiResult<Data<StarSystem>> = classify(&response);
        let system = result.success().unwrap().data;
        assert_eq!(system.id, 1);
        assert_eq!(system.name, "Sol");
    }

    #[test]
    fn success_does_not_require_content_type() {
        let response = HttpResponse::new(200, r#"{"data":{"id":1,"name":"Sol"}}"#);
        let result: ApiResult<Data<StarSystem>> = classify(&response);
        assert!(result.is_success());
    }

    #[test]
    fn error_envelope_is_api_error() {
        let response = HttpResponse::json(422, r#"{"errors":{"detail":"bad page_size"}}"#);
        let result: ApiResult<Data<StarSystem>> = classify(&response);
        assert_eq!(result, ApiResult::ApiError("bad page_size".to_string()));
    }

    #[test]
    fn json_content_type_with_charset_is_recognized() {
        let response = HttpResponse::new(404, r#"{"errors":{"detail":"Not Found"}}"#)
            .with_header("Content-Type", "application/json; charset=utf-8");
        let result: ApiResult<Data<StarSystem>> = classify(&response);
        assert_eq!(result, ApiResult::ApiError("Not Found".to_string()));
    }

    #[test]
    fn html_error_is_unexpected() {
        let response = HttpResponse::new(500, "<html><body>Oops</body></html>")
            .with_header("content-type", "text/html");
        let result: ApiResult<Data<StarSystem>> = classify(&response);
        match result {
            ApiResult::UnexpectedError { status, message } => {
                assert_eq!(status, 500);
                assert!(message.contains("500"), "{message}");
                assert!(message.contains("Oops"), "{message}");
            }
            other => panic!("expected UnexpectedError, got {other:?}"),
        }
    }

    #[test]
    fn json_error_without_envelope_is_unexpected() {
        let response = HttpResponse::json(400, r#"{"message":"nope"}"#);
        let result: ApiResult<Data<StarSystem>> = classify(&response);
        assert!(matches!(result, ApiResult::UnexpectedError { status: 400, .. }));
    }

    #[test]
    fn envelope_without_json_content_type_is_unexpected() {
        let response = HttpResponse::new(422, r#"{"errors":{"detail":"bad"}}"#);
        let result: ApiResult<Data<StarSystem>> = classify(&response);
        assert!(matches!(result, ApiResult::UnexpectedError { status: 422, .. }));
    }

    #[test]
    fn ok_with_wrong_shape_is_unexpected() {
        let response = HttpResponse::json(200, r#"{"items":[]}"#);
        let result: ApiResult<Data<StarSystem>> = classify(&response);
        assert!(matches!(result, ApiResult::UnexpectedError { status: 200, .. }));
    }

    #[test]
    fn connect_fault_uses_sentinel_status() {
        let result: ApiResult<()> =
            classify_fault(TransportError::Connect("connection refused".to_string())).unwrap();
        match result {
            ApiResult::UnexpectedError { status, message } => {
                assert_eq!(status, TRANSPORT_FAILURE_STATUS);
                assert!(message.contains("connection refused"));
            }
            other => panic!("expected UnexpectedError, got {other:?}"),
        }
    }

    #[test]
    fn unreadable_body_on_failure_is_fatal() {
        let err = classify_fault::<()>(TransportError::Body {
            status: 502,
            message: "reset".to_string(),
        })
        .unwrap_err();
        assert_eq!(
            err,
            ClientError::UnreadableErrorBody {
                status: 502,
                message: "reset".to_string()
            }
        );
    }

    #[test]
    fn unreadable_body_on_success_is_unexpected() {
        let result = classify_fault::<()>(TransportError::Body {
            status: 200,
            message: "truncated".to_string(),
        })
        .unwrap();
        assert!(matches!(result, ApiResult::UnexpectedError { status: 200, .. }));
    }

    #[test]
    fn map_preserves_failures() {
        let failed: ApiResult<u32> = ApiResult::ApiError("bad".to_string());
        assert_eq!(failed.map(|v| v + 1), ApiResult::ApiError("bad".to_string()));
        assert_eq!(ApiResult::Success(1).map(|v| v + 1), ApiResult::Success(2));
    }
}
