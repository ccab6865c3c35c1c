use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    Json,
};

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::app::errors::{self, ApiError};
use crate::app::dto;
use crate::config::AppConfig;

pub async fn health() -> Json<dto::HealthResponse> {
    Json(dto::HealthResponse {
        status: "ok",
        message: "Backend is running 🚀",
    })
}

/// Bytes escaped when a captured value is put back into a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Short-link redirect into the customer frontend: `/r/<data>` to `{FRONTEND_URL}/r/<data>`.
///
/// `data` arrives percent-decoded, so it is re-encoded before it goes into `Location`.
pub async fn frontend_redirect(
    Extension(config): Extension<Arc<AppConfig>>,
    Path(data): Path<String>,
) -> Result<Response, ApiError> {
    let frontend_url = config
        .frontend_url
        .as_deref()
        .ok_or_else(|| ApiError::Internal("Frontend URL not configured".to_string()))?;

    let location = format!("{frontend_url}/r/{}", utf8_percent_encode(&data, PATH_SEGMENT));
    let location = HeaderValue::from_str(&location).map_err(|e| {
        tracing::warn!(error = %e, "unusable redirect location");
        ApiError::Internal("Invalid redirect location".to_string())
    })?;

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

pub async fn not_found() -> Response {
    errors::json_error(StatusCode::NOT_FOUND, "Not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(data: &str) -> String {
        utf8_percent_encode(data, PATH_SEGMENT).to_string()
    }

    #[test]
    fn plain_segments_pass_through() {
        assert_eq!(encode("tbl-42"), "tbl-42");
        assert_eq!(encode("a.b_c~d"), "a.b_c~d");
    }

    #[test]
    fn unsafe_bytes_are_escaped() {
        assert_eq!(encode("a b"), "a%20b");
        assert_eq!(encode("x\ny"), "x%0Ay");
        assert_eq!(encode("a/b?c#d"), "a%2Fb%3Fc%23d");
        assert_eq!(encode("100%"), "100%25");
        assert_eq!(encode("café"), "caf%C3%A9");
    }
}
