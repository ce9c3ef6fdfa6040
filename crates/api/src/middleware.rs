use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use softgate_auth::JwtValidator;

use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_token(req.headers(), req.uri())?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "rejected token");
        StatusCode::UNAUTHORIZED
    })?;

    req.extensions_mut()
        .insert(PrincipalContext::new(claims.sub, claims.roles));

    Ok(next.run(req).await)
}

/// Bearer header first; browsers cannot set headers on a WebSocket upgrade,
/// so a `token` query parameter is accepted as well.
fn extract_token<'a>(headers: &'a HeaderMap, uri: &'a Uri) -> Result<&'a str, StatusCode> {
    if let Some(header) = headers.get(axum::http::header::AUTHORIZATION) {
        let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(StatusCode::UNAUTHORIZED)?
            .trim();
        return non_empty(token);
    }

    let token = uri
        .query()
        .and_then(|q| q.split('&').find_map(|pair| pair.strip_prefix("token=")))
        .ok_or(StatusCode::UNAUTHORIZED)?;
    non_empty(token)
}

fn non_empty(token: &str) -> Result<&str, StatusCode> {
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(auth: Option<&'static str>) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(v) = auth {
            h.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static(v));
        }
        h
    }

    #[test]
    fn bearer_header_wins() {
        let uri: Uri = "/ws/commands/?token=query".parse().unwrap();
        assert_eq!(extract_token(&headers(Some("Bearer abc")), &uri), Ok("abc"));
    }

    #[test]
    fn falls_back_to_query_token() {
        let uri: Uri = "/ws/commands/?x=1&token=abc.def".parse().unwrap();
        assert_eq!(extract_token(&headers(None), &uri), Ok("abc.def"));
    }

    #[test]
    fn rejects_missing_or_empty_tokens() {
        let bare: Uri = "/whoami".parse().unwrap();
        let empty: Uri = "/whoami?token=".parse().unwrap();
        assert_eq!(extract_token(&headers(None), &bare), Err(StatusCode::UNAUTHORIZED));
        assert_eq!(extract_token(&headers(None), &empty), Err(StatusCode::UNAUTHORIZED));
        assert_eq!(
            extract_token(&headers(Some("Basic abc")), &bare),
            Err(StatusCode::UNAUTHORIZED)
        );
        assert_eq!(
            extract_token(&headers(Some("Bearer   ")), &bare),
            Err(StatusCode::UNAUTHORIZED)
        );
    }
}
