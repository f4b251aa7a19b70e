//! Caller identity for provisioning operations.
//!
//! Authentication and group resolution happen upstream; the authenticating
//! proxy forwards the resolved ids in `X-Group-Id` and `X-User-Id`.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::error::AppError;

pub const GROUP_HEADER: &str = "x-group-id";
pub const USER_HEADER: &str = "x-user-id";

/// The financial group and user every core operation is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupContext {
    pub group_id: i64,
    pub user_id: i64,
}

impl GroupContext {
    pub fn new(group_id: i64, user_id: i64) -> Self {
        Self { group_id, user_id }
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let group_id = header_id(headers, GROUP_HEADER)
            .ok_or_else(|| AppError::Precondition("No financial group for this user".into()))?;
        let user_id = header_id(headers, USER_HEADER)
            .ok_or_else(|| AppError::Precondition("No authenticated user".into()))?;
        Ok(Self { group_id, user_id })
    }
}

fn header_id(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
}

#[async_trait]
impl<S> FromRequestParts<S> for GroupContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(GROUP_HEADER, HeaderValue::from_static("7"));
        headers.insert(USER_HEADER, HeaderValue::from_static(" 3 "));
        assert_eq!(
            GroupContext::from_headers(&headers).unwrap(),
            GroupContext::new(7, 3)
        );
    }

    #[test]
    fn test_missing_group_is_precondition_failure() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("3"));
        assert!(matches!(
            GroupContext::from_headers(&headers),
            Err(AppError::Precondition(_))
        ));
    }

    #[test]
    fn test_invalid_group_is_precondition_failure() {
        let mut headers = HeaderMap::new();
        headers.insert(GROUP_HEADER, HeaderValue::from_static("abc"));
        headers.insert(USER_HEADER, HeaderValue::from_static("3"));
        assert!(GroupContext::from_headers(&headers).is_err());
    }
}
