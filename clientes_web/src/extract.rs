use axum::{
    async_trait,
    body::{Bytes, HttpBody},
    extract::FromRequest,
    http::{header, HeaderMap, Request},
    BoxError,
};
use clientes::domain::customer::CustomerFields;
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;

/// 顧客属性のリクエスト本文
///
/// `Content-Type: application/json` でない本文や空の本文は `{}` として扱う。
/// JSONとして読めない本文と、オブジェクトでも配列でもない値だけを拒否する。
/// 配列は項目を一つも持たないものとして扱う。
#[derive(Debug, Default)]
pub struct FieldsBody(pub CustomerFields);

#[async_trait]
impl<S, B> FromRequest<S, B> for FieldsBody
where
    B: HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        if !is_json(req.headers()) {
            return Ok(Self::default());
        }
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            debug!("本文を読み込めませんでした: {}", e);
            ApiError::bad_request()
        })?;
        parse(&bytes).map(Self)
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map_or(false, |mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

fn parse(bytes: &[u8]) -> Result<CustomerFields, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(CustomerFields::default());
    }
    let value = serde_json::from_slice::<Value>(bytes).map_err(|e| {
        debug!("JSONとして読めない本文です: {}", e);
        ApiError::bad_request()
    })?;
    match value {
        Value::Object(_) => serde_json::from_value(value).map_err(|e| {
            debug!("顧客属性として読めない本文です: {}", e);
            ApiError::bad_request()
        }),
        Value::Array(_) => Ok(CustomerFields::default()),
        _ => Err(ApiError::bad_request()),
    }
}
