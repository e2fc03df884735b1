use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::constant::{MONEY_SCALE, status_line};
use crate::error::{AppError, AppResult};

/// Parses a JSON request body; a missing body is parsed as `{}`.
pub fn des_from_str<T: DeserializeOwned>(string: &str) -> AppResult<T> {
    let source = if string.trim().is_empty() { "{}" } else { string };
    Ok(serde_json::from_str(source)?)
}

/// At most two decimal places once trailing zeros are dropped.
pub fn has_money_scale(value: Decimal) -> bool {
    value.normalize().scale() <= MONEY_SCALE
}

pub fn ser_to_value<T: Serialize>(t: &T) -> AppResult<Value> {
    serde_json::to_value(t).map_err(|e| AppError::Internal(e.into()))
}

pub fn extract_token(headers: &HashMap<String, String>) -> Option<String> {
    headers.get("authorization").and_then(|s| {
        let mut parts = s.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("Bearer"), Some(token)) => Some(token.to_string()),
            _ => None,
        }
    })
}

pub async fn write_json<W: AsyncWrite + Unpin>(
    writer: &mut W,
    status: u16,
    body: &Value,
) -> std::io::Result<()> {
    let payload = body.to_string();
    let response = format!(
        "{}Content-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line(status),
        payload.len(),
        payload
    );
    writer.write_all(response.as_bytes()).await?;
    writer.flush().await
}
