use anyhow::Context;
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::constant::MAX_REQUEST_BYTES;
use crate::error::{AppError, AppResult, FieldError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
}

impl TryFrom<&str> for Method {
    type Error = AppError;

    fn try_from(value: &str) -> Result<Self, AppError> {
        match value {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            _ => Err(malformed("Method not supported")),
        }
    }
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
        }
    }
}

#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub params: Option<HashMap<String, String>>,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

fn malformed(message: &str) -> AppError {
    AppError::Validation(vec![FieldError::new("request", message)])
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

impl Request {
    /// Reads one HTTP/1.1 request: head up to the blank line, then
    /// `Content-Length` bytes of body.
    pub async fn new<Reader: AsyncRead + Unpin>(mut reader: Reader) -> AppResult<Self> {
        let mut buffer: Vec<u8> = Vec::with_capacity(1024);
        let mut chunk = [0; 1024];

        let head_end = loop {
            if let Some(pos) = find_header_end(&buffer) {
                break pos;
            }
            if buffer.len() >= MAX_REQUEST_BYTES {
                return Err(AppError::PayloadTooLarge);
            }
            let size = reader
                .read(&mut chunk)
                .await
                .context("Failed to read stream")?;
            if size == 0 {
                return Err(malformed("Incomplete request head"));
            }
            buffer.extend_from_slice(&chunk[..size]);
        };

        let head = String::from_utf8_lossy(&buffer[..head_end]).to_string();
        let mut head_lines = head.lines();

        // Method and path
        let first = head_lines.next().ok_or_else(|| malformed("Empty Request"))?;
        let mut request_parts = first.split_whitespace();
        let method: Method = request_parts
            .next()
            .ok_or_else(|| malformed("Missing Method"))?
            .try_into()?;
        let url = request_parts.next().ok_or_else(|| malformed("No Path"))?;
        let (path, params) = Self::extract_query_param(url);

        // Headers
        let mut headers = HashMap::new();
        for line in head_lines {
            if let Some((k, v)) = line.split_once(':') {
                headers.insert(k.trim().to_lowercase(), v.trim().to_string());
            }
        }

        // Body
        let content_length = match headers.get("content-length") {
            Some(v) => v
                .parse::<usize>()
                .map_err(|_| malformed("Invalid Content-Length"))?,
            None => 0,
        };
        let total = (head_end + 4)
            .checked_add(content_length)
            .ok_or(AppError::PayloadTooLarge)?;
        if total > MAX_REQUEST_BYTES {
            return Err(AppError::PayloadTooLarge);
        }
        let mut body_bytes = buffer[head_end + 4..].to_vec();
        while body_bytes.len() < content_length {
            let size = reader
                .read(&mut chunk)
                .await
                .context("Failed to read body")?;
            if size == 0 {
                return Err(malformed("Body shorter than Content-Length"));
            }
            body_bytes.extend_from_slice(&chunk[..size]);
        }
        body_bytes.truncate(content_length);
        let body = if body_bytes.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&body_bytes).to_string())
        };

        Ok(Request {
            method,
            path,
            headers,
            body,
            params,
        })
    }

    fn extract_query_param(url: &str) -> (String, Option<HashMap<String, String>>) {
        if let Some(pos) = url.find('?') {
            let path = &url[0..pos];
            let query_string = &url[pos + 1..];

            let params: HashMap<_, _> = query_string
                .split('&')
                .filter_map(|pair| {
                    let mut kv = pair.split('=');
                    Some((kv.next()?.to_string(), kv.next()?.to_string()))
                })
                .collect();

            (path.to_string(), Some(params))
        } else {
            (url.to_string(), None)
        }
    }

    /// Path split on `/` without empty segments.
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    pub fn body_str(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}
