use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use url::{Position, Url};

use crate::http::params::Params;
use crate::http::request::Method;

const HTTP_VERSION: &str = "HTTP/1.1";

pub const DEFAULT_USER_AGENT: &str = concat!("phaseprobe/", env!("CARGO_PKG_VERSION"));
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Step of request serialization that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationStage {
    Url,
    Body,
    Write,
}

impl fmt::Display for SerializationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SerializationStage::Url => "url",
            SerializationStage::Body => "body",
            SerializationStage::Write => "write",
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("serializing request failed at {stage} stage: {cause}")]
pub struct SerializationError {
    pub stage: SerializationStage,
    pub cause: String,
}

impl SerializationError {
    fn new(stage: SerializationStage, cause: impl fmt::Display) -> Self {
        Self {
            stage,
            cause: cause.to_string(),
        }
    }
}

/// The exact bytes of an HTTP/1.1 request, ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedRequest(Bytes);

impl SerializedRequest {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Serializes a request with the default User-Agent.
///
/// See [`RequestSerializer::serialize`].
pub fn serialize_request(
    method: Method,
    url: &str,
    body_params: &Params,
) -> Result<SerializedRequest, SerializationError> {
    RequestSerializer::default().serialize(method, url, body_params)
}

/// Builds raw HTTP/1.1 requests.
///
/// Header order is fixed: `Host`, `User-Agent`, `Connection`, then
/// `Content-Type` and `Content-Length` when a form body is sent. The output
/// only depends on the inputs, so identical calls give identical bytes.
#[derive(Debug, Clone)]
pub struct RequestSerializer {
    user_agent: String,
}

impl Default for RequestSerializer {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

impl RequestSerializer {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    /// Produces the request line, headers and optional body for `url`.
    ///
    /// GET requests must route their parameters through the query string;
    /// passing body parameters with GET fails at the `body` stage.
    pub fn serialize(
        &self,
        method: Method,
        url: &str,
        body_params: &Params,
    ) -> Result<SerializedRequest, SerializationError> {
        let url = Url::parse(url)
            .map_err(|e| SerializationError::new(SerializationStage::Url, format!("input url -> {e}")))?;

        let host = url.host_str().ok_or_else(|| {
            SerializationError::new(SerializationStage::Url, format!("input url -> `{url}` has no host"))
        })?;

        let body = if method.has_form_body() {
            body_params.encode()
        } else if body_params.is_empty() {
            String::new()
        } else {
            return Err(SerializationError::new(
                SerializationStage::Body,
                format!("{method} requests take parameters in the query string, not the body"),
            ));
        };

        let host_value = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let mut headers = vec![
            ("Host", host_value),
            ("User-Agent", self.user_agent.clone()),
            ("Connection", "close".to_string()),
        ];

        if method.has_form_body() {
            headers.push(("Content-Type", FORM_CONTENT_TYPE.to_string()));
        }
        if method.has_form_body() || !body.is_empty() {
            headers.push(("Content-Length", body.len().to_string()));
        }

        let path = match &url[Position::BeforePath..Position::AfterQuery] {
            "" => "/",
            p => p,
        };

        let mut buf = BytesMut::with_capacity(256 + body.len());

        // Request line
        buf.put_slice(format!("{} {} {}\r\n", method, path, HTTP_VERSION).as_bytes());

        // Headers
        for (key, value) in &headers {
            validate_header(key, value)?;
            buf.put_slice(key.as_bytes());
            buf.put_slice(b": ");
            buf.put_slice(value.as_bytes());
            buf.put_slice(b"\r\n");
        }

        // Header/body separator
        buf.put_slice(b"\r\n");

        buf.put_slice(body.as_bytes());

        Ok(SerializedRequest(buf.freeze()))
    }
}

fn validate_header(name: &str, value: &str) -> Result<(), SerializationError> {
    let name_ok = !name.is_empty() && name.bytes().all(is_token_byte);
    if !name_ok {
        return Err(SerializationError::new(
            SerializationStage::Write,
            format!("invalid header name {name:?}"),
        ));
    }

    if !value.bytes().all(|b| b == b'\t' || (b >= 0x20 && b != 0x7f)) {
        return Err(SerializationError::new(
            SerializationStage::Write,
            format!("invalid value for header {name}: {value:?}"),
        ));
    }

    Ok(())
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Writes one serialized request to a stream, tracking partial writes.
pub struct RequestWriter {
    buffer: Bytes,
    written: usize,
}

impl RequestWriter {
    pub fn new(request: SerializedRequest) -> Self {
        Self {
            buffer: request.0,
            written: 0,
        }
    }

    /// Bytes already handed to the stream.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn is_complete(&self) -> bool {
        self.written == self.buffer.len()
    }

    pub async fn write_to_stream<S>(&mut self, stream: &mut S) -> anyhow::Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!(
                    "connection closed while writing ({} of {} bytes sent)",
                    self.written,
                    self.buffer.len()
                ));
            }

            self.written += n;
        }

        stream.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_validation_rejects_line_breaks() {
        let err = validate_header("User-Agent", "probe\r\nX-Injected: 1").unwrap_err();
        assert_eq!(err.stage, SerializationStage::Write);
    }

    #[test]
    fn header_validation_rejects_bad_names() {
        assert!(validate_header("Bad Name", "v").is_err());
        assert!(validate_header("", "v").is_err());
        assert!(validate_header("X-Ok", "tab\tok").is_ok());
    }

    #[tokio::test]
    async fn writer_sends_every_byte() {
        let request = serialize_request(Method::GET, "http://localhost/", &Params::new()).unwrap();
        let expected = request.as_bytes().to_vec();

        let mut writer = RequestWriter::new(request);
        let mut sink = Vec::new();
        writer.write_to_stream(&mut sink).await.unwrap();

        assert!(writer.is_complete());
        assert_eq!(writer.written(), expected.len());
        assert_eq!(sink, expected);
    }
}
