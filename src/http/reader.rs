use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

use crate::http::parser::{BoundaryPolicy, ParseError, ResponseParser};
use crate::http::response::Response;

const BUFFER_SIZE: usize = 8192;

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("connection closed without sending any data")]
    Empty,
    #[error("no data received for {0:?}")]
    Timeout(Duration),
    #[error("connection closed after {0} bytes, before the response was complete")]
    Closed(usize),
    #[error("response body larger than {0} bytes")]
    BodyTooLarge(usize),
    #[error("malformed response: {0}")]
    Malformed(ParseError),
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads one response from a stream until the boundary of its policy.
///
/// Every read is bounded by `idle_timeout`, so a peer that stops sending
/// cannot stall the reader forever. Parsing progress is kept between reads,
/// so each read only costs the bytes it brought in.
pub struct ResponseReader {
    buffer: BytesMut,
    parser: ResponseParser,
    body_limit: Option<usize>,
    idle_timeout: Duration,
}

impl ResponseReader {
    pub fn new(policy: BoundaryPolicy, idle_timeout: Duration) -> Self {
        Self {
            buffer: BytesMut::with_capacity(BUFFER_SIZE),
            parser: ResponseParser::new(policy),
            body_limit: None,
            idle_timeout,
        }
    }

    /// Fails the read once the body is known to exceed `limit` bytes.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.parser = self.parser.with_body_limit(limit);
        self.body_limit = Some(limit);
        self
    }

    pub async fn read_response<S>(&mut self, stream: &mut S) -> Result<Response, ReadError>
    where
        S: AsyncRead + Unpin,
    {
        loop {
            // Try parsing whatever we already have
            if !self.buffer.is_empty() {
                match self.parser.parse(&self.buffer, false) {
                    Ok((response, _)) => return Ok(response),
                    Err(ParseError::Incomplete) => {}
                    Err(e) => return Err(self.parse_failure(e)),
                }
            }

            self.buffer.reserve(BUFFER_SIZE);
            let n = timeout(self.idle_timeout, stream.read_buf(&mut self.buffer))
                .await
                .map_err(|_| ReadError::Timeout(self.idle_timeout))??;

            if n == 0 {
                return self.finish_at_eof();
            }

            tracing::trace!(bytes = n, buffered = self.buffer.len(), "response data received");
        }
    }

    fn finish_at_eof(&mut self) -> Result<Response, ReadError> {
        if self.buffer.is_empty() {
            return Err(ReadError::Empty);
        }

        match self.parser.parse(&self.buffer, true) {
            Ok((response, _)) => Ok(response),
            Err(ParseError::Incomplete) => Err(ReadError::Closed(self.buffer.len())),
            Err(e) => Err(self.parse_failure(e)),
        }
    }

    fn parse_failure(&self, error: ParseError) -> ReadError {
        match (error, self.body_limit) {
            (ParseError::BodyTooLarge, Some(limit)) => ReadError::BodyTooLarge(limit),
            (error, _) => ReadError::Malformed(error),
        }
    }
}
