use crate::http::response::{Response, ResponseHead};

/// Largest header block accepted before the response is rejected.
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// When the receive phase considers a response complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BoundaryPolicy {
    /// Stop at the blank line ending the header block; the body is not read.
    HeaderOnly,
    /// Parse status line and headers, then drain the body according to
    /// its framing (`Content-Length`, chunked, or connection close).
    #[default]
    Full,
}

/// Longest chunk-size line (size plus extensions) accepted.
const MAX_CHUNK_LINE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid status line")]
    InvalidStatusLine,
    #[error("invalid header line")]
    InvalidHeader,
    #[error("invalid Content-Length")]
    InvalidContentLength,
    #[error("invalid chunked encoding")]
    InvalidChunk,
    #[error("response headers too large")]
    HeadersTooLarge,
    #[error("response body exceeds the configured limit")]
    BodyTooLarge,
    #[error("incomplete response")]
    Incomplete,
}

/// Tries to find a complete response at the start of `buf`.
///
/// Returns the response and the number of bytes it spans, or
/// `ParseError::Incomplete` when more bytes are needed. `eof` tells the
/// parser the peer closed the connection, which is what completes a body
/// with neither `Content-Length` nor chunked framing.
pub fn parse_http_response(
    buf: &[u8],
    policy: BoundaryPolicy,
    eof: bool,
) -> Result<(Response, usize), ParseError> {
    ResponseParser::new(policy).parse(buf, eof)
}

enum ParseState {
    /// Looking for the end of the header block that starts at `start`.
    /// `scanned` bytes after `start` are known not to contain it.
    Head { start: usize, scanned: usize },
    Body {
        head: ResponseHead,
        body_start: usize,
        framing: Framing,
    },
}

enum Framing {
    Empty,
    Length(usize),
    Chunked(ChunkDecoder),
    UntilClose,
}

/// Incremental response parser.
///
/// Feed it the same growing buffer after every read. Progress (header
/// search position, parsed head, chunk decoder position) is kept between
/// calls, so each call only looks at bytes it has not seen before. The body
/// is copied out once, when the boundary is reached.
pub struct ResponseParser {
    policy: BoundaryPolicy,
    body_limit: Option<usize>,
    state: ParseState,
}

impl ResponseParser {
    pub fn new(policy: BoundaryPolicy) -> Self {
        Self {
            policy,
            body_limit: None,
            state: ParseState::Head { start: 0, scanned: 0 },
        }
    }

    /// Rejects bodies larger than `limit` bytes with `ParseError::BodyTooLarge`.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = Some(limit);
        self
    }

    pub fn parse(&mut self, buf: &[u8], eof: bool) -> Result<(Response, usize), ParseError> {
        loop {
            match &mut self.state {
                ParseState::Head { start, scanned } => {
                    let start = *start;
                    let rest = &buf[start..];

                    // A terminator may straddle the previous scan boundary
                    let from = (*scanned).min(rest.len()).saturating_sub(3);
                    let headers_end = match find_headers_end(&rest[from..]) {
                        Some(end) => from + end,
                        None => {
                            *scanned = rest.len();
                            if rest.len() > MAX_HEAD_SIZE {
                                return Err(ParseError::HeadersTooLarge);
                            }
                            return Err(ParseError::Incomplete);
                        }
                    };
                    if headers_end > MAX_HEAD_SIZE {
                        return Err(ParseError::HeadersTooLarge);
                    }

                    let body_start = start + headers_end + 4;

                    if self.policy == BoundaryPolicy::HeaderOnly {
                        let head = parse_response_head(&rest[..headers_end]).ok();
                        let response = Response {
                            head,
                            body: Vec::new(),
                            bytes_read: body_start,
                        };
                        return Ok((response, body_start));
                    }

                    let head = parse_response_head(&rest[..headers_end])?;

                    if head.is_interim() {
                        self.state = ParseState::Head {
                            start: body_start,
                            scanned: 0,
                        };
                        continue;
                    }

                    let framing = framing_for(&head, self.body_limit)?;
                    self.state = ParseState::Body {
                        head,
                        body_start,
                        framing,
                    };
                }

                ParseState::Body {
                    head,
                    body_start,
                    framing,
                } => {
                    let body_start = *body_start;
                    let body_bytes = &buf[body_start..];

                    let body_len = match framing {
                        Framing::Empty => 0,
                        Framing::Length(n) => {
                            if body_bytes.len() < *n {
                                return Err(ParseError::Incomplete);
                            }
                            *n
                        }
                        Framing::Chunked(decoder) => decoder.advance(body_bytes, self.body_limit)?,
                        Framing::UntilClose => {
                            if self.body_limit.is_some_and(|limit| body_bytes.len() > limit) {
                                return Err(ParseError::BodyTooLarge);
                            }
                            if !eof {
                                return Err(ParseError::Incomplete);
                            }
                            body_bytes.len()
                        }
                    };

                    let body = match framing {
                        Framing::Chunked(decoder) => decoder.collect(body_bytes),
                        _ => body_bytes[..body_len].to_vec(),
                    };

                    let consumed = body_start + body_len;
                    let response = Response {
                        head: Some(head.clone()),
                        body,
                        bytes_read: consumed,
                    };
                    return Ok((response, consumed));
                }
            }
        }
    }
}

fn framing_for(head: &ResponseHead, body_limit: Option<usize>) -> Result<Framing, ParseError> {
    if head.is_bodiless() {
        return Ok(Framing::Empty);
    }
    if head.is_chunked() {
        return Ok(Framing::Chunked(ChunkDecoder::default()));
    }

    match head.header("Content-Length") {
        Some(value) => {
            let content_length = value
                .trim()
                .parse::<usize>()
                .map_err(|_| ParseError::InvalidContentLength)?;

            if body_limit.is_some_and(|limit| content_length > limit) {
                return Err(ParseError::BodyTooLarge);
            }
            Ok(Framing::Length(content_length))
        }
        None => Ok(Framing::UntilClose),
    }
}

/// Parses a status line and header lines (without the terminating blank line).
pub fn parse_response_head(header_bytes: &[u8]) -> Result<ResponseHead, ParseError> {
    let headers_str = String::from_utf8_lossy(header_bytes);
    let mut lines = headers_str.split("\r\n");

    // Status line
    let status_line = lines.next().ok_or(ParseError::InvalidStatusLine)?;
    let mut parts = status_line.splitn(3, ' ');

    let version = parts.next().ok_or(ParseError::InvalidStatusLine)?;
    if !version.starts_with("HTTP/") {
        return Err(ParseError::InvalidStatusLine);
    }

    let code = parts.next().ok_or(ParseError::InvalidStatusLine)?;
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidStatusLine);
    }
    let status = code.parse::<u16>().map_err(|_| ParseError::InvalidStatusLine)?;
    if status < 100 {
        return Err(ParseError::InvalidStatusLine);
    }

    let reason = parts.next().unwrap_or("").trim().to_string();

    // Headers
    let mut headers: Vec<(String, String)> = Vec::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        // obs-fold continuation
        if line.starts_with(' ') || line.starts_with('\t') {
            let (_, value) = headers.last_mut().ok_or(ParseError::InvalidHeader)?;
            value.push(' ');
            value.push_str(line.trim());
            continue;
        }

        let (key, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;
        if key.is_empty() || key.bytes().any(|b| b.is_ascii_whitespace()) {
            return Err(ParseError::InvalidHeader);
        }

        headers.push((key.to_string(), value.trim().to_string()));
    }

    Ok(ResponseHead {
        version: version.to_string(),
        status,
        reason,
        headers,
    })
}

/// Decodes a chunked body at the start of `buf`.
///
/// Returns the decoded body and the number of raw bytes it spans, trailers
/// included.
pub fn decode_chunked(buf: &[u8]) -> Result<(Vec<u8>, usize), ParseError> {
    let mut decoder = ChunkDecoder::default();
    let end = decoder.advance(buf, None)?;
    Ok((decoder.collect(buf), end))
}

/// Resumable chunked-body walker.
///
/// Positions are relative to the start of the body. Chunk data is only
/// located, not copied, until [`ChunkDecoder::collect`].
#[derive(Debug, Default)]
struct ChunkDecoder {
    /// Start of the next chunk-size or trailer line
    pos: usize,
    chunks: Vec<(usize, usize)>,
    decoded: usize,
    in_trailers: bool,
}

impl ChunkDecoder {
    /// Walks forward from the last complete chunk. Returns the raw length of
    /// the body once the terminating chunk and trailers are in.
    fn advance(&mut self, buf: &[u8], limit: Option<usize>) -> Result<usize, ParseError> {
        loop {
            let line_end = match find_crlf(&buf[self.pos..]) {
                Some(end) => end,
                None if buf.len() - self.pos > MAX_CHUNK_LINE && !self.in_trailers => {
                    return Err(ParseError::InvalidChunk);
                }
                None => return Err(ParseError::Incomplete),
            };

            if self.in_trailers {
                // Trailer section ends with an empty line
                self.pos += line_end + 2;
                if line_end == 0 {
                    return Ok(self.pos);
                }
                continue;
            }

            let line = std::str::from_utf8(&buf[self.pos..self.pos + line_end])
                .map_err(|_| ParseError::InvalidChunk)?;

            // Chunk extensions after `;` are ignored
            let size_str = line.split(';').next().unwrap_or("").trim();
            let size = usize::from_str_radix(size_str, 16).map_err(|_| ParseError::InvalidChunk)?;
            let data_start = self.pos + line_end + 2;

            if size == 0 {
                self.pos = data_start;
                self.in_trailers = true;
                continue;
            }

            let decoded = self.decoded.checked_add(size).ok_or(ParseError::InvalidChunk)?;
            if limit.is_some_and(|limit| decoded > limit) {
                return Err(ParseError::BodyTooLarge);
            }

            let data_end = data_start.checked_add(size).ok_or(ParseError::InvalidChunk)?;
            let chunk_end = data_end.checked_add(2).ok_or(ParseError::InvalidChunk)?;
            if buf.len() < chunk_end {
                return Err(ParseError::Incomplete);
            }

            if &buf[data_end..chunk_end] != b"\r\n" {
                return Err(ParseError::InvalidChunk);
            }

            self.chunks.push((data_start, data_end));
            self.decoded = decoded;
            self.pos = chunk_end;
        }
    }

    fn collect(&self, buf: &[u8]) -> Vec<u8> {
        let mut body = Vec::with_capacity(self.decoded);
        for &(start, end) in &self.chunks {
            body.extend_from_slice(&buf[start..end]);
        }
        body
    }
}

pub fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}
