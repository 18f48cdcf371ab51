/// Status line and headers of a received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    /// Protocol version from the status line (e.g. "HTTP/1.1")
    pub version: String,
    /// Numeric status code
    pub status: u16,
    /// Reason phrase, possibly empty
    pub reason: String,
    /// Headers in the order they were received
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Retrieves the first header value with the given name.
    ///
    /// Header names are compared case-insensitively.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Informational responses (1xx) other than 101 Switching Protocols,
    /// which precede the final response on the same connection.
    pub fn is_interim(&self) -> bool {
        (100..200).contains(&self.status) && self.status != 101
    }

    /// Whether the status code forbids a message body.
    pub fn is_bodiless(&self) -> bool {
        (100..200).contains(&self.status) || self.status == 204 || self.status == 304
    }

    /// Whether the body uses chunked transfer coding.
    pub fn is_chunked(&self) -> bool {
        self.header("Transfer-Encoding")
            .and_then(|v| v.rsplit(',').next())
            .map(|last| last.trim().eq_ignore_ascii_case("chunked"))
            .unwrap_or(false)
    }
}

/// What the receive phase read before the boundary was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Parsed head of the final response, if it could be read
    pub head: Option<ResponseHead>,
    /// Decoded body; always empty under the header-only policy
    pub body: Vec<u8>,
    /// Raw bytes consumed from the connection up to the boundary
    pub bytes_read: usize,
}

impl Response {
    pub fn status(&self) -> Option<u16> {
        self.head.as_ref().map(|h| h.status)
    }
}
