use serde::{Deserialize, Deserializer};
use std::fmt;

/// HTTP request methods a probe can send.
///
/// Only GET and POST are probed. A missing method in the configuration
/// falls back to GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// GET - parameters travel in the query string
    #[default]
    GET,
    /// POST - parameters travel as a form-encoded body
    POST,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// # Arguments
    ///
    /// * `s` - String representation of the method (case-sensitive, uppercase)
    ///
    /// # Returns
    ///
    /// `Some(Method)` if the string matches a known method, `None` otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// # use phaseprobe::http::request::Method;
    /// assert_eq!(Method::from_str("POST"), Some(Method::POST));
    /// assert_eq!(Method::from_str("post"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            _ => None,
        }
    }

    /// The method token as it appears on the request line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
        }
    }

    /// Whether requests with this method carry a form body.
    pub fn has_form_body(&self) -> bool {
        matches!(self, Method::POST)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Method {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let upper = raw.trim().to_ascii_uppercase();

        // An empty method string means GET, same as an absent one
        if upper.is_empty() {
            return Ok(Method::GET);
        }

        Method::from_str(&upper).ok_or_else(|| {
            serde::de::Error::custom(format!("unsupported method `{raw}`, expected GET or POST"))
        })
    }
}
