//! Raw HTTP/1.1 plumbing for the probe.
//!
//! Nothing here goes through an HTTP client library: requests are
//! serialized by hand so the probe controls exactly which bytes hit the
//! wire, and responses are parsed just far enough to know when the
//! receive phase is over.
//!
//! # Architecture
//!
//! - **`params`**: Ordered, form-encoded parameter mappings
//! - **`url_builder`**: Appends query parameters to a base URL
//! - **`request`**: HTTP methods the probe can send
//! - **`writer`**: Serializes requests and writes them to a stream
//! - **`response`**: Received response head and body
//! - **`parser`**: Response boundary detection (header-only or full)
//! - **`reader`**: Reads a response off a stream with an inactivity timeout
//!
//! # Request Flow
//!
//! ```text
//!   base URL + query params
//!            │ url_builder::build_url
//!            ▼
//!   method + URL + body params
//!            │ writer::serialize_request
//!            ▼
//!   SerializedRequest ──► RequestWriter ──► socket ──► ResponseReader
//!                                                         │ parser
//!                                                         ▼
//!                                                      Response
//! ```

pub mod params;
pub mod parser;
pub mod reader;
pub mod request;
pub mod response;
pub mod url_builder;
pub mod writer;
