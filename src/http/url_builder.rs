//! URL composition for probe targets.

use crate::http::params::Params;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum UrlBuildError {
    #[error("unable to create url: {0}")]
    Parse(#[from] url::ParseError),
    #[error("unable to create url: `{0}` has no host")]
    MissingHost(String),
}

/// Appends the encoded `params` to `base` as a query string.
///
/// `base` is returned unchanged (after validation) when `params` is empty.
/// The composed string must parse as a URL with a host.
///
/// # Example
///
/// ```
/// # use phaseprobe::http::{params::Params, url_builder::build_url};
/// let params = Params::new().with("a", "1").with("b", "2");
/// let url = build_url("http://example.com/x", &params).unwrap();
/// assert_eq!(url, "http://example.com/x?a=1&b=2");
/// ```
pub fn build_url(base: &str, params: &Params) -> Result<String, UrlBuildError> {
    let encoded = params.encode();

    let composed = if encoded.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{encoded}")
    };

    let url = Url::parse(&composed)?;
    if !url.has_host() {
        return Err(UrlBuildError::MissingHost(composed));
    }

    Ok(url.into())
}
