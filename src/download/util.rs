use reqwest::header::{HeaderMap, ACCEPT_RANGES, CONTENT_LENGTH};
use reqwest::Request;
use url::Url;

pub fn clone_request(request: &Request) -> Request {
    let mut req = Request::new(request.method().clone(), request.url().clone());
    *req.headers_mut() = request.headers().clone();
    *req.version_mut() = request.version();
    *req.timeout_mut() = request.timeout().map(Clone::clone);

    req
}

/// Last non-empty path segment of the url, used as the output file name
pub fn file_name_from_url(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .filter(|name| *name != "." && *name != "..")
        .map(str::to_string)
}

pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers.get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
}

/// Only an exact `Accept-Ranges: bytes` counts as range support
pub fn accepts_byte_ranges(headers: &HeaderMap) -> bool {
    headers.get(ACCEPT_RANGES)
        .map(|value| value.as_bytes() == b"bytes")
        .unwrap_or(false)
}
