use md5::{Digest, Md5};
use url::form_urlencoded;

/// True if the string is present and non-empty
pub fn exists(value: Option<&str>) -> bool {
    value.map(|v| !v.is_empty()).unwrap_or(false)
}

/// Encode a single value for use in a form body or query string
pub fn url_encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Encode key/value pairs as an `application/x-www-form-urlencoded` body.
/// Pairs are emitted in iteration order.
pub fn url_encode_arguments<'a, I>(arguments: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    arguments
        .into_iter()
        .map(|(key, value)| format!("{}={}", url_encode(key), url_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Lowercase hex MD5 digest of a string
pub fn hex_md5(value: &str) -> String {
    hex::encode(Md5::digest(value.as_bytes()))
}
