//! String helpers used when building API requests.

pub mod encoding;

pub use encoding::{exists, hex_md5, url_encode, url_encode_arguments};
