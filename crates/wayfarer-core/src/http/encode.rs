//! Canonical query-string encoding
//!
//! Requests must serialize identically for the same logical parameter list,
//! regardless of how the caller assembled it, so pairs are sorted
//! lexicographically by key before percent-encoding. The sort is stable:
//! repeated keys (`point`, `details`, ...) keep their caller-supplied
//! relative order, which is significant for matrix source/destination lists.

use url::form_urlencoded;

/// Encode an ordered parameter list into a canonical query string.
///
/// Keys and values are percent-encoded per standard URL query rules and
/// joined as `key=value` pairs with `&`.
pub fn encode(params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in sorted {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}
