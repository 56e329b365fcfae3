// Percent-encoding for GET request URLs.
//
// The cluster expects query values (object names with spaces, etc.) escaped
// while URL structure stays intact, so the whole URL string is encoded with
// a set that leaves alphanumerics, `-_.~` and the structural reserved
// characters `$&+/:=?@` alone. `;` and `,` are escaped, as is everything
// else apart from `%XX` triplets produced by `query_value`.
//
// Values interpolated into a query string go through `query_value` first so
// that `&`, `=` and `+` inside a name stay part of the value.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

const GET_URL: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'/')
    .remove(b':')
    .remove(b'=')
    .remove(b'?')
    .remove(b'@');

const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Escape a full GET URL. Existing `%XX` escapes are kept; a bare `%` is
/// encoded as `%25`.
pub fn escape(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    let mut rest = url;
    while let Some(at) = rest.find('%') {
        out.extend(utf8_percent_encode(&rest[..at], GET_URL));
        let tail = &rest[at + 1..];
        if is_escape_triplet(tail) {
            out.push('%');
            out.push_str(&tail[..2]);
            rest = &tail[2..];
        } else {
            out.push_str("%25");
            rest = tail;
        }
    }
    out.extend(utf8_percent_encode(rest, GET_URL));
    out
}

/// Encode a single query-string value.
pub fn query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

fn is_escape_triplet(tail: &str) -> bool {
    let bytes = tail.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_hexdigit() && bytes[1].is_ascii_hexdigit()
}
