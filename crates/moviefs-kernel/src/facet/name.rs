//! Directory entry names for catalog values.
//!
//! Catalog values are free text, but a directory entry cannot contain `/` or
//! NUL and cannot be empty, `.` or `..`. Values are percent-escaped on the way
//! into a listing and unescaped before they reach the catalog. Ordinary names
//! are left as they are.
//!
//! | value | entry |
//! |---|---|
//! | `Face/Off` | `Face%2FOff` |
//! | `100%` | `100%25` |
//! | `.` / `..` | `%2E` / `%2E%2E` |
//! | empty | `%` |

/// Entry name for a catalog value. Injective, so listings stay distinct.
pub fn encode_name(value: &str) -> String {
    match value {
        "" => "%".to_string(),
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        _ => {
            let mut out = String::with_capacity(value.len());
            for c in value.chars() {
                match c {
                    '%' => out.push_str("%25"),
                    '/' => out.push_str("%2F"),
                    '\0' => out.push_str("%00"),
                    c => out.push(c),
                }
            }
            out
        }
    }
}

fn hex(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Catalog value for an entry name produced by [`encode_name`].
///
/// Malformed escapes are kept literally; callers only decode names they found
/// in a listing.
pub fn decode_name(name: &str) -> String {
    if name == "%" {
        return String::new();
    }
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let hi = bytes.get(i + 1).copied().and_then(hex);
        let lo = bytes.get(i + 2).copied().and_then(hex);
        match (bytes[i], hi, lo) {
            (b'%', Some(hi), Some(lo)) => {
                out.push(hi << 4 | lo);
                i += 3;
            }
            (b, _, _) => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
