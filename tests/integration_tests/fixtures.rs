//! Test fixtures for integration tests
//!
//! Sample URLs and payloads as they show up on `url.found`

/// Hidden-service URLs that must be accepted
pub const ONION_URLS: &[&str] = &[
    "http://abcdefghijklmnop.onion/",
    "https://abcdefghijklmnop.onion/forum/thread?id=42",
    "http://2gzyxa5ihm7nsggfxnu52rck2vv4rvmdlkiu3zzui5du4xyclen53wid.onion/index.html",
    "http://sub.domain.example.onion/a/b/",
];

/// URLs that must be ignored without querying the index
pub const REJECTED_URLS: &[&str] = &[
    "http://example.com/page",
    "https://onion.example.org/",
    "ftp://abcdefghijklmnop.onion/file",
    "not a url",
    "",
];

/// Payloads that are not discovered-URL events
pub const MALFORMED_PAYLOADS: &[&str] = &[
    "",
    "null",
    "[]",
    r#"{"link":"http://abcdefghijklmnop.onion/"}"#,
    r#"{"url":42}"#,
    "\u{0}\u{1}garbage",
];
