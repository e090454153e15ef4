/// Longest response-body excerpt carried into logs and errors.
pub const SNIPPET_LIMIT: usize = 512;

/// Trim `body` to at most [`SNIPPET_LIMIT`] characters for diagnostics.
pub fn make_snippet(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(SNIPPET_LIMIT) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}

/// Join `base` and `path` with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim().trim_end_matches('/'), path.trim_start_matches('/'))
}
