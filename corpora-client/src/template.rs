//! URL template resolution.
//!
//! Endpoint templates carry `{name}` placeholders; resolution substitutes
//! the URL-encoded parameter value for each one. A placeholder with no
//! matching parameter is a programming error and fails fast; extra
//! parameters are ignored (callers append query strings separately).

use corpora_core::{FetchError, FetchResult};

/// Expand a parameterized endpoint template into a concrete request path.
///
/// Idempotent: the same template and params always produce the same string.
pub fn api_template_to_url(template: &str, params: &[(&str, &str)]) -> FetchResult<String> {
    let mut url = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        url.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find('}') else {
            // Unterminated placeholder; treat the remainder as literal.
            url.push_str(&rest[open..]);
            return Ok(url);
        };
        let name = &after_open[..close];
        let value = params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| FetchError::MissingParameter {
                name: name.to_string(),
            })?;
        url.push_str(&urlencoding::encode(value));
        rest = &after_open[close + 1..];
    }
    url.push_str(rest);
    Ok(url)
}
