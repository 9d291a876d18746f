//! Null-byte stripping and length capping.

/// Removes every NUL and truncates to at most `max_chars` characters.
pub fn sanitize_script(script: &str, max_chars: usize) -> String {
    let mut cleaned: String = script.chars().filter(|c| *c != '\0').collect();
    if let Some((cut, _)) = cleaned.char_indices().nth(max_chars) {
        cleaned.truncate(cut);
    }
    cleaned
}
