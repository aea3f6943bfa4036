//! FILENAME: codec/src/scanner.rs
//! PURPOSE: Depth-aware splitting of encoded text.
//! CONTEXT: Separators only count at parenthesis depth 0; a comma inside
//! "(a:1,2)" belongs to the nested object, not to the enclosing array.
//! The scan is character-by-character and tolerates unbalanced input:
//! a stray ')' never drives the depth below zero.

/// Splits `text` on `separator` wherever the parenthesis depth is zero.
/// Always returns at least one piece (the empty string for empty input).
pub fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth: usize = 0;
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                pieces.push(&text[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(&text[start..]);
    pieces
}

/// Position of the first `separator` at depth zero.
pub fn find_top_level(text: &str, separator: char) -> Option<usize> {
    let mut depth: usize = 0;
    for (idx, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => return Some(idx),
            _ => {}
        }
    }
    None
}

/// Returns the text between an outer pair of parentheses when the first
/// '(' is matched by the final ')'. "(a),(b)" is not enclosed: its first
/// paren closes before the end.
pub fn enclosed(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth: usize = 0;
    for ch in inner.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    if depth == 0 {
        Some(inner)
    } else {
        None
    }
}
