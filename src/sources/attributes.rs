//! Tokenizer for `key="value"` attributes on `#EXTINF` directive lines

use std::collections::HashMap;

/// Parse `key="value"` pairs from the attribute part of a directive line
///
/// Unquoted `key=value` pairs end at the next whitespace. Bare words (such as
/// the `-1` duration), empty values and unterminated quotes produce nothing.
/// When a key repeats, the first occurrence wins.
pub fn parse_attributes(input: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    let mut chars = input.chars().peekable();
    let mut current_key = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() => current_key.clear(),
            '=' => {
                let mut value = String::new();
                let complete = if chars.peek() == Some(&'"') {
                    chars.next(); // opening quote
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '"' {
                            closed = true;
                            break;
                        }
                        value.push(c);
                    }
                    closed
                } else {
                    while let Some(&c) = chars.peek() {
                        if c.is_whitespace() {
                            break;
                        }
                        value.push(c);
                        chars.next();
                    }
                    true
                };

                if complete && !current_key.is_empty() && !value.is_empty() {
                    attributes
                        .entry(std::mem::take(&mut current_key))
                        .or_insert(value);
                }
                current_key.clear();
            }
            _ => current_key.push(ch),
        }
    }

    attributes
}

/// Byte offset of the comma introducing the title
///
/// This is the last comma outside a double-quoted attribute value, so commas
/// inside values such as `group-title="Movies, Series"` are skipped.
pub fn title_separator(directive: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut separator = None;
    for (index, ch) in directive.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => separator = Some(index),
            _ => {}
        }
    }
    separator
}
