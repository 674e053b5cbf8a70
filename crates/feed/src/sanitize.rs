//! Plain-text extraction from post markup.
//!
//! Mirrors what a browser exposes as the text content of the parsed body: tags are removed,
//! comments and the bodies of `<script>`, `<style>` and `<template>` are dropped, and
//! character references are decoded.

const RAW_TEXT_ELEMENTS: [&str; 3] = ["script", "style", "template"];

pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(|c: char| c == '<' || c == '&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if rest.starts_with('&') {
            match decode_reference(rest) {
                Some((ch, used)) => {
                    out.push(ch);
                    rest = &rest[used..];
                }
                None => {
                    out.push('&');
                    rest = &rest[1..];
                }
            }
            continue;
        }

        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map_or("", |end| &after[end + 3..]);
            continue;
        }

        let next = rest[1..].chars().next();
        let starts_tag = matches!(next, Some(c) if c.is_ascii_alphabetic() || c == '/' || c == '!' || c == '?');
        if !starts_tag {
            out.push('<');
            rest = &rest[1..];
            continue;
        }

        let Some(end) = tag_end(rest) else {
            // unterminated tag swallows the remainder
            rest = "";
            break;
        };
        let name = tag_name(&rest[1..end]);
        let closing = rest[1..].starts_with('/');
        rest = &rest[end + 1..];

        if !closing {
            if let Some(raw) = RAW_TEXT_ELEMENTS.iter().find(|e| name.eq_ignore_ascii_case(e)) {
                rest = skip_raw_text(rest, raw);
            }
        }
    }
    out.push_str(rest);
    out
}

/// Index of the `>` closing the tag at the start of `s`, honoring quoted attribute values.
fn tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices().skip(1) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(i),
            None => {}
        }
    }
    None
}

fn tag_name(inner: &str) -> &str {
    let inner = inner.trim_start_matches('/');
    let end = inner
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(inner.len());
    &inner[..end]
}

fn skip_raw_text<'a>(s: &'a str, element: &str) -> &'a str {
    let lower = s.to_ascii_lowercase();
    let needle = format!("</{element}");
    match lower.find(&needle) {
        Some(start) => match s[start..].find('>') {
            Some(close) => &s[start + close + 1..],
            None => "",
        },
        None => "",
    }
}

/// Decode `&name;`, `&#NNN;` or `&#xHH;` at the start of `s`.
fn decode_reference(s: &str) -> Option<(char, usize)> {
    let semi = s[1..].find(';')? + 1;
    if semi > 32 {
        return None;
    }
    let body = &s[1..semi];
    let ch = if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        char::from_u32(code).filter(|c| *c != '\0').unwrap_or('\u{FFFD}')
    } else {
        match body {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            "nbsp" => '\u{a0}',
            "copy" => '\u{a9}',
            "reg" => '\u{ae}',
            "hellip" => '\u{2026}',
            "mdash" => '\u{2014}',
            "ndash" => '\u{2013}',
            _ => return None,
        }
    };
    Some((ch, semi + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_unchanged() {
        assert_eq!(sanitize("hello world"), "hello world");
        assert_eq!(sanitize("1 < 2 and 3 > 2"), "1 < 2 and 3 > 2");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn tags_are_stripped() {
        assert_eq!(sanitize("<b>bold</b> and <i>italic</i>"), "bold and italic");
        assert_eq!(sanitize("<a href=\"x>y\">link</a>"), "link");
        assert_eq!(sanitize("line<br/>break"), "linebreak");
    }

    #[test]
    fn script_and_comments_dropped() {
        assert_eq!(sanitize("hi<script>alert('x')</script>!"), "hi!");
        assert_eq!(sanitize("a<STYLE>p{}</style>b"), "ab");
        assert_eq!(sanitize("a<!-- hidden -->b"), "ab");
        assert_eq!(sanitize("<script>never closed"), "");
    }

    #[test]
    fn markup_only_is_empty() {
        assert_eq!(sanitize("<img src=x onerror=alert(1)>"), "");
    }

    #[test]
    fn references_decoded() {
        assert_eq!(sanitize("&lt;b&gt; &amp; &#65;&#x42;"), "<b> & AB");
        assert_eq!(sanitize("fish &chips"), "fish &chips");
        assert_eq!(sanitize("&unknown;"), "&unknown;");
    }

    #[test]
    fn multibyte_text_kept() {
        assert_eq!(sanitize("<p>héllo 😀</p>"), "héllo 😀");
    }
}
