//! HTML character reference decoding for question text.
//!
//! Trivia sources ship text with entities (`&quot;`, `&#039;`, `&eacute;` ...).
//! This decoder produces what a browser would show for the same text content:
//!   - the full WHATWG named reference set (`table.rs`); the legacy Latin-1
//!     names also decode without a trailing `;`
//!   - decimal `&#NNN;` and hex `&#xHH;` references, semicolon optional
//!   - invalid code points (0, surrogates, > U+10FFFF) become U+FFFD
//!   - C1 controls 0x80..=0x9F are remapped through windows-1252
//!
//! Unknown references are copied through untouched.

mod table;

use table::{LEGACY, MAX_NAME_LEN, NAMED};

fn named(name: &str) -> Option<&'static str> {
    NAMED
        .binary_search_by(|(key, _)| (*key).cmp(name))
        .ok()
        .map(|i| NAMED[i].1)
}

/// windows-1252 meaning of the C1 control range, as applied by HTML parsers
/// to numeric references.
fn c1_remap(code: u32) -> Option<char> {
    let c = match code {
        0x80 => '€',
        0x82 => '‚',
        0x83 => 'ƒ',
        0x84 => '„',
        0x85 => '…',
        0x86 => '†',
        0x87 => '‡',
        0x88 => 'ˆ',
        0x89 => '‰',
        0x8A => 'Š',
        0x8B => '‹',
        0x8C => 'Œ',
        0x8E => 'Ž',
        0x91 => '‘',
        0x92 => '’',
        0x93 => '“',
        0x94 => '”',
        0x95 => '•',
        0x96 => '–',
        0x97 => '—',
        0x98 => '˜',
        0x99 => '™',
        0x9A => 'š',
        0x9B => '›',
        0x9C => 'œ',
        0x9E => 'ž',
        0x9F => 'Ÿ',
        _ => return None,
    };
    Some(c)
}

fn numeric_to_char(code: u32) -> char {
    if code == 0 || code > 0x10FFFF || (0xD800..=0xDFFF).contains(&code) {
        return '\u{FFFD}';
    }
    if let Some(c) = c1_remap(code) {
        return c;
    }
    char::from_u32(code).unwrap_or('\u{FFFD}')
}

/// Try to decode a numeric reference; `rest` starts right after `&#`.
/// Returns the decoded char and the number of bytes consumed from `rest`.
fn decode_numeric(rest: &str) -> Option<(char, usize)> {
    let bytes = rest.as_bytes();
    let (radix, start) = match bytes.first() {
        Some(b'x') | Some(b'X') => (16, 1),
        _ => (10, 0),
    };
    let digits = rest[start..]
        .bytes()
        .take_while(|b| if radix == 16 { b.is_ascii_hexdigit() } else { b.is_ascii_digit() })
        .count();
    if digits == 0 {
        return None;
    }
    let end = start + digits;
    // Saturate: anything that overflows u32 is out of range anyway.
    let code = u32::from_str_radix(&rest[start..end], radix).unwrap_or(u32::MAX);
    let consumed = if bytes.get(end) == Some(&b';') { end + 1 } else { end };
    Some((numeric_to_char(code), consumed))
}

/// Try to decode a named reference; `rest` starts right after `&`.
fn decode_named(rest: &str) -> Option<(&'static str, usize)> {
    let name_len = rest
        .bytes()
        .take(MAX_NAME_LEN + 1)
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    if name_len == 0 {
        return None;
    }
    let name = &rest[..name_len];
    if rest.as_bytes().get(name_len) == Some(&b';') {
        if let Some(s) = named(name) {
            return Some((s, name_len + 1));
        }
    }
    // Full `;`-terminated lookup failed: browsers take the longest legacy name
    // that prefixes the run.
    (1..=name_len)
        .rev()
        .map(|n| &name[..n])
        .find(|candidate| LEGACY.binary_search(candidate).is_ok())
        .and_then(|candidate| named(candidate).map(|s| (s, candidate.len())))
}

/// Decode HTML character references in `input`.
///
/// Text without any `&` is returned unchanged, so decoding already-decoded text
/// is a no-op unless the text itself contains a literal reference.
pub fn decode_html(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let decoded = if let Some(num) = after.strip_prefix('#') {
            decode_numeric(num).map(|(c, used)| {
                out.push(c);
                used + 1
            })
        } else {
            decode_named(after).map(|(s, used)| {
                out.push_str(s);
                used
            })
        };

        match decoded {
            Some(used) => rest = &after[used..],
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::decode_html;

    #[test]
    fn decodes_common_trivia_entities() {
        assert_eq!(
            decode_html("The word &quot;astasia&quot; means which of the following?"),
            "The word \"astasia\" means which of the following?"
        );
        assert_eq!(decode_html("Handsome Dan&#039;s breed"), "Handsome Dan's breed");
        assert_eq!(decode_html("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(decode_html("Pok&eacute;mon"), "Pokémon");
        assert_eq!(decode_html("&lt;b&gt;"), "<b>");
        assert_eq!(decode_html("&ldquo;Hi&rdquo; &hellip;"), "“Hi” …");
    }

    #[test]
    fn decodes_numeric_references() {
        assert_eq!(decode_html("&#65;&#x42;&#X43;"), "ABC");
        assert_eq!(decode_html("caf&#233;"), "café");
        assert_eq!(decode_html("&#128512;"), "😀");
        // Semicolon is optional for numeric references.
        assert_eq!(decode_html("&#39s"), "'s");
    }

    #[test]
    fn numeric_edge_cases_follow_browser_rules() {
        assert_eq!(decode_html("&#0;"), "\u{FFFD}");
        assert_eq!(decode_html("&#xD800;"), "\u{FFFD}");
        assert_eq!(decode_html("&#x110000;"), "\u{FFFD}");
        assert_eq!(decode_html("&#99999999999999;"), "\u{FFFD}");
        assert_eq!(decode_html("&#150;"), "–");
        assert_eq!(decode_html("&#x80;"), "€");
    }

    #[test]
    fn legacy_names_decode_without_semicolon() {
        assert_eq!(decode_html("AT&ampT"), "AT&T");
        assert_eq!(decode_html("&copy 2004"), "© 2004");
        assert_eq!(decode_html("&notit;"), "¬it;");
        // `hellip` is not a legacy name, so it needs the semicolon.
        assert_eq!(decode_html("&hellip"), "&hellip");
    }

    #[test]
    fn unknown_or_bare_ampersands_pass_through() {
        assert_eq!(decode_html("Salt & Pepper"), "Salt & Pepper");
        assert_eq!(decode_html("&bogus;"), "&bogus;");
        assert_eq!(decode_html("&#;"), "&#;");
        assert_eq!(decode_html("&#xZZ;"), "&#xZZ;");
        assert_eq!(decode_html("trailing &"), "trailing &");
    }

    #[test]
    fn decoding_plain_text_is_identity() {
        for s in ["", "Parlor", "I came, I saw, I conquered", "日本語 ü ß", "50% off"] {
            assert_eq!(decode_html(s), s);
            assert_eq!(decode_html(&decode_html(s)), s);
        }
    }

    #[test]
    fn full_name_wins_over_legacy_prefix() {
        assert_eq!(decode_html("x &notin; A"), "x ∉ A");
        assert_eq!(decode_html("&notinva;"), "∉");
        assert_eq!(decode_html("&amplifier;"), "&lifier;");
    }

    #[test]
    fn decodes_names_beyond_latin1() {
        assert_eq!(decode_html("&theta;&Sigma;&eta;"), "θΣη");
        assert_eq!(decode_html("&ccaron;&Zcaron;"), "čŽ");
        assert_eq!(decode_html("&CounterClockwiseContourIntegral;"), "∳");
        assert_eq!(decode_html("&bne;"), "=\u{20E5}");
        // Non-legacy names still need the semicolon.
        assert_eq!(decode_html("&theta"), "&theta");
    }

    #[test]
    fn only_one_level_is_decoded() {
        assert_eq!(decode_html("&amp;amp;"), "&amp;");
    }
}
