//! Text cleanup applied while flattening: markup stripping and mojibake repair.

use html2text::render::text_renderer::TrivialDecorator;
use std::borrow::Cow;

/// Render width; wide enough that ordinary paragraphs are never wrapped.
const RENDER_WIDTH: usize = 10_000;

/// Render a post body as plain text: tags dropped (a `>` inside a quoted attribute
/// included), entities decoded, block elements turned into line breaks.
/// Escaped markup such as `&lt;b&gt;` survives as literal text.
pub fn strip_markup(html: &str) -> String {
    let rendered = html2text::from_read_with_decorator(html.as_bytes(), RENDER_WIDTH, TrivialDecorator::new());
    // `<hr>` renders as a full-width rule.
    if !rendered.contains('\u{2500}') {
        return rendered;
    }
    rendered
        .lines()
        .filter(|line| line.is_empty() || line.chars().any(|c| c != '\u{2500}'))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Windows-1252 code points for bytes 0x80..=0x9F (None where the code page is undefined).
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'), Some('\u{201E}'), Some('\u{2026}'),
    Some('\u{2020}'), Some('\u{2021}'), Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'),
    Some('\u{2039}'), Some('\u{0152}'), None, Some('\u{017D}'), None, None, Some('\u{2018}'),
    Some('\u{2019}'), Some('\u{201C}'), Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'),
    Some('\u{2014}'), Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
    Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
];

fn cp1252_byte(c: char) -> Option<u8> {
    let cp = c as u32;
    if cp < 0x80 || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    if (0x80..=0x9F).contains(&cp) {
        // C1 controls show up when the text went through Latin-1 rather than cp1252.
        return Some(cp as u8);
    }
    CP1252_HIGH
        .iter()
        .position(|m| *m == Some(c))
        .map(|i| 0x80 + i as u8)
}

/// Signs of UTF-8 that was decoded as Latin-1/cp1252 (`Ã©`, `â€™`, `Â `).
fn looks_mojibaked(s: &str) -> bool {
    s.chars().any(|c| matches!(c, 'Ã' | 'Â' | 'â' | 'Ð' | 'Ñ' | 'Ø' | 'Ù'))
}

/// Best-effort repair of text that was UTF-8 encoded, then mis-decoded as cp1252/Latin-1.
///
/// Works per whitespace-separated word so that a single correct non-ASCII word does not
/// block the repair of its neighbours. Never fails: anything that does not round-trip
/// cleanly is returned unchanged.
pub fn fix_encoding(s: &str) -> String {
    if s.is_ascii() || !looks_mojibaked(s) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut word = String::new();
    for c in s.chars() {
        if c.is_whitespace() && c != '\u{A0}' {
            out.push_str(&fix_word(&word));
            word.clear();
            out.push(c);
        } else {
            word.push(c);
        }
    }
    out.push_str(&fix_word(&word));
    out
}

fn fix_word(word: &str) -> Cow<'_, str> {
    if word.is_ascii() || !looks_mojibaked(word) {
        return Cow::Borrowed(word);
    }
    let bytes: Option<Vec<u8>> = word.chars().map(cp1252_byte).collect();
    match bytes.map(String::from_utf8) {
        Some(Ok(fixed)) if fixed.chars().count() < word.chars().count() => Cow::Owned(fixed),
        _ => Cow::Borrowed(word),
    }
}
