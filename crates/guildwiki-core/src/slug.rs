//! URL slug canonicalisation.
//!
//! Two flavours exist because the two halves of the site were built with
//! different URL conventions:
//!
//! - [`server_slug`] keeps only `[a-z0-9-_]` and turns everything else into a
//!   hyphen, so a guild name written entirely in Cyrillic canonicalises to an
//!   empty string and the caller falls back to the guild ID.
//! - [`wiki_slug`] keeps Cyrillic `а-я` alongside Latin letters and digits,
//!   drops punctuation outright and joins words with hyphens.
//!
//! Both are idempotent: feeding a slug back in returns it unchanged.

/// Canonicalise a guild name into a server directory slug.
///
/// May return an empty string; see [`crate::SlugIndex::assign`] for the ID
/// fallback.
#[must_use]
pub fn server_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
            c
        } else {
            '-'
        };
        push_collapsing(&mut slug, c);
    }
    slug.trim_matches('-').to_string()
}

/// Canonicalise a wiki entity name into its URL slug.
#[must_use]
pub fn wiki_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        let c = if c.is_whitespace() {
            '-'
        } else if is_wiki_slug_char(c) {
            c
        } else {
            continue;
        };
        push_collapsing(&mut slug, c);
    }
    slug.trim_matches('-').to_string()
}

// `ё` sits outside the contiguous `а..=я` block and is dropped.
fn is_wiki_slug_char(c: char) -> bool {
    matches!(c, 'а'..='я' | 'a'..='z' | '0'..='9' | '-')
}

fn push_collapsing(slug: &mut String, c: char) {
    if c == '-' && slug.ends_with('-') {
        return;
    }
    slug.push(c);
}
