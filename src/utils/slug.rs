/// Lowercase ASCII slug: runs of anything that is not a letter or digit
/// collapse into a single `-`, with no leading or trailing dashes.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Slug for a new row, given a predicate telling which slugs are taken.
/// Falls back to `fallback` when the text has no usable characters and
/// appends `-2`, `-3`, ... until the slug is free.
pub fn unique_slug<F>(text: &str, fallback: &str, max_len: usize, mut taken: F) -> String
where
    F: FnMut(&str) -> bool,
{
    let base = base_slug(text, fallback, max_len);

    if !taken(&base) {
        return base;
    }

    let mut n = 2u32;
    loop {
        let suffix = format!("-{n}");
        let mut stem = base.clone();
        truncate(&mut stem, max_len.saturating_sub(suffix.len()));
        let candidate = format!("{stem}{suffix}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn base_slug(text: &str, fallback: &str, max_len: usize) -> String {
    let mut base = slugify(text);
    if base.is_empty() {
        base = fallback.to_string();
    }
    truncate(&mut base, max_len);
    base
}

/// Common prefix of every candidate [`unique_slug`] can produce for `text`,
/// for narrowing the set of existing slugs to load.
pub fn slug_prefix(text: &str, fallback: &str, max_len: usize) -> String {
    let mut prefix = base_slug(text, fallback, max_len);
    truncate(&mut prefix, max_len.saturating_sub(MAX_SUFFIX_LEN));
    prefix
}

const MAX_SUFFIX_LEN: usize = 8;

/// First path segments served by fixed routes. A post with one of these
/// slugs could never reach its detail page.
pub const RESERVED_SLUGS: [&str; 4] = ["api-docs", "healthz", "media", "swagger-ui"];

/// Whether `slug` is a built-in reserved segment or one of `extra`.
pub fn is_reserved(slug: &str, extra: &[String]) -> bool {
    RESERVED_SLUGS.contains(&slug) || extra.iter().any(|s| s == slug)
}

fn truncate(slug: &mut String, max_len: usize) {
    if slug.len() > max_len {
        slug.truncate(max_len);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
}
