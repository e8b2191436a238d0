use ammonia::Builder;
use comrak::{markdown_to_html, Options};
use std::collections::HashSet;

fn options() -> Options<'static> {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.render.unsafe_ = true; // ammonia sanitizes afterwards
    options
}

/// Render a post body (Markdown) to sanitized HTML.
pub fn render_markdown(raw: &str) -> String {
    let html = markdown_to_html(raw, &options());
    sanitize_html(&html)
}

/// Plain-text teaser of a post body for listing cards, cut at a word
/// boundary and suffixed with an ellipsis when shortened.
pub fn excerpt(raw: &str, max_chars: usize) -> String {
    let html = markdown_to_html(raw, &options());
    let text = Builder::empty().clean(&html).to_string();
    // `&amp;` last, so escaped entities in the source stay literal.
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    let words: Vec<&str> = text.split_whitespace().collect();
    let collapsed = words.join(" ");

    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }

    let mut out = String::new();
    for word in words {
        let extra = if out.is_empty() { 0 } else { 1 };
        if out.chars().count() + extra + word.chars().count() > max_chars {
            break;
        }
        if extra == 1 {
            out.push(' ');
        }
        out.push_str(word);
    }
    if out.is_empty() {
        out = collapsed.chars().take(max_chars).collect();
    }
    out.push('…');
    out
}

fn sanitize_html(html: &str) -> String {
    let extra_tags: HashSet<&str> = [
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "pre",
        "code",
        "blockquote",
        "hr",
        "table",
        "thead",
        "tbody",
        "tr",
        "th",
        "td",
        "img",
        "del",
        "s",
    ]
    .iter()
    .copied()
    .collect();

    let url_schemes: HashSet<&str> = ["http", "https", "mailto"].iter().copied().collect();

    let mut builder = Builder::default();
    builder.add_tags(&extra_tags);

    builder.add_tag_attributes("a", &["href", "title"]);
    builder.add_tag_attributes("img", &["src", "alt", "title"]);
    builder.add_tag_attributes("code", &["class"]);
    builder.add_tag_attributes("td", &["align"]);
    builder.add_tag_attributes("th", &["align"]);

    builder.url_schemes(url_schemes);
    builder.link_rel(Some("noopener noreferrer"));

    builder.clean(html).to_string()
}
