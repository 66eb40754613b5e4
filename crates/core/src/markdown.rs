//! Markdown subset used for lecturer answers and the lecture summary.
//!
//! The input is HTML-escaped first (`&`, `<`, `>`), so nothing from the raw
//! text can open a tag. On top of the escaped text the renderer recognizes:
//!
//! * blocks, one per line:
//!   - `- item` lines, consecutive ones grouped into a single `<ul>`;
//!   - `# `, `## `, `### ` headings rendered as `<div class="md-h1|2|3">`;
//!   - everything else is a plain line;
//! * inline spans, scanned left to right:
//!   - `[text](http(s)://url)` links, opened in a new tab;
//!   - `` `code` ``, content kept literal;
//!   - `**strong**` / `__strong__`;
//!   - `*em*` / `_em_`, only when delimited by whitespace or the line edges.
//!
//! Lines are separated by `<br/>` except after a list, whose closing `</ul>`
//! already breaks the flow. Unmatched markers stay literal.

pub fn render_markdown(src: &str) -> String {
    let escaped = escape_html(src);
    let mut out = String::with_capacity(escaped.len() + 32);
    let mut in_list = false;
    let mut need_break = false;

    for line in escaped.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if let Some(item) = line.strip_prefix("- ") {
            if !in_list {
                if need_break {
                    out.push_str("<br/>");
                }
                out.push_str("<ul>");
                in_list = true;
            }
            out.push_str("<li>");
            render_inline(item, &mut out);
            out.push_str("</li>");
            need_break = false;
            continue;
        }

        if in_list {
            out.push_str("</ul>");
            in_list = false;
        } else if need_break {
            out.push_str("<br/>");
        }

        match heading(line) {
            Some((level, text)) => {
                out.push_str(&format!("<div class=\"md-h{}\">", level));
                render_inline(text, &mut out);
                out.push_str("</div>");
            }
            None => render_inline(line, &mut out),
        }
        need_break = true;
    }

    if in_list {
        out.push_str("</ul>");
    }
    out
}

pub fn escape_html(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    for c in src.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.bytes().take_while(|b| *b == b'#').count();
    if !(1..=3).contains(&level) {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with(&[' ', '\t'][..]) {
        return None;
    }
    let text = rest.trim();
    if text.is_empty() { None } else { Some((level, text)) }
}

fn render_inline(text: &str, out: &mut String) {
    let chars: Vec<char> = text.chars().collect();
    render_span(&chars, true, out);
}

fn render_span(chars: &[char], allow_links: bool, out: &mut String) {
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if c == '[' && allow_links {
            if let Some((label, url, next)) = link_at(chars, i) {
                out.push_str("<a href=\"");
                out.push_str(&url.replace('"', "&quot;"));
                out.push_str("\" target=\"_blank\" rel=\"noopener\">");
                render_span(label, false, out);
                out.push_str("</a>");
                i = next;
                continue;
            }
        }

        if c == '`' {
            if let Some(close) = find_from(chars, i + 1, |ch| ch == '`') {
                if close > i + 1 {
                    out.push_str("<code>");
                    out.extend(&chars[i + 1..close]);
                    out.push_str("</code>");
                    i = close + 1;
                    continue;
                }
            }
        }

        if (c == '*' || c == '_') && chars.get(i + 1) == Some(&c) {
            if let Some(close) = strong_close(chars, i + 2, c) {
                out.push_str("<strong>");
                render_span(&chars[i + 2..close], allow_links, out);
                out.push_str("</strong>");
                i = close + 2;
                continue;
            }
            out.push(c);
            out.push(c);
            i += 2;
            continue;
        }

        if (c == '*' || c == '_') && (i == 0 || chars[i - 1].is_whitespace()) {
            if let Some(close) = em_close(chars, i + 1, c) {
                out.push_str("<em>");
                render_span(&chars[i + 1..close], allow_links, out);
                out.push_str("</em>");
                i = close + 1;
                continue;
            }
        }

        out.push(c);
        i += 1;
    }
}

fn find_from(chars: &[char], from: usize, pred: impl Fn(char) -> bool) -> Option<usize> {
    chars
        .get(from..)?
        .iter()
        .position(|c| pred(*c))
        .map(|p| p + from)
}

/// `[label](http...)` starting at `open`; returns label, url and the index after `)`.
fn link_at(chars: &[char], open: usize) -> Option<(&[char], String, usize)> {
    let close = find_from(chars, open + 1, |c| c == ']' || c == '[')?;
    if chars[close] != ']' || close == open + 1 || chars.get(close + 1) != Some(&'(') {
        return None;
    }
    let url_start = close + 2;
    let url_end = find_from(chars, url_start, |c| c == ')' || c.is_whitespace())?;
    if chars[url_end] != ')' {
        return None;
    }
    let url: String = chars[url_start..url_end].iter().collect();
    if !(url.starts_with("http:") || url.starts_with("https:")) {
        return None;
    }
    Some((&chars[open + 1..close], url, url_end + 1))
}

/// Closing pair for `**`/`__` with non-empty content free of the marker char.
fn strong_close(chars: &[char], from: usize, marker: char) -> Option<usize> {
    let close = find_from(chars, from, |c| c == marker)?;
    (close > from && chars.get(close + 1) == Some(&marker)).then_some(close)
}

fn em_close(chars: &[char], from: usize, marker: char) -> Option<usize> {
    let close = find_from(chars, from, |c| c == marker)?;
    let boundary = chars.get(close + 1).is_none_or(|c| c.is_whitespace());
    (close > from && boundary).then_some(close)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_and_code() {
        assert_eq!(
            render_markdown("**bold** and `code`"),
            "<strong>bold</strong> and <code>code</code>"
        );
    }

    #[test]
    fn raw_tags_are_escaped() {
        let html = render_markdown("<script>alert('x')</script> & **<b>**");
        assert_eq!(
            html,
            "&lt;script&gt;alert('x')&lt;/script&gt; &amp; <strong>&lt;b&gt;</strong>"
        );
        let stripped = html
            .replace("<strong>", "")
            .replace("</strong>", "");
        assert!(!stripped.contains('<') && !stripped.contains('>'));
    }

    #[test]
    fn emphasis_needs_word_boundaries() {
        assert_eq!(render_markdown("an *important* word"), "an <em>important</em> word");
        assert_eq!(render_markdown("_lead_ in"), "<em>lead</em> in");
        assert_eq!(render_markdown("a*b*c and snake_case_name"), "a*b*c and snake_case_name");
        assert_eq!(render_markdown("__strong__"), "<strong>strong</strong>");
    }

    #[test]
    fn code_content_stays_literal() {
        assert_eq!(render_markdown("`**x**`"), "<code>**x**</code>");
        assert_eq!(render_markdown("unclosed `tick"), "unclosed `tick");
    }

    #[test]
    fn links_only_for_http() {
        assert_eq!(
            render_markdown("see [docs](https://example.org/a?b=1&c=2)"),
            "see <a href=\"https://example.org/a?b=1&amp;c=2\" target=\"_blank\" rel=\"noopener\">docs</a>"
        );
        assert_eq!(
            render_markdown("[x](javascript:alert(1))"),
            "[x](javascript:alert(1))"
        );
        assert_eq!(
            render_markdown("[x](https://a.io/\"onmouseover=\"y)"),
            "<a href=\"https://a.io/&quot;onmouseover=&quot;y\" target=\"_blank\" rel=\"noopener\">x</a>"
        );
    }

    #[test]
    fn headings_and_breaks() {
        assert_eq!(
            render_markdown("## Title\nbody\n### Sub"),
            "<div class=\"md-h2\">Title</div><br/>body<br/><div class=\"md-h3\">Sub</div>"
        );
        assert_eq!(render_markdown("#### too deep"), "#### too deep");
        assert_eq!(render_markdown("#hashtag"), "#hashtag");
    }

    #[test]
    fn lists_group_consecutive_items() {
        assert_eq!(
            render_markdown("Steps:\n- one\n- **two**\nDone"),
            "Steps:<br/><ul><li>one</li><li><strong>two</strong></li></ul>Done"
        );
        assert_eq!(
            render_markdown("- a\n\n- b"),
            "<ul><li>a</li></ul><br/><ul><li>b</li></ul>"
        );
    }

    #[test]
    fn empty_input() {
        assert_eq!(render_markdown(""), "");
        assert_eq!(render_markdown("a\n\nb"), "a<br/><br/>b");
    }
}
