//! HTML helpers built on `scraper`: text-block flattening and minification.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{node::Node, ElementRef, Html};

/// Elements whose content never counts as text.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Inline emphasis unwrapped before text extraction for analysis.
pub const EMPHASIS_TAGS: &[&str] = &["strong", "b", "i"];

/// Inline tags unwrapped when de-tagging metadata blocks.
pub const UNTAG_INLINE_TAGS: &[&str] = &["a", "strong", "b", "i"];

/// Flattens an HTML fragment into trimmed, non-empty text blocks.
///
/// Tags listed in `inline` are unwrapped so their text joins the surrounding
/// run; every other element boundary starts a new block.
pub fn text_blocks(raw_html: &str, inline: &[&str]) -> Vec<String> {
    let fragment = Html::parse_fragment(raw_html);
    let mut blocks = Vec::new();
    let mut current = String::new();
    collect_blocks(fragment.root_element(), inline, &mut current, &mut blocks);
    flush_block(&mut current, &mut blocks);
    blocks
}

fn collect_blocks(
    element: ElementRef<'_>,
    inline: &[&str],
    current: &mut String,
    blocks: &mut Vec<String>,
) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => current.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                if inline.contains(&name) {
                    collect_blocks(child_el, inline, current, blocks);
                } else {
                    flush_block(current, blocks);
                    collect_blocks(child_el, inline, current, blocks);
                    flush_block(current, blocks);
                }
            }
            _ => {}
        }
    }
}

fn flush_block(current: &mut String, blocks: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        blocks.push(trimmed.to_string());
    }
    current.clear();
}

/// Plain text with inline links and emphasis unwrapped, one block per line,
/// runs of non-newline whitespace collapsed to a single space.
pub fn untag_html(raw_html: &str) -> String {
    if raw_html.is_empty() {
        return String::new();
    }
    static SPACES: OnceLock<Regex> = OnceLock::new();
    let spaces = SPACES.get_or_init(|| Regex::new(r"[^\S\n]+").unwrap());
    let joined = text_blocks(raw_html, UNTAG_INLINE_TAGS).join("\n");
    spaces.replace_all(&joined, " ").into_owned()
}

/// Minified HTML: comments, scripts, styles, event handlers and inline
/// style attributes removed; whitespace runs collapsed to one space and
/// indentation-only text (whitespace containing a line break) dropped.
pub fn condense_html(raw_html: &str) -> String {
    if raw_html.is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(raw_html);
    let mut out = String::with_capacity(raw_html.len());
    write_children(fragment.root_element(), &mut out);
    out.trim().to_string()
}

fn write_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                if text.trim().is_empty() && (text.contains('\n') || out.is_empty()) {
                    continue;
                }
                push_escaped_text(&collapse_whitespace(text), out);
            }
            Node::Element(el) => {
                let name = el.name();
                if name == "script" || name == "style" {
                    continue;
                }
                out.push('<');
                out.push_str(name);
                for (attr, value) in el.attrs() {
                    if attr == "style" || attr.starts_with("on") {
                        continue;
                    }
                    out.push(' ');
                    out.push_str(attr);
                    out.push_str("=\"");
                    push_escaped_attr(value, out);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&name) {
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    write_children(child_el, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                collapsed.push(' ');
            }
            in_space = true;
        } else {
            collapsed.push(c);
            in_space = false;
        }
    }
    collapsed
}

fn push_escaped_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn push_escaped_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_blocks_unwraps_inline_tags() {
        let html = "<div><p>We value <strong>ownership</strong> and <b>craft</b>.</p><p>Apply today</p></div>";
        let blocks = text_blocks(html, EMPHASIS_TAGS);
        assert_eq!(blocks, vec!["We value ownership and craft.", "Apply today"]);
    }

    #[test]
    fn test_text_blocks_breaks_on_non_inline_tags() {
        let blocks = text_blocks("<p>Line one<br>Line two</p>", EMPHASIS_TAGS);
        assert_eq!(blocks, vec!["Line one", "Line two"]);
    }

    #[test]
    fn test_text_blocks_skips_scripts() {
        let blocks = text_blocks("<p>Visible</p><script>var x = 1;</script>", EMPHASIS_TAGS);
        assert_eq!(blocks, vec!["Visible"]);
    }

    #[test]
    fn test_untag_html_unwraps_links_and_collapses_spaces() {
        let html = "<div>Role Type\n</div><div>Full   time <a href='/x'>benefits</a></div>";
        assert_eq!(untag_html(html), "Role Type\nFull time benefits");
    }

    #[test]
    fn test_untag_html_empty() {
        assert_eq!(untag_html(""), "");
    }

    #[test]
    fn test_condense_html_strips_comments_scripts_and_whitespace() {
        let html = r#"
            <div class="jd" onclick="track()" style="color:red">
                <!-- tracking -->
                <script>alert(1)</script>
                <p>Build   tools</p>
                <ul>
                    <li>Rust</li>
                    <li>Go</li>
                </ul>
            </div>"#;
        assert_eq!(
            condense_html(html),
            r#"<div class="jd"><p>Build tools</p><ul><li>Rust</li><li>Go</li></ul></div>"#
        );
    }

    #[test]
    fn test_condense_html_keeps_inline_spacing_and_escapes() {
        let html = "<p><b>Pay</b> <i>&amp; benefits</i></p><br>";
        assert_eq!(
            condense_html(html),
            "<p><b>Pay</b> <i>&amp; benefits</i></p><br>"
        );
    }
}
