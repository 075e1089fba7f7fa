//! Rendering of structured text (rich text and title fields) to HTML and
//! plain text.
//!
//! Span offsets are UTF-16 code unit positions, as produced by the Prismic
//! editor. Spans are nested when one lies within another; a span overlapping
//! the end of its predecessor is clipped to start where the predecessor ends.

use crate::core::link::link_url;
use crate::domain::model::{LinkField, Span, StructuredTextBlock};
use crate::domain::ports::{
    HtmlElement, HtmlSerializer, HtmlSerializerFactory, LinkResolver, ResolverContext,
};
use serde_json::Value;

/// Uses the built-in rendering for every element.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHtmlSerializerFactory;

impl HtmlSerializerFactory for DefaultHtmlSerializerFactory {
    fn html_serializer(&self, _ctx: ResolverContext<'_>) -> Option<Box<dyn HtmlSerializer + '_>> {
        None
    }
}

/// Block texts joined by a single space.
pub fn as_text(blocks: &[StructuredTextBlock]) -> String {
    blocks
        .iter()
        .map(|block| block.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn as_html(
    blocks: &[StructuredTextBlock],
    link_resolver: &dyn LinkResolver,
    serializer: Option<&dyn HtmlSerializer>,
) -> String {
    let renderer = Renderer {
        link_resolver,
        serializer,
    };

    let mut html = String::new();
    let mut index = 0;
    while index < blocks.len() {
        let list_tag = match blocks[index].block_type.as_str() {
            "list-item" => Some("ul"),
            "o-list-item" => Some("ol"),
            _ => None,
        };

        match list_tag {
            Some(tag) => {
                let item_type = &blocks[index].block_type;
                let mut items = String::new();
                while index < blocks.len() && &blocks[index].block_type == item_type {
                    items.push_str(&renderer.block(&blocks[index]));
                    index += 1;
                }
                html.push_str(&format!("<{tag}>{items}</{tag}>"));
            }
            None => {
                html.push_str(&renderer.block(&blocks[index]));
                index += 1;
            }
        }
    }
    html
}

struct Renderer<'a> {
    link_resolver: &'a dyn LinkResolver,
    serializer: Option<&'a dyn HtmlSerializer>,
}

impl Renderer<'_> {
    fn block(&self, block: &StructuredTextBlock) -> String {
        let units: Vec<u16> = block.text.encode_utf16().collect();
        let mut spans: Vec<&Span> = block.spans.iter().collect();
        spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        let children = self.spans(&units, 0, units.len(), &spans);

        self.serializer
            .and_then(|s| s.serialize(HtmlElement::Block(block), &children))
            .unwrap_or_else(|| self.default_block(block, &children))
    }

    fn spans(&self, units: &[u16], start: usize, end: usize, spans: &[&Span]) -> String {
        let mut html = String::new();
        let mut cursor = start;
        let mut pending: Vec<&Span> = spans.to_vec();

        while !pending.is_empty() {
            let span = pending.remove(0);
            let span_start = span.start.clamp(cursor, end);
            let span_end = span.end.clamp(span_start, end);

            // Spans inside this one nest; spans crossing its end stay siblings.
            let (children, rest): (Vec<&Span>, Vec<&Span>) = pending
                .into_iter()
                .partition(|other| other.start < span_end && other.end <= span_end);
            pending = rest;

            html.push_str(&escape_text(&String::from_utf16_lossy(&units[cursor..span_start])));

            let inner = self.spans(units, span_start, span_end, &children);
            let text = String::from_utf16_lossy(&units[span_start..span_end]);
            let rendered = self
                .serializer
                .and_then(|s| s.serialize(HtmlElement::Span { span, text: &text }, &inner))
                .unwrap_or_else(|| self.default_span(span, &inner));
            html.push_str(&rendered);

            cursor = span_end;
        }

        html.push_str(&escape_text(&String::from_utf16_lossy(&units[cursor..end])));
        html
    }

    fn default_block(&self, block: &StructuredTextBlock, children: &str) -> String {
        match block.block_type.as_str() {
            "heading1" => format!("<h1>{children}</h1>"),
            "heading2" => format!("<h2>{children}</h2>"),
            "heading3" => format!("<h3>{children}</h3>"),
            "heading4" => format!("<h4>{children}</h4>"),
            "heading5" => format!("<h5>{children}</h5>"),
            "heading6" => format!("<h6>{children}</h6>"),
            "paragraph" => format!("<p>{children}</p>"),
            "preformatted" => format!("<pre>{children}</pre>"),
            "list-item" | "o-list-item" => format!("<li>{children}</li>"),
            "image" => self.image_block(block),
            "embed" => embed_block(block),
            _ => children.to_string(),
        }
    }

    fn image_block(&self, block: &StructuredTextBlock) -> String {
        let attr = |key: &str| {
            block
                .extra
                .get(key)
                .and_then(Value::as_str)
                .map(escape_attr)
                .unwrap_or_default()
        };

        let img = format!(
            r#"<img src="{}" alt="{}" copyright="{}" />"#,
            attr("url"),
            attr("alt"),
            attr("copyright")
        );

        let link = block
            .extra
            .get("linkTo")
            .and_then(|value| serde_json::from_value::<LinkField>(value.clone()).ok());

        match link {
            Some(link) => format!(
                r#"<p class="block-img">{}{}</a></p>"#,
                self.anchor_open(&link),
                img
            ),
            None => format!(r#"<p class="block-img">{}</p>"#, img),
        }
    }

    fn default_span(&self, span: &Span, children: &str) -> String {
        match span.span_type.as_str() {
            "strong" => format!("<strong>{children}</strong>"),
            "em" => format!("<em>{children}</em>"),
            "hyperlink" => {
                let link = span
                    .data
                    .clone()
                    .and_then(|data| serde_json::from_value::<LinkField>(data).ok())
                    .unwrap_or_default();
                format!("{}{children}</a>", self.anchor_open(&link))
            }
            "label" => {
                let class = span
                    .data
                    .as_ref()
                    .and_then(|data| data.get("label"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                format!(r#"<span class="{}">{children}</span>"#, escape_attr(class))
            }
            _ => children.to_string(),
        }
    }

    fn anchor_open(&self, link: &LinkField) -> String {
        let href = escape_attr(&link_url(link, self.link_resolver));
        match link.target.as_deref() {
            Some(target) => format!(
                r#"<a href="{}" target="{}" rel="noopener">"#,
                href,
                escape_attr(target)
            ),
            None => format!(r#"<a href="{}">"#, href),
        }
    }
}

fn embed_block(block: &StructuredTextBlock) -> String {
    let oembed = block.extra.get("oembed");
    let field = |key: &str| {
        oembed
            .and_then(|o| o.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
    };

    format!(
        r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}">{}</div>"#,
        escape_attr(field("embed_url")),
        escape_attr(field("type")),
        escape_attr(field("provider_name")),
        field("html")
    )
}

fn escape_attr(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn escape_text(input: &str) -> String {
    escape_attr(input).replace('\n', "<br />")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::link::PathLinkResolver;
    use serde_json::json;

    fn blocks(value: Value) -> Vec<StructuredTextBlock> {
        serde_json::from_value(value).unwrap()
    }

    fn no_links() -> impl LinkResolver {
        |_: &LinkField| -> Option<String> { None }
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let field = blocks(json!([
            {"type": "heading1", "text": "Title", "spans": []},
            {"type": "paragraph", "text": "a < b & c", "spans": []}
        ]));

        assert_eq!(
            as_html(&field, &no_links(), None),
            "<h1>Title</h1><p>a &lt; b &amp; c</p>"
        );
        assert_eq!(as_text(&field), "Title a < b & c");
    }

    #[test]
    fn test_nested_spans() {
        let field = blocks(json!([{
            "type": "paragraph",
            "text": "bold and italic",
            "spans": [
                {"start": 0, "end": 15, "type": "strong"},
                {"start": 9, "end": 15, "type": "em"}
            ]
        }]));

        assert_eq!(
            as_html(&field, &no_links(), None),
            "<p><strong>bold and <em>italic</em></strong></p>"
        );
    }

    #[test]
    fn test_span_offsets_are_utf16() {
        let field = blocks(json!([{
            "type": "paragraph",
            "text": "😀 hi",
            "spans": [{"start": 3, "end": 5, "type": "em"}]
        }]));

        assert_eq!(as_html(&field, &no_links(), None), "<p>😀 <em>hi</em></p>");
    }

    #[test]
    fn test_lists_are_grouped() {
        let field = blocks(json!([
            {"type": "list-item", "text": "one", "spans": []},
            {"type": "list-item", "text": "two", "spans": []},
            {"type": "o-list-item", "text": "first", "spans": []},
            {"type": "paragraph", "text": "end", "spans": []}
        ]));

        assert_eq!(
            as_html(&field, &no_links(), None),
            "<ul><li>one</li><li>two</li></ul><ol><li>first</li></ol><p>end</p>"
        );
    }

    #[test]
    fn test_hyperlinks_use_resolver() {
        let field = blocks(json!([{
            "type": "paragraph",
            "text": "see post and site",
            "spans": [
                {"start": 4, "end": 8, "type": "hyperlink", "data": {"link_type": "Document", "id": "W1", "type": "post", "uid": "hello", "isBroken": false}},
                {"start": 13, "end": 17, "type": "hyperlink", "data": {"link_type": "Web", "url": "https://prismic.io", "target": "_blank"}}
            ]
        }]));

        let resolver = PathLinkResolver::new("/", false);
        assert_eq!(
            as_html(&field, &resolver, None),
            concat!(
                r#"<p>see <a href="/post/hello">post</a> and "#,
                r#"<a href="https://prismic.io" target="_blank" rel="noopener">site</a></p>"#
            )
        );
    }

    #[test]
    fn test_image_and_embed_blocks() {
        let field = blocks(json!([
            {"type": "image", "url": "https://images.prismic.io/a.png", "alt": "A \"quoted\" alt", "copyright": null, "dimensions": {"width": 1, "height": 1}},
            {"type": "embed", "oembed": {"embed_url": "https://youtu.be/x", "type": "video", "provider_name": "YouTube", "html": "<iframe></iframe>"}}
        ]));

        assert_eq!(
            as_html(&field, &no_links(), None),
            concat!(
                r#"<p class="block-img"><img src="https://images.prismic.io/a.png" alt="A &quot;quoted&quot; alt" copyright="" /></p>"#,
                r#"<div data-oembed="https://youtu.be/x" data-oembed-type="video" data-oembed-provider="YouTube"><iframe></iframe></div>"#
            )
        );
    }

    #[test]
    fn test_newlines_become_breaks_and_labels_become_spans() {
        let field = blocks(json!([{
            "type": "paragraph",
            "text": "line\ncode",
            "spans": [{"start": 5, "end": 9, "type": "label", "data": {"label": "codespan"}}]
        }]));

        assert_eq!(
            as_html(&field, &no_links(), None),
            r#"<p>line<br /><span class="codespan">code</span></p>"#
        );
    }

    #[test]
    fn test_custom_serializer_overrides_and_falls_back() {
        let field = blocks(json!([
            {"type": "heading1", "text": "Title", "spans": [{"start": 0, "end": 5, "type": "strong"}]},
            {"type": "paragraph", "text": "body", "spans": []}
        ]));

        let serializer = |element: HtmlElement<'_>, children: &str| -> Option<String> {
            match element.element_type() {
                "heading1" => Some(format!(r#"<h1 class="title">{}</h1>"#, children)),
                "strong" => Some(format!("<b>{}</b>", children)),
                _ => None,
            }
        };

        assert_eq!(
            as_html(&field, &no_links(), Some(&serializer)),
            r#"<h1 class="title"><b>Title</b></h1><p>body</p>"#
        );
    }

    #[test]
    fn test_span_inside_parent_survives_overlapping_sibling() {
        let field = blocks(json!([{
            "type": "paragraph",
            "text": "0123456789ABCDE",
            "spans": [
                {"start": 2, "end": 15, "type": "em"},
                {"start": 0, "end": 10, "type": "strong"},
                {"start": 3, "end": 5, "type": "label", "data": {"label": "x"}}
            ]
        }]));

        assert_eq!(
            as_html(&field, &no_links(), None),
            r#"<p><strong>012<span class="x">34</span>56789</strong><em>ABCDE</em></p>"#
        );
    }

    #[test]
    fn test_out_of_range_spans_are_clamped() {
        let field = blocks(json!([{
            "type": "paragraph",
            "text": "short",
            "spans": [{"start": 2, "end": 40, "type": "em"}]
        }]));

        assert_eq!(as_html(&field, &no_links(), None), "<p>sh<em>ort</em></p>");
    }
}
