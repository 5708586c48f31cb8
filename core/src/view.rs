//! A plain view tree: elements carrying attributes, a [`Style`] and children.
//!
//! Pages are pure functions from session state to a [`Node`]. The tree can be
//! serialized as JSON or rendered to an HTML document; pseudo-state styles
//! (hover, focus, placeholder) are lifted into generated classes because they
//! cannot be expressed inline.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use crate::theme::{Style, css_declarations};

/// Elements rendered without a closing tag.
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "meta"];

const DOCUMENT_CSS: &str = "@keyframes spin { from { transform: rotate(0deg); } to { transform: rotate(360deg); } }\n\
body { margin: 0; }\n\
* { box-sizing: border-box; }\n";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Element(Element),
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub tag: &'static str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Style::is_empty")]
    pub style: Style,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

pub fn text(s: impl Into<String>) -> Node {
    Node::Text { text: s.into() }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        text(s)
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        text(s)
    }
}

impl Element {
    #[must_use]
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: BTreeMap::new(),
            style: Style::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    /// A boolean attribute such as `disabled`, present only when `on`.
    #[must_use]
    pub fn flag(mut self, key: &str, on: bool) -> Self {
        if on {
            self.attrs.insert(key.to_string(), String::new());
        } else {
            self.attrs.remove(key);
        }
        self
    }

    #[must_use]
    pub fn style(mut self, style: Style) -> Self {
        self.style = std::mem::take(&mut self.style).merge(style);
        self
    }

    #[must_use]
    pub fn css(mut self, key: &str, value: impl Into<String>) -> Self {
        self.style.props.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    #[must_use]
    pub fn maybe_child(mut self, node: Option<impl Into<Node>>) -> Self {
        if let Some(node) = node {
            self.children.push(node.into());
        }
        self
    }

    #[must_use]
    pub fn children(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(nodes);
        self
    }
}

impl Node {
    /// Concatenated text of this node and all descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text { text } => out.push_str(text),
            Node::Element(el) => {
                for child in &el.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Depth-first search for the first element matching `pred`.
    pub fn find(&self, pred: &impl Fn(&Element) -> bool) -> Option<&Element> {
        match self {
            Node::Text { .. } => None,
            Node::Element(el) => {
                if pred(el) {
                    return Some(el);
                }
                el.children.iter().find_map(|c| c.find(pred))
            }
        }
    }
}

#[derive(Default)]
struct HtmlRenderer {
    out: String,
    rules: Vec<String>,
    next_class: usize,
}

impl HtmlRenderer {
    fn node(&mut self, node: &Node) {
        match node {
            Node::Text { text } => self.out.push_str(&html_escape::encode_text(text)),
            Node::Element(el) => self.element(el),
        }
    }

    fn element(&mut self, el: &Element) {
        let mut attrs = el.attrs.clone();

        if !el.style.states.is_empty() {
            let class = format!("dk{}", self.next_class);
            self.next_class += 1;
            for (state, props) in &el.style.states {
                self.rules.push(format!(
                    ".{class}{} {{ {} }}",
                    state.selector_suffix(),
                    css_declarations(props)
                ));
            }
            attrs
                .entry("class".to_string())
                .and_modify(|c| {
                    c.push(' ');
                    c.push_str(&class);
                })
                .or_insert(class);
        }
        if !el.style.props.is_empty() {
            attrs.insert("style".to_string(), css_declarations(&el.style.props));
        }

        let _ = write!(self.out, "<{}", el.tag);
        for (key, value) in &attrs {
            if value.is_empty() {
                let _ = write!(self.out, " {key}");
            } else {
                let _ = write!(
                    self.out,
                    " {key}=\"{}\"",
                    html_escape::encode_double_quoted_attribute(value)
                );
            }
        }
        self.out.push('>');

        if VOID_ELEMENTS.contains(&el.tag) {
            return;
        }
        for child in &el.children {
            self.node(child);
        }
        let _ = write!(self.out, "</{}>", el.tag);
    }
}

/// Render a fragment. Returns the markup and the generated pseudo-state rules.
#[must_use]
pub fn render_fragment(node: &Node) -> (String, Vec<String>) {
    let mut renderer = HtmlRenderer::default();
    renderer.node(node);
    (renderer.out, renderer.rules)
}

/// Render a complete HTML document around `body`.
#[must_use]
pub fn render_document(title: &str, body: &Node) -> String {
    let (markup, rules) = render_fragment(body);
    let mut css = String::from(DOCUMENT_CSS);
    for rule in rules {
        css.push_str(&rule);
        css.push('\n');
    }
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
<title>{}</title>\n<style>\n{css}</style>\n</head>\n<body>\n{markup}\n</body>\n</html>\n",
        html_escape::encode_text(title)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Pseudo;

    #[test]
    fn test_render_escapes_text_and_attributes() {
        let node: Node = Element::new("p")
            .attr("title", "say \"hi\"")
            .child("<script>alert(1)</script> & more")
            .into();
        let (html, rules) = render_fragment(&node);
        assert_eq!(
            html,
            "<p title=\"say &quot;hi&quot;\">&lt;script&gt;alert(1)&lt;/script&gt; &amp; more</p>"
        );
        assert!(rules.is_empty());
    }

    #[test]
    fn test_render_void_and_boolean_attributes() {
        let node: Node = Element::new("input")
            .attr("name", "title")
            .flag("disabled", true)
            .flag("required", false)
            .into();
        let (html, _) = render_fragment(&node);
        assert_eq!(html, "<input disabled name=\"title\">");
    }

    #[test]
    fn test_render_inline_style_and_pseudo_classes() {
        let node: Node = Element::new("div")
            .attr("class", "card")
            .style(
                Style::new()
                    .set("padding", "1rem")
                    .on(Pseudo::Hover, "background_color", "#111"),
            )
            .child(Element::new("span").style(Style::new().on(Pseudo::Focus, "outline", "none")))
            .into();
        let (html, rules) = render_fragment(&node);
        assert!(html.starts_with("<div class=\"card dk0\" style=\"padding: 1rem\">"));
        assert!(html.contains("<span class=\"dk1\"></span>"));
        assert_eq!(
            rules,
            vec![
                ".dk0:hover { background-color: #111 }".to_string(),
                ".dk1:focus { outline: none }".to_string(),
            ]
        );
    }

    #[test]
    fn test_render_document_collects_rules() {
        let body: Node = Element::new("main")
            .style(Style::new().on(Pseudo::Placeholder, "color", "#777"))
            .into();
        let doc = render_document("Tasks & Weather", &body);
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>Tasks &amp; Weather</title>"));
        assert!(doc.contains(".dk0::placeholder { color: #777 }"));
        assert!(doc.contains("@keyframes spin"));
    }

    #[test]
    fn test_text_content_and_find() {
        let node: Node = Element::new("div")
            .child(Element::new("h1").child("Hello"))
            .child(Element::new("button").attr("name", "go").child(" world"))
            .into();
        assert_eq!(node.text_content(), "Hello world");
        let button = node.find(&|el| el.tag == "button").unwrap();
        assert_eq!(button.attrs["name"], "go");
        assert!(node.find(&|el| el.tag == "table").is_none());
    }

    #[test]
    fn test_serializes_as_tagged_tree() {
        let node: Node = Element::new("p").child("hi").into();
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "element");
        assert_eq!(json["tag"], "p");
        assert_eq!(json["children"][0]["type"], "text");
        assert_eq!(json["children"][0]["text"], "hi");
    }
}
