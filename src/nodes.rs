use std::sync::Arc;

use scraper::Html;
use ego_tree::NodeRef;
use scraper::node::Node as DomNode;

/// An owned node of the generated markup, ready for a UI layer to walk.
///
/// Comments and doctypes are dropped during conversion, only elements and
/// text survive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlNode {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<HtmlNode>,
    },
    Text(String),
}

impl HtmlNode {
    /// The element tag name, `None` for text nodes
    pub fn tag(&self) -> Option<&str> {
        match self {
            HtmlNode::Element { tag, .. } => Some(tag),
            HtmlNode::Text(_) => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            HtmlNode::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            HtmlNode::Text(_) => None,
        }
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        if let HtmlNode::Element { attrs, .. } = self {
            match attrs.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => *existing = value.to_owned(),
                None => attrs.push((name.to_owned(), value.to_owned())),
            }
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        if let HtmlNode::Element { attrs, .. } = self {
            attrs.retain(|(key, _)| key != name);
        }
    }

    pub fn children(&self) -> &[HtmlNode] {
        match self {
            HtmlNode::Element { children, .. } => children,
            HtmlNode::Text(_) => &[],
        }
    }

    /// Concatenated text of this node and its descendants
    pub fn text_content(&self) -> String {
        match self {
            HtmlNode::Text(text) => text.clone(),
            HtmlNode::Element { children, .. } => {
                children.iter().map(|c| c.text_content()).collect()
            }
        }
    }
}

/// A hook run over the generated node tree before it is handed back, invoked
/// once per node, parents first.
pub type Transformer = Arc<dyn Fn(&mut HtmlNode) + Send + Sync>;

/// Strips `tabindex` from `<pre>` elements, for UIs that manage focus
/// themselves.
pub fn remove_tab_index_from_pre(node: &mut HtmlNode) {
    if node.tag() == Some("pre") {
        node.remove_attr("tabindex");
    }
}

pub(crate) fn apply_transformers(nodes: &mut [HtmlNode], transformers: &[Transformer]) {
    if transformers.is_empty() {
        return;
    }
    for node in nodes.iter_mut() {
        visit(node, transformers);
    }
}

fn visit(node: &mut HtmlNode, transformers: &[Transformer]) {
    for transformer in transformers {
        transformer(node);
    }
    if let HtmlNode::Element { children, .. } = node {
        for child in children.iter_mut() {
            visit(child, transformers);
        }
    }
}

/// Parses an HTML fragment produced by the engine into owned nodes
pub(crate) fn parse_html(html: &str) -> Vec<HtmlNode> {
    let fragment = Html::parse_fragment(html);
    // parse_fragment wraps the content in an implicit <html> root
    fragment
        .root_element()
        .children()
        .filter_map(convert)
        .collect()
}

fn convert(node: NodeRef<'_, DomNode>) -> Option<HtmlNode> {
    match node.value() {
        DomNode::Text(text) => Some(HtmlNode::Text(text.text.to_string())),
        DomNode::Element(element) => Some(HtmlNode::Element {
            tag: element.name().to_owned(),
            attrs: element
                .attrs()
                .map(|(key, value)| (key.to_owned(), value.to_owned()))
                .collect(),
            children: node.children().filter_map(convert).collect(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_elements_text_and_attributes() {
        let nodes = parse_html(r#"<pre tabindex="0"><code>fn main() {}</code></pre>"#);
        assert_eq!(nodes.len(), 1);

        let pre = &nodes[0];
        assert_eq!(pre.tag(), Some("pre"));
        assert_eq!(pre.attr("tabindex"), Some("0"));
        assert_eq!(pre.children().len(), 1);
        assert_eq!(pre.children()[0].tag(), Some("code"));
        assert_eq!(pre.text_content(), "fn main() {}");
    }

    #[test]
    fn comments_are_dropped() {
        let nodes = parse_html("<!-- nope --><span>ok</span>");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].tag(), Some("span"));
    }

    #[test]
    fn transformer_removes_tab_index_from_pre() {
        let mut nodes = parse_html(r#"<div><pre tabindex="0">x</pre></div>"#);
        let transformers: Vec<Transformer> = vec![Arc::new(remove_tab_index_from_pre)];
        apply_transformers(&mut nodes, &transformers);

        let pre = &nodes[0].children()[0];
        assert_eq!(pre.tag(), Some("pre"));
        assert_eq!(pre.attr("tabindex"), None);
    }

    #[test]
    fn transformers_run_parents_first() {
        let mut nodes = parse_html("<pre><code>x</code></pre>");
        let seen = std::sync::Mutex::new(Vec::new());
        let seen_ref = Arc::new(seen);
        let log = Arc::clone(&seen_ref);
        let transformers: Vec<Transformer> = vec![Arc::new(move |node: &mut HtmlNode| {
            if let Some(tag) = node.tag() {
                log.lock().unwrap().push(tag.to_owned());
            }
        })];
        apply_transformers(&mut nodes, &transformers);
        assert_eq!(*seen_ref.lock().unwrap(), vec!["pre".to_owned(), "code".to_owned()]);
    }

    #[test]
    fn set_attr_replaces_and_appends() {
        let mut nodes = parse_html("<pre>x</pre>");
        nodes[0].set_attr("class", "ambra");
        assert_eq!(nodes[0].attr("class"), Some("ambra"));
        nodes[0].set_attr("class", "other");
        assert_eq!(nodes[0].attr("class"), Some("other"));
    }
}
