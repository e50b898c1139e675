//! Visible-text helpers shared by the markup tiers.

use std::collections::HashMap;
use std::sync::LazyLock;

use ego_tree::{NodeId, NodeRef};
use ego_tree::iter::Edge;
use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose contents are never visible text.
const INVISIBLE: &[&str] = &["script", "style", "noscript", "template", "head", "svg"];

/// Elements that start a new line of text.
const BLOCK: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol",
    "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// Visible text of `el`, one line per block element, whitespace collapsed.
pub fn block_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    let mut hidden: Option<NodeId> = None;

    for edge in el.traverse() {
        match edge {
            Edge::Open(node) => {
                if hidden.is_some() || node.id() == el.id() {
                    continue;
                }
                match node.value() {
                    Node::Text(text) => raw.push_str(text),
                    Node::Element(element) if INVISIBLE.contains(&element.name()) => {
                        hidden = Some(node.id());
                    }
                    Node::Element(element) if BLOCK.contains(&element.name()) => raw.push('\n'),
                    _ => {}
                }
            }
            Edge::Close(node) => {
                if hidden == Some(node.id()) {
                    hidden = None;
                } else if hidden.is_none()
                    && node.id() != el.id()
                    && let Node::Element(element) = node.value()
                    && BLOCK.contains(&element.name())
                {
                    raw.push('\n');
                }
            }
        }
    }
    tidy(&raw)
}

/// Visible text of the document body (or the whole document when there is no body).
pub fn body_text(doc: &Html) -> String {
    let root = doc
        .select(&BODY)
        .next()
        .unwrap_or_else(|| doc.root_element());
    block_text(root)
}

/// Non-whitespace character counts of one subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharCounts {
    /// Visible text characters.
    pub text: usize,
    /// Of which inside `<a>` elements.
    pub links: usize,
}

/// Character counts for every node of `doc`, computed in one bottom-up pass.
///
/// Pre-order visits a parent before its children, so walking that order
/// backwards sees every child first.
pub fn char_counts(doc: &Html) -> HashMap<NodeId, CharCounts> {
    let order: Vec<_> = doc.tree.root().descendants().collect();
    let mut counts: HashMap<NodeId, CharCounts> = HashMap::with_capacity(order.len());

    for node in order.into_iter().rev() {
        let own = match node.value() {
            Node::Text(text) => CharCounts {
                text: text.chars().filter(|c| !c.is_whitespace()).count(),
                links: 0,
            },
            Node::Element(element) if INVISIBLE.contains(&element.name()) => CharCounts::default(),
            Node::Element(element) if element.name() == "a" => {
                let text = sum_children(node, &counts).text;
                CharCounts { text, links: text }
            }
            _ => sum_children(node, &counts),
        };
        counts.insert(node.id(), own);
    }
    counts
}

fn sum_children(node: NodeRef<'_, Node>, counts: &HashMap<NodeId, CharCounts>) -> CharCounts {
    node.children()
        .filter_map(|child| counts.get(&child.id()))
        .fold(CharCounts::default(), |acc, c| CharCounts {
            text: acc.text + c.text,
            links: acc.links + c.links,
        })
}

/// Deepest element nesting in `doc`.
pub fn max_depth(doc: &Html) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0;
    for edge in doc.tree.root().traverse() {
        match edge {
            Edge::Open(_) => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            Edge::Close(_) => depth -= 1,
        }
    }
    deepest
}

/// Collapse whitespace within each line and drop empty lines.
pub fn tidy(raw: &str) -> String {
    raw.lines()
        .map(collapse_ws)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim every line and squeeze runs of blank lines down to one.
pub fn collapse_blank_lines(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() && out.last().is_none_or(|prev| prev.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}
