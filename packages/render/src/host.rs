//! Render sink.
//!
//! [`HostTree`] is everything the engine needs from its hosting environment.
//! [`MemoryHost`] is an arena-backed implementation used for tests, for
//! server-side HTML output and as the reference behaviour for real hosts.

use crate::error::RenderResult;
use crate::handler::{HandlerRuntime, Invocation};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use stencil_tree::Method;

pub trait HostTree {
    type Node: Copy + Eq + Hash + Debug;

    fn create_element(&mut self, tag: &str) -> Self::Node;
    fn create_text(&mut self, text: &str) -> Self::Node;
    fn create_raw(&mut self, html: &str) -> Self::Node;

    fn set_attribute(&mut self, node: Self::Node, name: &str, value: &str);
    fn get_attribute(&self, node: Self::Node, name: &str) -> Option<String>;

    /// Appends `child`, detaching it from any previous parent first
    fn append_child(&mut self, parent: Self::Node, child: Self::Node);
    /// Inserts `child` right before `reference`, which must be a child of `parent`
    fn insert_before(&mut self, parent: Self::Node, child: Self::Node, reference: Self::Node);
    fn remove_child(&mut self, parent: Self::Node, child: Self::Node);

    fn children(&self, node: Self::Node) -> Vec<Self::Node>;
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;
    /// Top of the structure; marker lookups scan from here
    fn root(&self) -> Self::Node;
    /// Element tag; `None` for text and raw nodes
    fn tag(&self, node: Self::Node) -> Option<String>;

    /// Expose a component method as a callable member of a host element
    fn bind_method(&mut self, node: Self::Node, method: &Method);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostNode(usize);

impl fmt::Display for HostNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host#{}", self.0)
    }
}

#[derive(Debug, Clone)]
enum Content {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        children: Vec<HostNode>,
        methods: BTreeMap<String, Method>,
    },
    Text(String),
    Raw(String),
}

#[derive(Debug, Clone)]
struct HostEntry {
    content: Content,
    parent: Option<HostNode>,
}

/// In-memory host tree
#[derive(Debug, Clone)]
pub struct MemoryHost {
    entries: Vec<HostEntry>,
    root: HostNode,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub const ROOT_TAG: &'static str = "body";

    pub fn new() -> Self {
        let mut host = Self {
            entries: Vec::new(),
            root: HostNode(0),
        };
        host.root = host.create_element(Self::ROOT_TAG);
        host
    }

    fn push(&mut self, content: Content) -> HostNode {
        let node = HostNode(self.entries.len());
        self.entries.push(HostEntry {
            content,
            parent: None,
        });
        node
    }

    fn children_mut(&mut self, node: HostNode) -> Option<&mut Vec<HostNode>> {
        match &mut self.entries.get_mut(node.0)?.content {
            Content::Element { children, .. } => Some(children),
            _ => None,
        }
    }

    fn detach(&mut self, child: HostNode) {
        if let Some(parent) = self.entries.get(child.0).and_then(|entry| entry.parent) {
            if let Some(children) = self.children_mut(parent) {
                children.retain(|c| *c != child);
            }
            self.entries[child.0].parent = None;
        }
    }

    /// Names of the methods bound on a node
    pub fn methods(&self, node: HostNode) -> Vec<String> {
        match self.entries.get(node.0).map(|entry| &entry.content) {
            Some(Content::Element { methods, .. }) => methods.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Call a bound method through a runtime. Returns `false` when the node
    /// has no such method.
    pub fn call<R: HandlerRuntime<HostNode>>(
        &self,
        node: HostNode,
        name: &str,
        args: &[Value],
        runtime: &mut R,
    ) -> RenderResult<bool> {
        let Some(Content::Element { methods, .. }) = self.entries.get(node.0).map(|e| &e.content)
        else {
            return Ok(false);
        };
        let Some(method) = methods.get(name) else {
            return Ok(false);
        };

        runtime.invoke(
            &method.body,
            Invocation {
                event: name,
                node,
                component: Some(node),
                params: &method.params,
                args,
            },
        )?;
        Ok(true)
    }

    /// Pre-order search below (and including) `from`
    pub fn find_all(&self, from: HostNode, mut predicate: impl FnMut(HostNode) -> bool) -> Vec<HostNode> {
        let mut found = Vec::new();
        let mut stack = vec![from];
        while let Some(node) = stack.pop() {
            if predicate(node) {
                found.push(node);
            }
            stack.extend(self.children(node).into_iter().rev());
        }
        found
    }

    /// Concatenated text below a node; raw markup included verbatim
    pub fn text_content(&self, node: HostNode) -> String {
        match self.entries.get(node.0).map(|entry| &entry.content) {
            Some(Content::Text(text)) | Some(Content::Raw(text)) => text.clone(),
            Some(Content::Element { children, .. }) => {
                children.iter().map(|child| self.text_content(*child)).collect()
            }
            None => String::new(),
        }
    }

    pub fn to_html(&self, node: HostNode) -> String {
        let mut output = String::new();
        self.write_html(node, &mut output);
        output
    }

    pub fn inner_html(&self, node: HostNode) -> String {
        let mut output = String::new();
        for child in self.children(node) {
            self.write_html(child, &mut output);
        }
        output
    }

    fn write_html(&self, node: HostNode, output: &mut String) {
        let Some(entry) = self.entries.get(node.0) else {
            return;
        };
        match &entry.content {
            Content::Text(text) => output.push_str(&escape_html(text)),
            Content::Raw(html) => output.push_str(html),
            Content::Element {
                tag,
                attributes,
                children,
                ..
            } => {
                output.push('<');
                output.push_str(tag);
                for (name, value) in attributes {
                    output.push_str(&format!(" {}=\"{}\"", name, escape_html(value)));
                }
                if is_self_closing(tag) && children.is_empty() {
                    output.push('>');
                    return;
                }
                output.push('>');
                for child in children {
                    self.write_html(*child, output);
                }
                output.push_str(&format!("</{}>", tag));
            }
        }
    }
}

impl HostTree for MemoryHost {
    type Node = HostNode;

    fn create_element(&mut self, tag: &str) -> HostNode {
        self.push(Content::Element {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            methods: BTreeMap::new(),
        })
    }

    fn create_text(&mut self, text: &str) -> HostNode {
        self.push(Content::Text(text.to_string()))
    }

    fn create_raw(&mut self, html: &str) -> HostNode {
        self.push(Content::Raw(html.to_string()))
    }

    fn set_attribute(&mut self, node: HostNode, name: &str, value: &str) {
        if let Some(Content::Element { attributes, .. }) =
            self.entries.get_mut(node.0).map(|entry| &mut entry.content)
        {
            attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn get_attribute(&self, node: HostNode, name: &str) -> Option<String> {
        match &self.entries.get(node.0)?.content {
            Content::Element { attributes, .. } => attributes.get(name).cloned(),
            _ => None,
        }
    }

    fn append_child(&mut self, parent: HostNode, child: HostNode) {
        self.detach(child);
        if let Some(children) = self.children_mut(parent) {
            children.push(child);
            self.entries[child.0].parent = Some(parent);
        }
    }

    fn insert_before(&mut self, parent: HostNode, child: HostNode, reference: HostNode) {
        self.detach(child);
        if let Some(children) = self.children_mut(parent) {
            let index = children
                .iter()
                .position(|c| *c == reference)
                .unwrap_or(children.len());
            children.insert(index, child);
            self.entries[child.0].parent = Some(parent);
        }
    }

    fn remove_child(&mut self, parent: HostNode, child: HostNode) {
        if self.parent(child) == Some(parent) {
            self.detach(child);
        }
    }

    fn children(&self, node: HostNode) -> Vec<HostNode> {
        match self.entries.get(node.0).map(|entry| &entry.content) {
            Some(Content::Element { children, .. }) => children.clone(),
            _ => Vec::new(),
        }
    }

    fn parent(&self, node: HostNode) -> Option<HostNode> {
        self.entries.get(node.0)?.parent
    }

    fn root(&self) -> HostNode {
        self.root
    }

    fn tag(&self, node: HostNode) -> Option<String> {
        match &self.entries.get(node.0)?.content {
            Content::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        }
    }

    fn bind_method(&mut self, node: HostNode, method: &Method) {
        if let Some(Content::Element { methods, .. }) =
            self.entries.get_mut(node.0).map(|entry| &mut entry.content)
        {
            methods.insert(method.name.clone(), method.clone());
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn is_self_closing(tag: &str) -> bool {
    matches!(
        tag,
        "img"
            | "input"
            | "br"
            | "hr"
            | "meta"
            | "link"
            | "area"
            | "base"
            | "col"
            | "embed"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_moves_node() {
        let mut host = MemoryHost::new();
        let root = host.root();
        let a = host.create_element("div");
        let b = host.create_element("section");
        host.append_child(root, a);
        host.append_child(root, b);

        let child = host.create_text("x");
        host.append_child(a, child);
        host.append_child(b, child);

        assert!(host.children(a).is_empty());
        assert_eq!(host.children(b), vec![child]);
        assert_eq!(host.parent(child), Some(b));
    }

    #[test]
    fn test_insert_before() {
        let mut host = MemoryHost::new();
        let root = host.root();
        let first = host.create_element("p");
        let second = host.create_element("p");
        host.append_child(root, second);
        host.insert_before(root, first, second);
        assert_eq!(host.children(root), vec![first, second]);
    }

    #[test]
    fn test_html_escaping() {
        let mut host = MemoryHost::new();
        let root = host.root();
        let div = host.create_element("div");
        host.set_attribute(div, "title", "a \"b\"");
        let text = host.create_text("1 < 2 & 3");
        let raw = host.create_raw("<b>bold</b>");
        let br = host.create_element("br");
        host.append_child(root, div);
        host.append_child(div, text);
        host.append_child(div, raw);
        host.append_child(div, br);

        assert_eq!(
            host.inner_html(root),
            "<div title=\"a &quot;b&quot;\">1 &lt; 2 &amp; 3<b>bold</b><br></div>"
        );
    }
}
