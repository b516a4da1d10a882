//! Node kinds shared by the owned tree and the document arena.
//!
//! Every variant is generic over its child handle `C`. The owned form
//! ([`Node`]) nests `Node` values directly, the arena form stores
//! [`NodeId`](crate::NodeId)s. Keeping one set of variants means the parser,
//! the codec and the arena all agree on field names and JSON shape.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute map. Sorted so that encodings are canonical.
pub type Attributes = BTreeMap<String, String>;

/// Attribute that routes instance content into a named slot
pub const SLOT_ATTRIBUTE: &str = "slot";

/// Name of the slot that receives unrouted content
pub const DEFAULT_SLOT: &str = "default";

/// Opaque handler text (script-rule bodies, methods, lifecycle hooks).
///
/// The tree never interprets it; a hosting runtime does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerSource(pub String);

impl HandlerSource {
    pub fn new(body: impl Into<String>) -> Self {
        Self(body.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Component method bound onto a rendered host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
    pub body: HandlerSource,
}

/// Lifecycle hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hook {
    pub name: String,
    pub body: HandlerSource,
}

impl Hook {
    pub const READY: &'static str = "ready";

    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: HandlerSource::new(body),
        }
    }

    /// Ready hooks wait for the "content fully loaded" signal
    pub fn is_ready(&self) -> bool {
        self.name.eq_ignore_ascii_case(Self::READY)
    }
}

/// Declarative event-binding rule, consumed after render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptRule {
    pub selector: String,
    pub event: String,
    pub body: HandlerSource,
}

impl ScriptRule {
    pub fn new(selector: impl Into<String>, event: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            event: event.into(),
            body: HandlerSource::new(body),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    /// Rendered inside a persistent host element
    #[default]
    Component,
    /// Pure substitution, no host wrapper
    Template,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionKind::Component => f.write_str("component"),
            DefinitionKind::Template => f.write_str("template"),
        }
    }
}

/// General markup node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "C: Deserialize<'de>", serialize = "C: Serialize"))]
pub struct Element<C> {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<C>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Collapsed outer tag path from the compact syntax, outermost first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selector: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<Hook>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub value: String,
}

/// Pre-escaped markup, emitted without element escaping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raw {
    pub html: String,
}

/// Component or template definition, registered by id at document scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "C: Deserialize<'de>", serialize = "C: Serialize"))]
pub struct Definition<C> {
    pub id: String,
    #[serde(default)]
    pub kind: DefinitionKind,
    /// Host tag for components; falls back to the id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub template: Vec<C>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<Method>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<Hook>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<String>,
}

impl<C> Definition<C> {
    /// Registry key: ids are case-insensitive
    pub fn key(&self) -> String {
        self.id.to_lowercase()
    }

    pub fn host_tag(&self) -> &str {
        self.tag.as_deref().unwrap_or(&self.id)
    }
}

/// Use-site reference to a definition, late-bound by id then tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "C: Deserialize<'de>", serialize = "C: Serialize"))]
pub struct Instance<C> {
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    /// Explicit slot fills
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fills: BTreeMap<String, Vec<C>>,
    /// Implicit content, routed by slot projection
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<C>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

fn default_slot_name() -> String {
    DEFAULT_SLOT.to_string()
}

/// Named placeholder inside a definition's template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "C: Deserialize<'de>", serialize = "C: Serialize"))]
pub struct Slot<C> {
    #[serde(default = "default_slot_name")]
    pub name: String,
    /// Fallback rendered when the slot is unfilled
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<C>,
}

/// Node kind discriminant plus payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
#[serde(bound(deserialize = "C: Deserialize<'de>", serialize = "C: Serialize"))]
pub enum NodeKind<C> {
    Element(Element<C>),
    Text(Text),
    Raw(Raw),
    Definition(Definition<C>),
    Instance(Instance<C>),
    Slot(Slot<C>),
}

/// Addresses one child list of a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChildList {
    /// `children` of elements, slots, instances and the document root
    Children,
    /// `template` of a definition
    Template,
    /// One named entry of an instance's `fills`
    Fill(String),
}

impl fmt::Display for ChildList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildList::Children => f.write_str("children"),
            ChildList::Template => f.write_str("template"),
            ChildList::Fill(name) => write!(f, "fills.{}", name),
        }
    }
}

impl<C> NodeKind<C> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::Element(_) => "element",
            NodeKind::Text(_) => "text",
            NodeKind::Raw(_) => "raw",
            NodeKind::Definition(_) => "definition",
            NodeKind::Instance(_) => "instance",
            NodeKind::Slot(_) => "slot",
        }
    }

    /// Containers expose themselves to the nodes they hold
    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Instance(_) | NodeKind::Slot(_))
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            NodeKind::Element(element) => Some(&element.tag),
            NodeKind::Instance(instance) => Some(&instance.tag),
            _ => None,
        }
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            NodeKind::Element(element) => Some(&element.attributes),
            NodeKind::Instance(instance) => Some(&instance.attributes),
            _ => None,
        }
    }

    pub fn list(&self, list: &ChildList) -> Option<&Vec<C>> {
        match (self, list) {
            (NodeKind::Element(element), ChildList::Children) => Some(&element.children),
            (NodeKind::Slot(slot), ChildList::Children) => Some(&slot.children),
            (NodeKind::Instance(instance), ChildList::Children) => Some(&instance.children),
            (NodeKind::Instance(instance), ChildList::Fill(name)) => instance.fills.get(name),
            (NodeKind::Definition(definition), ChildList::Template) => Some(&definition.template),
            _ => None,
        }
    }

    /// Mutable child list. Fill lists are created on demand.
    pub fn list_mut(&mut self, list: &ChildList) -> Option<&mut Vec<C>> {
        match (self, list) {
            (NodeKind::Element(element), ChildList::Children) => Some(&mut element.children),
            (NodeKind::Slot(slot), ChildList::Children) => Some(&mut slot.children),
            (NodeKind::Instance(instance), ChildList::Children) => Some(&mut instance.children),
            (NodeKind::Instance(instance), ChildList::Fill(name)) => {
                Some(instance.fills.entry(name.clone()).or_default())
            }
            (NodeKind::Definition(definition), ChildList::Template) => {
                Some(&mut definition.template)
            }
            _ => None,
        }
    }

    /// All child lists in document order
    pub fn lists(&self) -> Vec<(ChildList, &Vec<C>)> {
        match self {
            NodeKind::Element(element) => vec![(ChildList::Children, &element.children)],
            NodeKind::Slot(slot) => vec![(ChildList::Children, &slot.children)],
            NodeKind::Definition(definition) => vec![(ChildList::Template, &definition.template)],
            NodeKind::Instance(instance) => {
                let mut lists: Vec<_> = instance
                    .fills
                    .iter()
                    .map(|(name, nodes)| (ChildList::Fill(name.clone()), nodes))
                    .collect();
                lists.push((ChildList::Children, &instance.children));
                lists
            }
            NodeKind::Text(_) | NodeKind::Raw(_) => Vec::new(),
        }
    }

    /// Rebuild the node with a different child handle type.
    ///
    /// `f` sees every child together with the list it belongs to.
    pub fn map_children<D>(self, f: &mut impl FnMut(&ChildList, C) -> D) -> NodeKind<D> {
        let mut map_list = |list: ChildList, items: Vec<C>| -> Vec<D> {
            items.into_iter().map(|child| f(&list, child)).collect()
        };

        match self {
            NodeKind::Element(element) => NodeKind::Element(Element {
                tag: element.tag,
                attributes: element.attributes,
                children: map_list(ChildList::Children, element.children),
                text: element.text,
                selector: element.selector,
                hooks: element.hooks,
            }),
            NodeKind::Text(text) => NodeKind::Text(text),
            NodeKind::Raw(raw) => NodeKind::Raw(raw),
            NodeKind::Definition(definition) => NodeKind::Definition(Definition {
                id: definition.id,
                kind: definition.kind,
                tag: definition.tag,
                template: map_list(ChildList::Template, definition.template),
                methods: definition.methods,
                hooks: definition.hooks,
                props: definition.props,
            }),
            NodeKind::Instance(instance) => {
                let fills = instance
                    .fills
                    .into_iter()
                    .map(|(name, nodes)| {
                        let mapped = map_list(ChildList::Fill(name.clone()), nodes);
                        (name, mapped)
                    })
                    .collect();
                NodeKind::Instance(Instance {
                    reference: instance.reference,
                    tag: instance.tag,
                    attributes: instance.attributes,
                    fills,
                    children: map_list(ChildList::Children, instance.children),
                    text: instance.text,
                })
            }
            NodeKind::Slot(slot) => NodeKind::Slot(Slot {
                name: slot.name,
                children: map_list(ChildList::Children, slot.children),
            }),
        }
    }
}

/// Owned, detached subtree.
///
/// This is what the external parser produces, what deep clones return and
/// what the snapshot codec encodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Node(pub NodeKind<Node>);

impl From<NodeKind<Node>> for Node {
    fn from(kind: NodeKind<Node>) -> Self {
        Node(kind)
    }
}

impl Node {
    pub fn element(tag: impl Into<String>) -> Self {
        Node(NodeKind::Element(Element {
            tag: tag.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
            text: None,
            selector: Vec::new(),
            hooks: Vec::new(),
        }))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Node(NodeKind::Text(Text {
            value: value.into(),
        }))
    }

    pub fn raw(html: impl Into<String>) -> Self {
        Node(NodeKind::Raw(Raw { html: html.into() }))
    }

    pub fn component(id: impl Into<String>) -> Self {
        Self::definition(id, DefinitionKind::Component)
    }

    pub fn template(id: impl Into<String>) -> Self {
        Self::definition(id, DefinitionKind::Template)
    }

    pub fn definition(id: impl Into<String>, kind: DefinitionKind) -> Self {
        Node(NodeKind::Definition(Definition {
            id: id.into(),
            kind,
            tag: None,
            template: Vec::new(),
            methods: Vec::new(),
            hooks: Vec::new(),
            props: Vec::new(),
        }))
    }

    pub fn instance(tag: impl Into<String>) -> Self {
        Node(NodeKind::Instance(Instance {
            reference: None,
            tag: tag.into(),
            attributes: Attributes::new(),
            fills: BTreeMap::new(),
            children: Vec::new(),
            text: None,
        }))
    }

    pub fn slot(name: impl Into<String>) -> Self {
        Node(NodeKind::Slot(Slot {
            name: name.into(),
            children: Vec::new(),
        }))
    }

    pub fn kind(&self) -> &NodeKind<Node> {
        &self.0
    }

    pub fn kind_mut(&mut self) -> &mut NodeKind<Node> {
        &mut self.0
    }

    pub fn into_kind(self) -> NodeKind<Node> {
        self.0
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self.0 {
            NodeKind::Element(element) => {
                element.attributes.insert(name.into(), value.into());
            }
            NodeKind::Instance(instance) => {
                instance.attributes.insert(name.into(), value.into());
            }
            _ => {}
        }
        self
    }

    /// Direct text for elements and instances, value for text nodes
    pub fn with_text(mut self, value: impl Into<String>) -> Self {
        match &mut self.0 {
            NodeKind::Element(element) => element.text = Some(value.into()),
            NodeKind::Instance(instance) => instance.text = Some(value.into()),
            NodeKind::Text(text) => text.value = value.into(),
            _ => {}
        }
        self
    }

    /// Appends to the primary child list (template for definitions)
    pub fn with_child(mut self, child: Node) -> Self {
        let list = match self.0 {
            NodeKind::Definition(_) => ChildList::Template,
            _ => ChildList::Children,
        };
        if let Some(children) = self.0.list_mut(&list) {
            children.push(child);
        }
        self
    }

    pub fn with_children(self, children: impl IntoIterator<Item = Node>) -> Self {
        children.into_iter().fold(self, Node::with_child)
    }

    pub fn with_fill(mut self, slot: impl Into<String>, content: Vec<Node>) -> Self {
        if let NodeKind::Instance(instance) = &mut self.0 {
            instance.fills.entry(slot.into()).or_default().extend(content);
        }
        self
    }

    pub fn with_ref(mut self, reference: impl Into<String>) -> Self {
        if let NodeKind::Instance(instance) = &mut self.0 {
            instance.reference = Some(reference.into());
        }
        self
    }

    /// Host tag of a definition
    pub fn with_host_tag(mut self, tag: impl Into<String>) -> Self {
        if let NodeKind::Definition(definition) = &mut self.0 {
            definition.tag = Some(tag.into());
        }
        self
    }

    pub fn with_selector(mut self, path: impl IntoIterator<Item = impl Into<String>>) -> Self {
        if let NodeKind::Element(element) = &mut self.0 {
            element.selector = path.into_iter().map(Into::into).collect();
        }
        self
    }

    pub fn with_method(mut self, name: &str, params: &[&str], body: &str) -> Self {
        if let NodeKind::Definition(definition) = &mut self.0 {
            definition.methods.push(Method {
                name: name.to_string(),
                params: params.iter().map(|p| p.to_string()).collect(),
                body: HandlerSource::new(body),
            });
        }
        self
    }

    pub fn with_hook(mut self, name: &str, body: &str) -> Self {
        match &mut self.0 {
            NodeKind::Definition(definition) => definition.hooks.push(Hook::new(name, body)),
            NodeKind::Element(element) => element.hooks.push(Hook::new(name, body)),
            _ => {}
        }
        self
    }

    pub fn with_prop(mut self, name: impl Into<String>) -> Self {
        if let NodeKind::Definition(definition) = &mut self.0 {
            definition.props.push(name.into());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::NodeId;

    #[test]
    fn test_json_shape_is_tagged_by_type() {
        let node = Node::element("div").with_attr("id", "main").with_text("hi");
        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(json["type"], "element");
        assert_eq!(json["tag"], "div");
        assert_eq!(json["attributes"]["id"], "main");
        assert_eq!(json["text"], "hi");
        // Empty collections are omitted
        assert!(json.get("children").is_none());
    }

    #[test]
    fn test_instance_reference_serializes_as_ref() {
        let node = Node::instance("x-card").with_ref("Card");
        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(json["type"], "instance");
        assert_eq!(json["ref"], "Card");
    }

    #[test]
    fn test_slot_name_defaults() {
        let node: Node = serde_json::from_str(r#"{"type":"slot"}"#).unwrap();
        match node.kind() {
            NodeKind::Slot(slot) => assert_eq!(slot.name, DEFAULT_SLOT),
            other => panic!("Expected slot, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_child_lists_default_without_a_default_child_type() {
        // Neither handle type implements Default; omitted lists still decode
        let arena: NodeKind<NodeId> =
            serde_json::from_str(r#"{"type":"instance","tag":"card"}"#).unwrap();
        match &arena {
            NodeKind::Instance(instance) => {
                assert!(instance.children.is_empty());
                assert!(instance.fills.is_empty());
            }
            other => panic!("Expected instance, got {}", other.kind_name()),
        }

        let owned: Node =
            serde_json::from_str(r#"{"type":"definition","id":"card"}"#).unwrap();
        assert_eq!(owned, Node::component("card"));

        let ids: NodeKind<NodeId> =
            serde_json::from_str(r#"{"type":"element","tag":"ul","children":[3,4]}"#).unwrap();
        assert_eq!(ids.lists()[0].1.len(), 2);
    }

    #[test]
    fn test_definition_key_is_case_insensitive() {
        let node = Node::component("MyCard");
        if let NodeKind::Definition(definition) = node.kind() {
            assert_eq!(definition.key(), "mycard");
            assert_eq!(definition.host_tag(), "MyCard");
        } else {
            panic!("Expected definition");
        }
    }

    #[test]
    fn test_with_child_targets_template_for_definitions() {
        let node = Node::template("row").with_child(Node::element("tr"));
        if let NodeKind::Definition(definition) = node.kind() {
            assert_eq!(definition.template.len(), 1);
        } else {
            panic!("Expected definition");
        }
    }

    #[test]
    fn test_map_children_reports_list() {
        let node = Node::instance("card")
            .with_fill("header", vec![Node::text("a")])
            .with_child(Node::text("b"));

        let mut seen = Vec::new();
        let mapped = node.into_kind().map_children(&mut |list, _child| {
            seen.push(list.to_string());
            0u32
        });

        assert_eq!(seen, vec!["fills.header", "children"]);
        assert_eq!(mapped.lists().len(), 2);
    }
}
