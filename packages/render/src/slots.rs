//! # Slot Projection
//!
//! Resolves an instance's content against a definition's slots, then expands
//! the definition's template with that content in place of its slots.
//!
//! Unlabeled content goes to the implicit target: the only slot name a
//! template declares. With zero or several names it goes to `default`.
//!
//! Routing order for each child of an instance:
//!
//! 1. an explicit `slot="name"` attribute
//! 2. a tag equal to a declared slot name (shorthand)
//! 3. the implicit target
//! 4. `default`
//!
//! In cases 1 and 2 a child whose tag equals the target and that carries no
//! other attributes is a bare wrapper: its text and children are routed
//! instead of the child itself.

use crate::registry::Registry;
use std::collections::{BTreeMap, BTreeSet};
use stencil_tree::{
    walk_slot, ChildList, Definition, Element, Instance, Node, NodeKind, Slot, Visitor,
    DEFAULT_SLOT, SLOT_ATTRIBUTE,
};

/// Which slot of which definition a projected node was placed into
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotRef {
    pub definition: String,
    pub name: String,
}

#[derive(Default)]
struct SlotCollector {
    names: BTreeSet<String>,
}

impl Visitor for SlotCollector {
    fn visit_slot(&mut self, slot: &Slot<Node>) {
        self.names.insert(slot.name.clone());
        walk_slot(self, slot);
    }

    fn visit_definition(&mut self, _definition: &Definition<Node>) {
        // Nested definitions declare their own slots
    }
}

/// Distinct slot names declared by a template, including slots placed
/// inside nested instances and inside fallback content
pub fn collect_slot_names(template: &[Node]) -> BTreeSet<String> {
    let mut collector = SlotCollector::default();
    for node in template {
        collector.visit_node(node);
    }
    collector.names
}

/// Resolved slot name -> projected content for one instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillMap {
    definition: String,
    declared: BTreeSet<String>,
    implicit: Option<String>,
    fills: BTreeMap<String, Vec<Node>>,
}

impl FillMap {
    pub fn resolve(definition: &Definition<Node>, instance: &Instance<Node>) -> Self {
        let declared = collect_slot_names(&definition.template);
        let implicit = if declared.len() == 1 {
            declared.iter().next().cloned()
        } else {
            None
        };

        let mut map = FillMap {
            definition: definition.id.clone(),
            declared,
            implicit,
            fills: instance.fills.clone(),
        };

        if let Some(text) = &instance.text {
            let target = map.unlabeled_target();
            map.push(target, Node::text(text.as_str()));
        }
        for child in &instance.children {
            map.route(child);
        }
        map
    }

    pub fn get(&self, name: &str) -> Option<&[Node]> {
        self.fills.get(name).map(Vec::as_slice)
    }

    pub fn implicit_target(&self) -> Option<&str> {
        self.implicit.as_deref()
    }

    pub fn declared(&self) -> &BTreeSet<String> {
        &self.declared
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fills.keys().map(String::as_str)
    }

    pub fn slot_ref(&self, name: &str) -> SlotRef {
        SlotRef {
            definition: self.definition.clone(),
            name: name.to_string(),
        }
    }

    fn unlabeled_target(&self) -> String {
        self.implicit
            .clone()
            .unwrap_or_else(|| DEFAULT_SLOT.to_string())
    }

    fn push(&mut self, target: String, node: Node) {
        self.fills.entry(target).or_default().push(node);
    }

    fn route(&mut self, child: &Node) {
        let tag = child.kind().tag().map(str::to_string);
        let explicit = child
            .kind()
            .attributes()
            .and_then(|attributes| attributes.get(SLOT_ATTRIBUTE))
            .cloned();

        if let Some(target) = explicit {
            let shorthand = tag.as_deref() == Some(target.as_str());
            self.place(target, child, shorthand);
        } else if let Some(tag) = tag.filter(|tag| self.declared.contains(tag)) {
            self.place(tag, child, true);
        } else {
            let target = self.unlabeled_target();
            self.push(target, child.clone());
        }
    }

    fn place(&mut self, target: String, child: &Node, tag_is_target: bool) {
        if tag_is_target && !has_meaningful_attributes(child) {
            let content = unwrap(child);
            self.fills.entry(target).or_default().extend(content);
        } else {
            self.push(target, without_slot_attribute(child));
        }
    }
}

fn has_meaningful_attributes(node: &Node) -> bool {
    node.kind()
        .attributes()
        .map(|attributes| attributes.keys().any(|name| name != SLOT_ATTRIBUTE))
        .unwrap_or(false)
}

/// Direct text and children of a bare wrapper
fn unwrap(node: &Node) -> Vec<Node> {
    let (text, children) = match node.kind() {
        NodeKind::Element(element) => (&element.text, &element.children),
        NodeKind::Instance(instance) => (&instance.text, &instance.children),
        _ => return vec![node.clone()],
    };
    text.iter()
        .map(|text| Node::text(text.as_str()))
        .chain(children.iter().cloned())
        .collect()
}

fn without_slot_attribute(node: &Node) -> Node {
    let mut copy = node.clone();
    match copy.kind_mut() {
        NodeKind::Element(element) => {
            element.attributes.remove(SLOT_ATTRIBUTE);
        }
        NodeKind::Instance(instance) => {
            instance.attributes.remove(SLOT_ATTRIBUTE);
        }
        _ => {}
    }
    copy
}

/// A template node after slot substitution
#[derive(Debug, Clone, PartialEq)]
pub enum Expanded {
    /// Template element; `element.children` is empty, see `children`
    Element {
        element: Element<Node>,
        children: Vec<Expanded>,
    },
    /// Template leaf or nested instance, slots inside already substituted
    Node(Node),
    /// Instance content placed into a slot
    Projected { node: Node, slot: SlotRef },
}

/// Replace every slot in a template with its fill, or with its fallback
/// expanded against the same fills. Elements whose tag names a definition
/// are nested instances and are kept whole.
pub fn expand(template: &[Node], fills: &FillMap, registry: &Registry) -> Vec<Expanded> {
    let mut out = Vec::new();
    for node in template {
        expand_node(node, fills, registry, &mut out);
    }
    out
}

fn expand_node(node: &Node, fills: &FillMap, registry: &Registry, out: &mut Vec<Expanded>) {
    match node.kind() {
        NodeKind::Element(element) if !registry.contains(&element.tag) => {
            out.push(Expanded::Element {
                element: Element {
                    tag: element.tag.clone(),
                    attributes: element.attributes.clone(),
                    children: Vec::new(),
                    text: element.text.clone(),
                    selector: element.selector.clone(),
                    hooks: element.hooks.clone(),
                },
                children: expand(&element.children, fills, registry),
            });
        }
        NodeKind::Slot(slot) => match fills.get(&slot.name) {
            Some(content) if !content.is_empty() => {
                out.extend(content.iter().map(|projected| Expanded::Projected {
                    node: projected.clone(),
                    slot: fills.slot_ref(&slot.name),
                }));
            }
            _ => {
                for child in &slot.children {
                    expand_node(child, fills, registry, out);
                }
            }
        },
        NodeKind::Definition(_) => {}
        _ => out.push(Expanded::Node(substitute(node, fills))),
    }
}

fn substitute_list(nodes: &[Node], fills: &FillMap) -> Vec<Node> {
    let mut out = Vec::new();
    for node in nodes {
        match node.kind() {
            NodeKind::Slot(slot) => match fills.get(&slot.name) {
                Some(content) if !content.is_empty() => out.extend(content.iter().cloned()),
                _ => out.extend(substitute_list(&slot.children, fills)),
            },
            _ => out.push(substitute(node, fills)),
        }
    }
    out
}

fn substitute(node: &Node, fills: &FillMap) -> Node {
    let mut copy = node.clone();
    if let NodeKind::Definition(_) = copy.kind() {
        return copy;
    }

    let lists: Vec<ChildList> = copy
        .kind()
        .lists()
        .into_iter()
        .map(|(list, _)| list)
        .collect();
    for list in lists {
        if let Some(children) = copy.kind_mut().list_mut(&list) {
            let replaced = substitute_list(children, fills);
            *children = replaced;
        }
    }
    copy
}
