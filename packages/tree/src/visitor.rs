use crate::node::{Definition, Element, Instance, Node, NodeKind, Raw, Slot, Text};

/// Visitor pattern for traversing owned trees immutably
///
/// This trait provides default implementations that walk the entire tree.
/// Override specific visit_* methods to perform custom actions on nodes.
pub trait Visitor: Sized {
    fn visit_node(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_element(&mut self, element: &Element<Node>) {
        walk_element(self, element);
    }

    fn visit_text(&mut self, _text: &Text) {
        // Leaf node, no children to walk
    }

    fn visit_raw(&mut self, _raw: &Raw) {
        // Leaf node, no children to walk
    }

    fn visit_definition(&mut self, definition: &Definition<Node>) {
        walk_definition(self, definition);
    }

    fn visit_instance(&mut self, instance: &Instance<Node>) {
        walk_instance(self, instance);
    }

    fn visit_slot(&mut self, slot: &Slot<Node>) {
        walk_slot(self, slot);
    }
}

pub fn walk_nodes<V: Visitor>(visitor: &mut V, nodes: &[Node]) {
    for node in nodes {
        visitor.visit_node(node);
    }
}

pub fn walk_node<V: Visitor>(visitor: &mut V, node: &Node) {
    match node.kind() {
        NodeKind::Element(element) => visitor.visit_element(element),
        NodeKind::Text(text) => visitor.visit_text(text),
        NodeKind::Raw(raw) => visitor.visit_raw(raw),
        NodeKind::Definition(definition) => visitor.visit_definition(definition),
        NodeKind::Instance(instance) => visitor.visit_instance(instance),
        NodeKind::Slot(slot) => visitor.visit_slot(slot),
    }
}

pub fn walk_element<V: Visitor>(visitor: &mut V, element: &Element<Node>) {
    walk_nodes(visitor, &element.children);
}

pub fn walk_definition<V: Visitor>(visitor: &mut V, definition: &Definition<Node>) {
    walk_nodes(visitor, &definition.template);
}

pub fn walk_instance<V: Visitor>(visitor: &mut V, instance: &Instance<Node>) {
    for content in instance.fills.values() {
        walk_nodes(visitor, content);
    }
    walk_nodes(visitor, &instance.children);
}

pub fn walk_slot<V: Visitor>(visitor: &mut V, slot: &Slot<Node>) {
    walk_nodes(visitor, &slot.children);
}
