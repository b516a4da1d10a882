/// Slot resolution and expansion tests
use crate::*;
use stencil_tree::{Definition, Instance, Node, NodeKind};

#[cfg(test)]
mod slot_tests {
    use super::*;

    fn definition(node: Node) -> Definition<Node> {
        match node.into_kind() {
            NodeKind::Definition(definition) => definition,
            other => panic!("expected definition, got {}", other.kind_name()),
        }
    }

    fn instance(node: Node) -> Instance<Node> {
        match node.into_kind() {
            NodeKind::Instance(instance) => instance,
            other => panic!("expected instance, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_single_slot_is_implicit_target() {
        let def = definition(
            Node::component("card").with_child(Node::element("section").with_child(Node::slot("body"))),
        );
        let inst = instance(Node::instance("card").with_text("hi"));

        let fills = FillMap::resolve(&def, &inst);
        assert_eq!(fills.implicit_target(), Some("body"));
        assert_eq!(fills.get("body"), Some(&[Node::text("hi")][..]));
        assert!(fills.get("default").is_none());
    }

    #[test]
    fn test_tag_shorthand_and_default_routing() {
        let def = definition(
            Node::component("page")
                .with_child(Node::slot("header"))
                .with_child(Node::slot("body")),
        );
        let inst = instance(
            Node::instance("page")
                .with_child(Node::element("header").with_text("Title"))
                .with_child(Node::element("p").with_text("loose")),
        );

        let fills = FillMap::resolve(&def, &inst);
        assert_eq!(fills.implicit_target(), None);
        // Bare wrapper: its content is routed, not the wrapper
        assert_eq!(fills.get("header"), Some(&[Node::text("Title")][..]));
        // Two slots declared, so unlabeled content goes to the default slot
        assert_eq!(
            fills.get("default"),
            Some(&[Node::element("p").with_text("loose")][..])
        );
        assert!(fills.get("body").is_none());
    }

    #[test]
    fn test_explicit_slot_attribute() {
        let def = definition(
            Node::component("page")
                .with_child(Node::slot("header"))
                .with_child(Node::slot("body")),
        );
        let inst = instance(
            Node::instance("page")
                .with_child(
                    Node::element("div")
                        .with_attr("slot", "body")
                        .with_attr("class", "lead"),
                )
                .with_child(
                    Node::element("header")
                        .with_attr("slot", "header")
                        .with_child(Node::element("em").with_text("hey")),
                ),
        );

        let fills = FillMap::resolve(&def, &inst);
        assert_eq!(
            fills.get("body"),
            Some(&[Node::element("div").with_attr("class", "lead")][..])
        );
        assert_eq!(
            fills.get("header"),
            Some(&[Node::element("em").with_text("hey")][..])
        );
    }

    #[test]
    fn test_wrapper_with_attributes_is_kept() {
        let def = definition(
            Node::component("page")
                .with_child(Node::slot("header"))
                .with_child(Node::slot("body")),
        );
        let inst = instance(
            Node::instance("page").with_child(Node::element("header").with_attr("id", "top")),
        );

        let fills = FillMap::resolve(&def, &inst);
        assert_eq!(
            fills.get("header"),
            Some(&[Node::element("header").with_attr("id", "top")][..])
        );
    }

    #[test]
    fn test_explicit_fills_are_kept() {
        let def = definition(
            Node::component("page")
                .with_child(Node::slot("title"))
                .with_child(Node::slot("default")),
        );
        let inst = instance(
            Node::instance("page")
                .with_fill("title", vec![Node::text("T")])
                .with_child(Node::element("p")),
        );

        let fills = FillMap::resolve(&def, &inst);
        assert_eq!(fills.get("title"), Some(&[Node::text("T")][..]));
        assert_eq!(fills.get("default"), Some(&[Node::element("p")][..]));
        assert_eq!(fills.names().collect::<Vec<_>>(), vec!["default", "title"]);
    }

    #[test]
    fn test_slot_names_are_collected_transitively() {
        let template = vec![
            Node::element("div").with_child(Node::instance("inner").with_child(Node::slot("a"))),
            Node::slot("b").with_child(Node::slot("c")),
            Node::component("nested").with_child(Node::slot("z")),
        ];

        let names: Vec<String> = collect_slot_names(&template).into_iter().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_fallback_sees_the_same_fills() {
        let def = definition(
            Node::component("greet").with_child(
                Node::slot("title").with_child(Node::element("h1").with_child(Node::slot("name"))),
            ),
        );
        let inst = instance(Node::instance("greet").with_fill("name", vec![Node::text("Ada")]));

        let fills = FillMap::resolve(&def, &inst);
        let expanded = expand(&def.template, &fills, &Registry::default());

        let [Expanded::Element { element, children }] = expanded.as_slice() else {
            panic!("expected a single element, got {:?}", expanded);
        };
        assert_eq!(element.tag, "h1");
        assert_eq!(
            children,
            &vec![Expanded::Projected {
                node: Node::text("Ada"),
                slot: SlotRef {
                    definition: "greet".to_string(),
                    name: "name".to_string(),
                },
            }]
        );
    }

    #[test]
    fn test_slots_inside_nested_instances_are_substituted() {
        let def = definition(
            Node::component("outer").with_child(Node::instance("frame").with_child(Node::slot("body"))),
        );
        let inst = instance(Node::instance("outer").with_text("inside"));

        let fills = FillMap::resolve(&def, &inst);
        let expanded = expand(&def.template, &fills, &Registry::default());
        assert_eq!(
            expanded,
            vec![Expanded::Node(
                Node::instance("frame").with_child(Node::text("inside"))
            )]
        );
    }
}
