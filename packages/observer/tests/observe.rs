//! Observation behaviour through live handles

use anyhow::Result;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use stencil_observer::{observe, Change, ChangeKind, LiveNode, ObserveError, Observation, Read};
use stencil_tree::{Document, Node, Owner};

fn sample() -> Document {
    Document::from_nodes(
        vec![
            Node::component("card")
                .with_child(Node::element("div").with_child(Node::slot("body"))),
            Node::element("main").with_child(
                Node::instance("card")
                    .with_attr("class", "wide")
                    .with_fill("body", vec![Node::element("p").with_text("hello")]),
            ),
        ],
        vec![],
    )
}

fn recorded(document: Document) -> (Observation, Rc<RefCell<Vec<Change>>>) {
    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&changes);
    let observation = observe(document, move |change| sink.borrow_mut().push(change.clone()));
    (observation, changes)
}

fn value(node: &LiveNode, path: &str) -> serde_json::Value {
    node.get(path).unwrap().into_value().unwrap()
}

#[test]
fn test_write_dirties_and_refreshes_tokens() -> Result<()> {
    let (observation, changes) = recorded(sample());
    let root = observation.live_root();
    let before = root.token()?;
    assert_eq!(value(&root, "meta.dirty"), json!(false));

    root.set("children.1.attributes.id", "x")?;

    assert_eq!(value(&root, "meta.dirty"), json!(true));
    assert_eq!(value(&root, "meta.version"), json!(1));
    assert_ne!(root.token()?, before);

    let main = root.get("children.1")?.into_node().unwrap();
    assert!(main.is_dirty()?);
    assert_eq!(value(&main, "attributes.id"), json!("x"));

    let changes = changes.borrow();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].kind, ChangeKind::Set);
    assert_eq!(changes[0].path, "children.1.attributes.id");
    assert_eq!(changes[0].old_value, json!(null));
    assert_eq!(changes[0].new_value, json!("x"));
    assert!(LiveNode::same(&changes[0].target, &main));
    Ok(())
}

#[test]
fn test_disconnect_stops_bookkeeping() -> Result<()> {
    let (observation, changes) = recorded(sample());
    let root = observation.live_root();

    observation.disconnect();
    observation.disconnect();
    assert!(!observation.is_connected());

    let before = root.token()?;
    assert!(root.set("children.1.attributes.id", "x")?);

    // The write itself still lands
    assert_eq!(value(&root, "children.1.attributes.id"), json!("x"));
    assert_eq!(value(&root, "meta.dirty"), json!(false));
    assert_eq!(root.token()?, before);
    assert!(changes.borrow().is_empty());
    Ok(())
}

#[test]
fn test_identity_stable_wrappers() -> Result<()> {
    let (observation, _) = recorded(sample());
    let root = observation.live_root();

    let first = root.get("children.1.children.0")?.into_node().unwrap();
    let second = root.get("children.1")?.into_node().unwrap().get("children.0")?.into_node().unwrap();
    assert!(LiveNode::same(&first, &second));
    assert!(LiveNode::same(&root, &observation.live_root()));
    Ok(())
}

#[test]
fn test_container_accessor() -> Result<()> {
    let (observation, _) = recorded(sample());
    let root = observation.live_root();

    let paragraph = root.get("children.1.children.0.fills.body.0")?.into_node().unwrap();
    let instance = root.get("children.1.children.0")?.into_node().unwrap();

    let container = paragraph.get("$container")?.into_node().unwrap();
    assert!(LiveNode::same(&container, &instance));
    // Containers answer with themselves
    assert!(LiveNode::same(&instance.container()?, &instance));
    // Top-level elements belong to the document
    let main = root.get("children.1")?.into_node().unwrap();
    assert_eq!(main.container()?.owner(), Owner::Document);
    Ok(())
}

#[test]
fn test_nearest_container_token_refreshes() -> Result<()> {
    let (observation, _) = recorded(sample());
    let root = observation.live_root();
    let instance = root.get("children.1.children.0")?.into_node().unwrap();
    let before = instance.token()?;

    root.set("children.1.children.0.fills.body.0.text", "bye")?;

    assert_ne!(instance.token()?, before);
    Ok(())
}

#[test]
fn test_delete_missing_is_noop() -> Result<()> {
    let (observation, changes) = recorded(sample());
    let root = observation.live_root();

    assert!(!root.delete("children.1.children.0.attributes.missing")?);
    assert!(!root.delete("children.1.children.0.fills.nothing")?);
    assert_eq!(value(&root, "meta.dirty"), json!(false));
    assert!(changes.borrow().is_empty());

    assert!(root.delete("children.1.children.0.attributes.class")?);
    let changes = changes.borrow();
    assert_eq!(changes[0].kind, ChangeKind::Delete);
    assert_eq!(changes[0].old_value, json!("wide"));
    Ok(())
}

#[test]
fn test_unchanged_write_is_noop() -> Result<()> {
    let (observation, changes) = recorded(sample());
    let root = observation.live_root();

    assert!(!root.set("children.1.children.0.attributes.class", "wide")?);
    assert!(!root.set("children.1.tag", "main")?);
    assert!(changes.borrow().is_empty());
    Ok(())
}

#[test]
fn test_node_valued_writes() -> Result<()> {
    let (observation, changes) = recorded(sample());
    let root = observation.live_root();

    // Append at len, replace at an existing index
    root.set("children.2", json!({ "type": "text", "value": "tail" }))?;
    root.set("children.1", json!({ "type": "element", "tag": "section" }))?;

    let nodes = observation.document().to_nodes();
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[1], Node::element("section"));
    assert_eq!(nodes[2], Node::text("tail"));

    let paths: Vec<String> = changes.borrow().iter().map(|c| c.path.clone()).collect();
    assert_eq!(paths, vec!["children.2", "children.1"]);

    assert!(root.delete("children.2")?);
    assert_eq!(observation.document().roots().len(), 2);
    Ok(())
}

#[test]
fn test_fills_read_and_replace() -> Result<()> {
    let (observation, _) = recorded(sample());
    let instance = observation.live_root().get("children.1.children.0")?.into_node().unwrap();

    match instance.get("fills")? {
        Read::Fills(fills) => assert_eq!(fills["body"].len(), 1),
        other => panic!("expected fills, got {:?}", other),
    }

    instance.set("fills.header", json!([{ "type": "text", "value": "Title" }]))?;
    let header = instance.get("fills.header")?.into_nodes().unwrap();
    assert_eq!(header.len(), 1);
    assert_eq!(value(&header[0], "value"), json!("Title"));
    Ok(())
}

#[test]
fn test_invalid_writes_are_rejected() {
    let (observation, _) = recorded(sample());
    let root = observation.live_root();

    assert!(matches!(
        root.set("children.1.type", "text"),
        Err(ObserveError::ReadOnly(_))
    ));
    assert!(matches!(
        root.set("meta.dirty", false),
        Err(ObserveError::ReadOnly(_))
    ));
    assert!(matches!(
        root.set("children.1.bogus", 1),
        Err(ObserveError::UnknownField { .. })
    ));
    assert!(matches!(
        root.set("children.1.attributes.id", 5),
        Err(ObserveError::InvalidValue { .. })
    ));
    // Nothing was stamped by the failed writes
    assert!(!observation.document().meta().dirty);
}

#[test]
fn test_callback_may_write_back() -> Result<()> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let root_slot: Rc<RefCell<Option<LiveNode>>> = Rc::new(RefCell::new(None));

    let sink = Rc::clone(&log);
    let handle = Rc::clone(&root_slot);
    let observation = observe(sample(), move |change| {
        sink.borrow_mut().push(change.path.clone());
        if change.path == "children.1.attributes.id" {
            if let Some(root) = handle.borrow().as_ref() {
                root.set("children.1.attributes.seen", "yes").unwrap();
            }
        }
    });
    let root = observation.live_root();
    *root_slot.borrow_mut() = Some(root.clone());

    root.set("children.1.attributes.id", "x")?;

    assert_eq!(
        *log.borrow(),
        vec!["children.1.attributes.id", "children.1.attributes.seen"]
    );
    assert_eq!(value(&root, "children.1.attributes.seen"), json!("yes"));
    Ok(())
}

#[test]
fn test_mark_clean_and_into_document() -> Result<()> {
    let (observation, _) = recorded(sample());
    let root = observation.live_root();
    root.set("scripts", json!([{ "selector": "main", "event": "click", "body": "go()" }]))?;
    assert!(observation.document().meta().dirty);

    observation.mark_clean();
    assert!(!observation.document().meta().dirty);

    let document = observation.into_document();
    assert_eq!(document.scripts().len(), 1);
    assert_eq!(document.meta().version, 1);
    Ok(())
}
