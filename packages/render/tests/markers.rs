//! Mounts and snapshot markers across host moves

use anyhow::Result;
use stencil_render::{
    find_markers, read_marker, sync_marker, HostIds, HostNode, HostTree, MemoryHost, Mount,
    NoopRuntime, RenderConfig,
};
use stencil_snapshot::{deserialize, ENCODING_NAME};
use stencil_tree::{Document, Node};

fn page() -> (MemoryHost, HostNode) {
    let mut host = MemoryHost::new();
    let root = host.root();
    let container = host.create_element("div");
    host.append_child(root, container);
    (host, container)
}

fn document() -> Document {
    Document::from_nodes(
        vec![
            Node::template("title").with_child(Node::element("h1").with_child(Node::slot("default"))),
            Node::instance("title").with_text("one"),
        ],
        vec![],
    )
}

fn mount(host: &mut MemoryHost, container: HostNode) -> Result<Mount<HostNode>> {
    let mut ids = HostIds::new("/index.html");
    Ok(Mount::new(
        document(),
        host,
        container,
        &mut ids,
        RenderConfig::default(),
        &mut NoopRuntime,
    )?)
}

fn assert_single_adjacent_marker(host: &MemoryHost, mounted: &Mount<HostNode>) {
    let config = mounted.session().config();
    let markers = find_markers(host, mounted.identity(), config);
    assert_eq!(markers.len(), 1, "expected exactly one marker");

    let container = mounted.host_node();
    let parent = host.parent(container).expect("attached host");
    let siblings = host.children(parent);
    let index = siblings.iter().position(|n| *n == container).unwrap();
    assert!(index > 0, "marker must precede the host");
    assert_eq!(siblings[index - 1], markers[0]);
}

#[test]
fn test_first_paint_writes_marker() -> Result<()> {
    let (mut host, container) = page();
    let mounted = mount(&mut host, container)?;
    let config = RenderConfig::default();

    assert_eq!(host.inner_html(container), "<h1>one</h1>");
    assert_eq!(
        host.get_attribute(container, &config.host_id_attr).as_deref(),
        Some(mounted.identity())
    );
    assert_single_adjacent_marker(&host, &mounted);

    let marker = host.children(host.root())[0];
    assert_eq!(host.tag(marker).as_deref(), Some("script"));
    assert_eq!(
        host.get_attribute(marker, &config.encoding_attr).as_deref(),
        Some(ENCODING_NAME)
    );
    let snapshot = host.get_attribute(marker, &config.snapshot_attr).unwrap();
    assert_eq!(snapshot, mounted.snapshot());
    assert_eq!(deserialize(&snapshot)?.to_nodes(), document().to_nodes());
    Ok(())
}

#[test]
fn test_write_then_flush_repaints() -> Result<()> {
    let (mut host, container) = page();
    let mut mounted = mount(&mut host, container)?;
    assert!(!mounted.needs_render());

    mounted.live_root().set("children.1.text", "two")?;
    assert!(mounted.needs_render());
    assert!(mounted.flush(&mut host, &mut NoopRuntime)?);
    assert!(!mounted.needs_render());
    assert_eq!(host.inner_html(container), "<h1>two</h1>");

    let restored = read_marker(&host, container, mounted.session().config())?.unwrap();
    assert_eq!(
        restored.to_nodes()[1],
        Node::instance("title").with_text("two")
    );

    // Nothing changed since
    assert!(!mounted.flush(&mut host, &mut NoopRuntime)?);
    assert_eq!(mounted.session().passes(), 2);
    Ok(())
}

#[test]
fn test_marker_follows_a_moved_host() -> Result<()> {
    let (mut host, container) = page();
    let mut mounted = mount(&mut host, container)?;

    // Move the host into a new wrapper; the old marker stays behind
    let root = host.root();
    let wrapper = host.create_element("section");
    host.append_child(root, wrapper);
    host.append_child(wrapper, container);

    mounted.live_root().set("children.1.text", "moved")?;
    mounted.flush(&mut host, &mut NoopRuntime)?;
    assert_single_adjacent_marker(&host, &mounted);
    assert_eq!(host.parent(container), Some(wrapper));

    // Moving back without a write relocates the marker as well
    host.append_child(root, container);
    assert!(!mounted.flush(&mut host, &mut NoopRuntime)?);
    assert_single_adjacent_marker(&host, &mounted);
    assert_eq!(host.inner_html(container), "<h1>moved</h1>");
    Ok(())
}

#[test]
fn test_stray_markers_are_removed() -> Result<()> {
    let (mut host, container) = page();
    let mounted = mount(&mut host, container)?;
    let config = mounted.session().config().clone();

    let stray = host.create_element(&config.marker_tag);
    host.set_attribute(stray, &config.host_id_attr, mounted.identity());
    host.set_attribute(stray, &config.encoding_attr, ENCODING_NAME);
    let root = host.root();
    host.append_child(root, stray);
    assert_eq!(find_markers(&host, mounted.identity(), &config).len(), 2);

    sync_marker(&mut host, container, mounted.snapshot(), &config)?;
    assert_single_adjacent_marker(&host, &mounted);
    assert_eq!(host.parent(stray), None);
    Ok(())
}

#[test]
fn test_disconnected_mount_ignores_writes() -> Result<()> {
    let (mut host, container) = page();
    let mut mounted = mount(&mut host, container)?;

    mounted.disconnect();
    mounted.live_root().set("children.1.text", "quiet")?;
    assert!(!mounted.needs_render());
    assert!(!mounted.flush(&mut host, &mut NoopRuntime)?);
    assert_eq!(host.inner_html(container), "<h1>one</h1>");
    Ok(())
}

#[test]
fn test_identities_are_sequential_per_scope() -> Result<()> {
    let mut host = MemoryHost::new();
    let root = host.root();
    let first = host.create_element("div");
    let second = host.create_element("div");
    host.append_child(root, first);
    host.append_child(root, second);

    let mut ids = HostIds::new("/app");
    let config = RenderConfig::default();
    let a = Mount::new(document(), &mut host, first, &mut ids, config.clone(), &mut NoopRuntime)?;
    let b = Mount::new(document(), &mut host, second, &mut ids, config, &mut NoopRuntime)?;

    assert_eq!(a.identity(), format!("{}-1", ids.scope_id()));
    assert_eq!(b.identity(), format!("{}-2", ids.scope_id()));
    assert_single_adjacent_marker(&host, &a);
    assert_single_adjacent_marker(&host, &b);
    Ok(())
}

#[test]
fn test_read_marker_without_marker() -> Result<()> {
    let (mut host, container) = page();
    let config = RenderConfig::default();
    host.set_attribute(container, &config.host_id_attr, "abc-1");
    assert!(read_marker(&host, container, &config)?.is_none());
    Ok(())
}
