//! Lifecycle hooks and the ready signal

use anyhow::Result;
use stencil_render::{
    HandlerError, HandlerRuntime, HostNode, HostTree, Invocation, MemoryHost, RenderConfig,
    RenderError, RenderSession,
};
use stencil_tree::{Document, HandlerSource, Node};

#[derive(Default)]
struct Recorder {
    calls: Vec<(String, String)>,
    components: Vec<Option<HostNode>>,
    fail_on: Option<String>,
}

impl HandlerRuntime<HostNode> for Recorder {
    fn invoke(
        &mut self,
        handler: &HandlerSource,
        invocation: Invocation<'_, HostNode>,
    ) -> Result<(), HandlerError> {
        if self.fail_on.as_deref() == Some(invocation.event) {
            return Err(HandlerError {
                event: invocation.event.to_string(),
                message: "boom".to_string(),
            });
        }
        self.calls
            .push((invocation.event.to_string(), handler.as_str().to_string()));
        self.components.push(invocation.component);
        Ok(())
    }
}

fn widget_document() -> Document {
    Document::from_nodes(
        vec![
            Node::component("widget")
                .with_hook("mounted", "attach()")
                .with_hook("ready", "init()"),
            Node::instance("widget"),
            Node::element("div").with_hook("ready", "measure()"),
        ],
        vec![],
    )
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("stencil_render=debug")
        .with_test_writer()
        .try_init();
}

#[test]
fn test_ready_hooks_wait_for_the_signal() -> Result<()> {
    init_tracing();

    let doc = widget_document();
    let mut host = MemoryHost::new();
    let root = host.root();
    let mut session = RenderSession::new(RenderConfig::default());
    let mut recorder = Recorder::default();

    session.render(&doc, &mut host, root, &mut recorder)?;
    assert_eq!(
        recorder.calls,
        vec![("mounted".to_string(), "attach()".to_string())]
    );
    assert!(!session.is_ready());
    assert_eq!(session.pending_ready_hooks(), 2);

    assert_eq!(session.signal_ready(&mut recorder)?, 2);
    assert_eq!(
        recorder.calls[1..],
        [
            ("ready".to_string(), "init()".to_string()),
            ("ready".to_string(), "measure()".to_string()),
        ]
    );

    // One-shot
    assert_eq!(session.signal_ready(&mut recorder)?, 0);
    assert_eq!(recorder.calls.len(), 3);
    Ok(())
}

#[test]
fn test_ready_hooks_run_inline_after_the_signal() -> Result<()> {
    let doc = widget_document();
    let mut host = MemoryHost::new();
    let root = host.root();
    let mut session = RenderSession::new(RenderConfig::default());
    let mut recorder = Recorder::default();

    session.render(&doc, &mut host, root, &mut recorder)?;
    session.signal_ready(&mut recorder)?;
    recorder.calls.clear();

    // A new pass creates new host nodes, each requesting its hooks once
    session.render(&doc, &mut host, root, &mut recorder)?;
    let events: Vec<&str> = recorder.calls.iter().map(|(event, _)| event.as_str()).collect();
    assert_eq!(events, vec!["mounted", "ready", "ready"]);
    assert_eq!(session.pending_ready_hooks(), 0);
    Ok(())
}

#[test]
fn test_untracked_ready_runs_during_render() -> Result<()> {
    let doc = widget_document();
    let mut host = MemoryHost::new();
    let root = host.root();
    let config = RenderConfig {
        track_ready: false,
        ..RenderConfig::default()
    };
    let mut session = RenderSession::new(config);
    let mut recorder = Recorder::default();

    session.render(&doc, &mut host, root, &mut recorder)?;
    assert!(session.is_ready());
    assert_eq!(recorder.calls.len(), 3);
    assert_eq!(session.signal_ready(&mut recorder)?, 0);
    Ok(())
}

#[test]
fn test_component_hooks_see_their_host() -> Result<()> {
    let doc = widget_document();
    let mut host = MemoryHost::new();
    let root = host.root();
    let mut session = RenderSession::new(RenderConfig::default());
    let mut recorder = Recorder::default();

    session.render(&doc, &mut host, root, &mut recorder)?;
    session.signal_ready(&mut recorder)?;

    let widget = host.children(root)[0];
    assert_eq!(
        recorder.components,
        vec![Some(widget), Some(widget), None]
    );
    Ok(())
}

#[test]
fn test_same_named_hooks_each_run_once() -> Result<()> {
    let doc = Document::from_nodes(
        vec![
            Node::component("w")
                .with_hook("ready", "first()")
                .with_hook("ready", "second()"),
            Node::instance("w"),
        ],
        vec![],
    );
    let mut host = MemoryHost::new();
    let root = host.root();
    let mut session = RenderSession::new(RenderConfig::default());
    let mut recorder = Recorder::default();

    session.render(&doc, &mut host, root, &mut recorder)?;
    assert_eq!(session.pending_ready_hooks(), 2);
    assert_eq!(session.signal_ready(&mut recorder)?, 2);

    let bodies: Vec<&str> = recorder.calls.iter().map(|(_, body)| body.as_str()).collect();
    assert_eq!(bodies, vec!["first()", "second()"]);
    Ok(())
}

#[test]
fn test_repaint_before_the_signal_replaces_queued_hooks() -> Result<()> {
    let doc = widget_document();
    let mut host = MemoryHost::new();
    let root = host.root();
    let mut session = RenderSession::new(RenderConfig::default());
    let mut recorder = Recorder::default();

    session.render(&doc, &mut host, root, &mut recorder)?;
    session.render(&doc, &mut host, root, &mut recorder)?;
    assert_eq!(session.pending_ready_hooks(), 2);

    recorder.calls.clear();
    recorder.components.clear();
    assert_eq!(session.signal_ready(&mut recorder)?, 2);

    // Hooks run against the nodes of the latest pass only
    let widget = host.children(root)[0];
    assert_eq!(recorder.components, vec![Some(widget), None]);
    Ok(())
}

#[test]
fn test_handler_failure_stops_the_pass() {
    let doc = widget_document();
    let mut host = MemoryHost::new();
    let root = host.root();
    let mut session = RenderSession::new(RenderConfig::default());
    let mut recorder = Recorder {
        fail_on: Some("mounted".to_string()),
        ..Recorder::default()
    };

    let err = session
        .render(&doc, &mut host, root, &mut recorder)
        .unwrap_err();
    assert!(matches!(err, RenderError::Handler(HandlerError { ref event, .. }) if event == "mounted"));
    assert_eq!(err.to_string(), "Handler for 'mounted' failed: boom");
}
