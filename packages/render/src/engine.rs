//! # Render Engine
//!
//! Turns a [`Document`] into host nodes.
//!
//! Each pass builds a [`Registry`] from the definitions in the document,
//! clears the target and renders every top-level node under it. Definitions
//! themselves render nothing.
//!
//! - Instances, and elements whose tag names a definition, resolve by
//!   reference first and tag second.
//! - A **component** renders inside a host element carrying the instance
//!   attributes, the component id and the bound methods; its hooks run once
//!   its children are attached.
//! - A **template** renders its expansion straight into the parent.
//! - An instance with no matching definition renders as a plain element.
//!
//! ## Recursion Protection
//!
//! The ids of the definitions being expanded form a stack for the pass.
//! Entering a definition already on the stack fails with
//! [`RenderError::RecursiveDefinition`]; host nodes created so far are left
//! in place.
//!
//! ## Expansion Cache
//!
//! Slot expansions of document instances are cached per instance, keyed by
//! the document identity, the subtree stamps of the instance and its
//! definition and the registry stamp. Only writes that refresh update tokens
//! (observed writes) invalidate entries. Entries for instances a pass did
//! not reach are dropped at the end of that pass.

use crate::config::RenderConfig;
use crate::error::{RenderError, RenderResult};
use crate::handler::{HandlerRuntime, Invocation};
use crate::host::HostTree;
use crate::ready::{PendingHook, ReadyGate};
use crate::registry::{Registered, Registry, RegistryStamp};
use crate::slots::{expand, Expanded, FillMap, SlotRef};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;
use stencil_tree::{
    DefinitionKind, Document, Element, Hook, Instance, Node, NodeId, NodeKind, UpdateToken,
};
use tracing::{debug, error, info, instrument, warn};

/// Where a projected host node came from
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance<N> {
    pub slot: SlotRef,
    /// Nearest enclosing component host at the time of rendering
    pub component: Option<N>,
}

#[derive(Debug, Clone, PartialEq)]
struct CacheKey {
    document: u64,
    definition: NodeId,
    definition_stamp: UpdateToken,
    instance_stamp: UpdateToken,
    registry: RegistryStamp,
}

#[derive(Debug)]
struct CacheEntry {
    key: CacheKey,
    expanded: Rc<Vec<Expanded>>,
}

/// Render state that outlives a single pass
#[derive(Debug)]
pub struct RenderSession<N> {
    config: RenderConfig,
    cache: HashMap<NodeId, CacheEntry>,
    ready: ReadyGate<N>,
    provenance: HashMap<N, Provenance<N>>,
    passes: u64,
}

impl<N: Copy + Eq + Hash + Debug> RenderSession<N> {
    pub fn new(config: RenderConfig) -> Self {
        let ready = ReadyGate::new(config.track_ready);
        Self {
            config,
            cache: HashMap::new(),
            ready,
            provenance: HashMap::new(),
            passes: 0,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Completed passes
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Render the document under `target`, replacing its previous children
    #[instrument(
        skip_all,
        fields(
            document = %document.identity(),
            roots = document.roots().len(),
            pass = self.passes + 1
        )
    )]
    pub fn render<H, R>(
        &mut self,
        document: &Document,
        host: &mut H,
        target: N,
        runtime: &mut R,
    ) -> RenderResult<()>
    where
        H: HostTree<Node = N>,
        R: HandlerRuntime<N>,
    {
        for child in host.children(target) {
            host.remove_child(target, child);
        }
        self.provenance.clear();
        self.ready.begin_pass();

        let registry = Registry::build(document)?;
        let mut pass = Pass {
            document,
            host,
            runtime,
            session: self,
            registry,
            stack: Vec::new(),
            components: Vec::new(),
            expanded: HashSet::new(),
        };
        for &root in document.roots() {
            pass.render_id(root, target)?;
        }
        let expanded = pass.expanded;

        // Entries for instances this pass did not reach are dead
        self.cache.retain(|id, _| expanded.contains(id));

        self.passes += 1;
        info!(
            cached = self.cache.len(),
            projected = self.provenance.len(),
            "Render pass complete"
        );
        Ok(())
    }

    /// Slot and component a projected host node came from
    pub fn provenance(&self, node: N) -> Option<&Provenance<N>> {
        self.provenance.get(&node)
    }

    /// Fire the ready signal and run the hooks queued so far. Returns how
    /// many ran; later calls run nothing.
    pub fn signal_ready<R: HandlerRuntime<N>>(&mut self, runtime: &mut R) -> RenderResult<usize> {
        let hooks = self.ready.fire();
        debug!(count = hooks.len(), "Ready signal fired");
        for hook in &hooks {
            run_hook(runtime, hook)?;
        }
        Ok(hooks.len())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_open()
    }

    pub fn pending_ready_hooks(&self) -> usize {
        self.ready.pending()
    }

    pub fn cached_expansions(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

fn run_hook<N: Copy, R: HandlerRuntime<N>>(runtime: &mut R, hook: &PendingHook<N>) -> RenderResult<()> {
    runtime.invoke(
        &hook.body,
        Invocation {
            event: &hook.name,
            node: hook.node,
            component: hook.component,
            params: &[],
            args: &[],
        },
    )?;
    Ok(())
}

/// View an implicit instance (an element named after a definition) or an
/// explicit one as an instance
fn into_instance(node: Node) -> Option<Instance<Node>> {
    match node.into_kind() {
        NodeKind::Instance(instance) => Some(instance),
        NodeKind::Element(element) => Some(Instance {
            reference: None,
            tag: element.tag,
            attributes: element.attributes,
            fills: BTreeMap::new(),
            children: element.children,
            text: element.text,
        }),
        _ => None,
    }
}

/// `tag#id.class.other`; the tag defaults to `div`
fn parse_selector(selector: &str) -> (String, Option<String>, Vec<String>) {
    let mut tag = String::new();
    let mut id = None;
    let mut classes = Vec::new();

    let mut current = String::new();
    let mut marker = None;
    for ch in selector.chars().chain(std::iter::once('.')) {
        if ch == '#' || ch == '.' {
            match marker {
                None => tag = std::mem::take(&mut current),
                Some('#') => id = Some(std::mem::take(&mut current)),
                Some(_) => classes.push(std::mem::take(&mut current)),
            }
            marker = Some(ch);
        } else {
            current.push(ch);
        }
    }

    if tag.is_empty() {
        tag = "div".to_string();
    }
    classes.retain(|class| !class.is_empty());
    (tag, id.filter(|id| !id.is_empty()), classes)
}

struct Pass<'a, H: HostTree, R> {
    document: &'a Document,
    host: &'a mut H,
    runtime: &'a mut R,
    session: &'a mut RenderSession<H::Node>,
    registry: Registry,
    /// Keys of the definitions being expanded, outermost first
    stack: Vec<String>,
    /// Enclosing component hosts, innermost last
    components: Vec<H::Node>,
    /// Document instances whose expansion was looked up
    expanded: HashSet<NodeId>,
}

impl<'a, H, R> Pass<'a, H, R>
where
    H: HostTree,
    R: HandlerRuntime<H::Node>,
{
    fn component(&self) -> Option<H::Node> {
        self.components.last().copied()
    }

    fn append_text(&mut self, text: &str, parent: H::Node) {
        let node = self.host.create_text(text);
        self.host.append_child(parent, node);
    }

    fn append_raw(&mut self, html: &str, parent: H::Node) {
        let node = self.host.create_raw(html);
        self.host.append_child(parent, node);
    }

    /// Arena nodes authored in the document
    fn render_id(&mut self, id: NodeId, parent: H::Node) -> RenderResult<()> {
        let document = self.document;
        match document.node(id)? {
            NodeKind::Element(element) if !self.registry.contains(&element.tag) => {
                let node = self.open_element(element, parent);
                for &child in &element.children {
                    self.render_id(child, node)?;
                }
                self.run_hooks(&element.hooks, node)
            }
            NodeKind::Element(_) | NodeKind::Instance(_) => {
                match into_instance(document.extract(id)?) {
                    Some(instance) => self.render_instance(instance, Some(id), parent),
                    None => Ok(()),
                }
            }
            NodeKind::Text(text) => {
                self.append_text(&text.value, parent);
                Ok(())
            }
            NodeKind::Raw(raw) => {
                self.append_raw(&raw.html, parent);
                Ok(())
            }
            NodeKind::Definition(_) => Ok(()),
            NodeKind::Slot(slot) => {
                // A slot outside any definition shows its fallback
                for &child in &slot.children {
                    self.render_id(child, parent)?;
                }
                Ok(())
            }
        }
    }

    /// Owned nodes produced by expansion
    fn render_node(&mut self, node: &Node, parent: H::Node) -> RenderResult<()> {
        match node.kind() {
            NodeKind::Element(element) if !self.registry.contains(&element.tag) => {
                let host_node = self.open_element(element, parent);
                for child in &element.children {
                    self.render_node(child, host_node)?;
                }
                self.run_hooks(&element.hooks, host_node)
            }
            NodeKind::Element(_) | NodeKind::Instance(_) => match into_instance(node.clone()) {
                Some(instance) => self.render_instance(instance, None, parent),
                None => Ok(()),
            },
            NodeKind::Text(text) => {
                self.append_text(&text.value, parent);
                Ok(())
            }
            NodeKind::Raw(raw) => {
                self.append_raw(&raw.html, parent);
                Ok(())
            }
            NodeKind::Definition(_) => Ok(()),
            NodeKind::Slot(slot) => {
                for child in &slot.children {
                    self.render_node(child, parent)?;
                }
                Ok(())
            }
        }
    }

    /// Create an element (inside its selector wrappers) with attributes and
    /// direct text, attached to `parent`. Children are up to the caller.
    fn open_element<C>(&mut self, element: &Element<C>, parent: H::Node) -> H::Node {
        let mut attach = parent;
        for selector in &element.selector {
            let (tag, id, classes) = parse_selector(selector);
            let wrapper = self.host.create_element(&tag);
            if let Some(id) = id {
                self.host.set_attribute(wrapper, "id", &id);
            }
            if !classes.is_empty() {
                self.host.set_attribute(wrapper, "class", &classes.join(" "));
            }
            self.host.append_child(attach, wrapper);
            attach = wrapper;
        }

        let node = self.host.create_element(&element.tag);
        for (name, value) in &element.attributes {
            self.host.set_attribute(node, name, value);
        }
        if let Some(text) = &element.text {
            self.append_text(text, node);
        }
        self.host.append_child(attach, node);
        node
    }

    #[instrument(skip_all, fields(tag = %instance.tag, cached = id.is_some()))]
    fn render_instance(
        &mut self,
        instance: Instance<Node>,
        id: Option<NodeId>,
        parent: H::Node,
    ) -> RenderResult<()> {
        let Some(registered) = self.registry.resolve(&instance).cloned() else {
            warn!(
                tag = %instance.tag,
                reference = ?instance.reference,
                "No definition matches instance, rendering as plain element"
            );
            return self.render_unmatched(&instance, parent);
        };

        let key = registered.definition.key();
        if self.stack.contains(&key) {
            let mut call_stack = self.stack.clone();
            call_stack.push(key);
            error!(
                definition = %registered.definition.id,
                stack = ?call_stack,
                "Recursive definition usage detected"
            );
            return Err(RenderError::RecursiveDefinition {
                definition: registered.definition.id.clone(),
                call_stack,
            });
        }

        self.stack.push(key);
        let result = self.expansion(&registered, &instance, id).and_then(|expanded| {
            match registered.definition.kind {
                DefinitionKind::Component => {
                    self.render_component(&registered, &instance, &expanded, parent)
                }
                DefinitionKind::Template => self.render_expanded(&expanded, parent),
            }
        });
        self.stack.pop();
        result
    }

    fn expansion(
        &mut self,
        registered: &Registered,
        instance: &Instance<Node>,
        id: Option<NodeId>,
    ) -> RenderResult<Rc<Vec<Expanded>>> {
        let cache_key = match id {
            Some(id) if self.session.config.cache_templates => Some((
                id,
                CacheKey {
                    document: self.document.identity().value(),
                    definition: registered.node,
                    definition_stamp: self.document.subtree_stamp(registered.node)?,
                    instance_stamp: self.document.subtree_stamp(id)?,
                    registry: self.registry.stamp(),
                },
            )),
            _ => None,
        };

        if let Some((id, _)) = &cache_key {
            self.expanded.insert(*id);
        }
        if let Some((id, key)) = &cache_key {
            if let Some(entry) = self.session.cache.get(id) {
                if entry.key == *key {
                    debug!(instance = %id, "Reusing cached expansion");
                    return Ok(Rc::clone(&entry.expanded));
                }
            }
        }

        let fills = FillMap::resolve(&registered.definition, instance);
        let expanded = Rc::new(expand(
            &registered.definition.template,
            &fills,
            &self.registry,
        ));

        if let Some((id, key)) = cache_key {
            self.session.cache.insert(
                id,
                CacheEntry {
                    key,
                    expanded: Rc::clone(&expanded),
                },
            );
        }
        Ok(expanded)
    }

    fn render_component(
        &mut self,
        registered: &Registered,
        instance: &Instance<Node>,
        expanded: &[Expanded],
        parent: H::Node,
    ) -> RenderResult<()> {
        let definition = &registered.definition;
        let host_node = self.host.create_element(definition.host_tag());
        for (name, value) in &instance.attributes {
            self.host.set_attribute(host_node, name, value);
        }
        let component_attr = self.session.config.component_attr.clone();
        self.host
            .set_attribute(host_node, &component_attr, &definition.id);
        for method in &definition.methods {
            self.host.bind_method(host_node, method);
        }
        self.host.append_child(parent, host_node);

        self.components.push(host_node);
        let result = self
            .render_expanded(expanded, host_node)
            .and_then(|_| self.run_hooks(&definition.hooks, host_node));
        self.components.pop();
        result
    }

    fn render_expanded(&mut self, items: &[Expanded], parent: H::Node) -> RenderResult<()> {
        for item in items {
            match item {
                Expanded::Element { element, children } => {
                    let node = self.open_element(element, parent);
                    self.render_expanded(children, node)?;
                    self.run_hooks(&element.hooks, node)?;
                }
                Expanded::Node(node) => self.render_node(node, parent)?,
                Expanded::Projected { node, slot } => {
                    let before = self.host.children(parent).len();
                    self.render_node(node, parent)?;
                    let component = self.component();
                    for created in self.host.children(parent).into_iter().skip(before) {
                        self.session.provenance.insert(
                            created,
                            Provenance {
                                slot: slot.clone(),
                                component,
                            },
                        );
                    }
                }
            }
        }
        Ok(())
    }

    fn render_unmatched(&mut self, instance: &Instance<Node>, parent: H::Node) -> RenderResult<()> {
        let node = self.host.create_element(&instance.tag);
        for (name, value) in &instance.attributes {
            self.host.set_attribute(node, name, value);
        }
        if let Some(text) = &instance.text {
            self.append_text(text, node);
        }
        self.host.append_child(parent, node);

        for content in instance.fills.values() {
            for child in content {
                self.render_node(child, node)?;
            }
        }
        for child in &instance.children {
            self.render_node(child, node)?;
        }
        Ok(())
    }

    fn run_hooks(&mut self, hooks: &[Hook], node: H::Node) -> RenderResult<()> {
        for (index, hook) in hooks.iter().enumerate() {
            let pending = PendingHook {
                node,
                component: self.component(),
                index,
                name: hook.name.clone(),
                body: hook.body.clone(),
            };
            if hook.is_ready() {
                if let Some(pending) = self.session.ready.request(pending) {
                    run_hook(&mut *self.runtime, &pending)?;
                }
            } else {
                run_hook(&mut *self.runtime, &pending)?;
            }
        }
        Ok(())
    }
}
