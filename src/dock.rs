//! The controller a host application talks to.
//!
//! Owns the window list (each window owns one layout tree), the live panel
//! attachments, and the gesture coordinator. All methods run on the host's
//! UI thread; nothing here blocks or locks. Structure flows one way: tree
//! mutations and reconciliation produce new trees and emit [`DockEvent`]s,
//! and the gesture engine reads tree state and reports index commits that
//! this controller applies back.

use std::path::PathBuf;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::common::collections::{HashMap, HashSet};
use crate::common::config::{self, Settings};
use crate::error::DockError;
use crate::model::{LayoutNode, NodeId, Rect, Tab, TabId, WindowId};
use crate::navigation::{EngineId, GestureCoordinator, NavEvent, ScrollEvent};
use crate::persist::{DragPayload, LayoutSnapshot, WindowLayout};
use crate::reconcile::{self, ReconcileCommands};

const DEFAULT_FRAME: Rect = Rect { x: 120.0, y: 120.0, width: 1280.0, height: 800.0 };
const CASCADE_OFFSET: f64 = 40.0;

/// Host-supplied content unit. The tree only ever stores its id; the live
/// object is attached transiently for rendering.
pub trait Panel {
    fn id(&self) -> TabId;
    fn title(&self) -> String;
    fn icon_name(&self) -> Option<String>;
}

/// Resolves a persisted tab id back to live content on load. Tabs the
/// provider cannot resolve stay in the tree as placeholders.
pub type PanelProvider = Box<dyn Fn(TabId) -> Option<Rc<dyn Panel>>>;

/// Everything the host has to react to, as one explicit enum rather than a
/// sheaf of optional delegate callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum DockEvent {
    WindowOpened(WindowId),
    WindowClosed(WindowId),
    /// Tear down and rebuild the live views under this node; nothing above
    /// or beside it moved.
    SubtreeRebuilt { window: WindowId, node: NodeId },
    /// Re-apply split proportions in place.
    ProportionsChanged { window: WindowId, node: NodeId },
    /// Selection or titles changed; refresh chrome, keep the views.
    SelectionRefreshed { window: WindowId, node: NodeId },
    WindowReframed(WindowId),
    PanelAttached(TabId),
    PanelDetached(TabId),
    /// A persisted tab had no live panel behind it; it renders with its
    /// saved title and icon but no content.
    PanelPlaceholder(TabId),
    StageOffsetChanged { host: NodeId, base_index: usize, offset: f64 },
    StageGestureEnded { host: NodeId, committed: bool },
    StageCommitted { host: NodeId, index: usize },
}

pub struct DockController {
    settings: Settings,
    windows: Vec<WindowLayout>,
    panels: HashMap<TabId, Rc<dyn Panel>>,
    panel_provider: Option<PanelProvider>,
    gestures: GestureCoordinator,
    engines: HashMap<NodeId, EngineId>,
    hosts: HashMap<EngineId, NodeId>,
    reconciling: bool,
}

impl Default for DockController {
    fn default() -> Self {
        DockController::new(Settings::default())
    }
}

impl DockController {
    pub fn new(settings: Settings) -> Self {
        let gestures = GestureCoordinator::new(settings.gestures.clone());
        DockController {
            settings,
            windows: Vec::new(),
            panels: HashMap::default(),
            panel_provider: None,
            gestures,
            engines: HashMap::default(),
            hosts: HashMap::default(),
            reconciling: false,
        }
    }

    pub fn set_panel_provider(&mut self, provider: PanelProvider) {
        self.panel_provider = Some(provider);
    }

    pub fn windows(&self) -> &[WindowLayout] {
        &self.windows
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot { windows: self.windows.clone() }
    }

    pub fn panel(&self, id: TabId) -> Option<Rc<dyn Panel>> {
        self.panels.get(&id).cloned()
    }

    /// A tab that is in some tree but has no live panel behind it.
    pub fn is_placeholder(&self, id: TabId) -> bool {
        !self.panels.contains_key(&id)
            && self.windows.iter().any(|w| w.root.contains_tab(id))
    }

    /// Adds a panel as a tab in the first tab group of the first window,
    /// opening a window when none exists.
    pub fn add_panel(&mut self, panel: Rc<dyn Panel>) -> TabId {
        let tab = self.tab_for(&panel);
        let tab_id = tab.id;
        self.panels.insert(tab_id, panel);

        let target_group = self.windows.iter().find_map(|w| {
            w.root
                .nodes()
                .find(|n| matches!(n, LayoutNode::TabGroup { .. }))
                .map(|n| (w.id, n.id()))
        });
        match target_group {
            Some((window_id, group_id)) => {
                self.update_root(window_id, |root| {
                    root.inserting_tab(group_id, tab, usize::MAX)
                });
            }
            None => {
                let window = WindowLayout::new(LayoutNode::group(vec![tab]), DEFAULT_FRAME);
                info!(window = %window.id, %tab_id, "opening first window for panel");
                self.windows.push(window);
            }
        }
        self.sync_engines();
        tab_id
    }

    /// Adds a panel into a specific group at an index (both clamped per the
    /// tree's rules).
    pub fn add_panel_to_group(
        &mut self,
        panel: Rc<dyn Panel>,
        group: NodeId,
        at_index: usize,
    ) -> TabId {
        let tab = self.tab_for(&panel);
        let tab_id = tab.id;
        self.panels.insert(tab_id, panel);
        if let Some(window_id) = self.window_with_group(group) {
            self.update_root(window_id, |root| root.inserting_tab(group, tab, at_index));
        } else {
            warn!(%group, "add_panel_to_group: no window holds that group");
        }
        self.sync_engines();
        tab_id
    }

    /// Removes the panel's tab wherever it is, pruning what empties out.
    pub fn remove_panel(&mut self, id: TabId) -> bool {
        self.panels.remove(&id);
        let mut removed = false;
        for index in 0..self.windows.len() {
            let window_id = self.windows[index].id;
            if !self.windows[index].root.contains_tab(id) {
                continue;
            }
            self.update_root(window_id, |root| {
                let (root, changed) = root.removing_tab(id);
                removed = changed;
                root
            });
            break;
        }
        if removed {
            self.close_emptied_windows();
            self.sync_engines();
        }
        removed
    }

    /// Tears a panel out into its own window (the drop-on-desktop half of a
    /// drag). The tab's cargo rides along untouched. Returns the new
    /// window's id.
    pub fn detach_panel(&mut self, id: TabId) -> Option<WindowId> {
        let source_index = self.windows.iter().position(|w| w.root.contains_tab(id))?;
        let source_frame = self.windows[source_index].frame;
        let window_id = self.windows[source_index].id;

        let mut detached = None;
        self.update_root(window_id, |root| {
            let (root, tab) = root.detaching_tab(id);
            detached = tab;
            root
        });
        let tab = detached?;

        let frame = Rect::new(
            source_frame.x + CASCADE_OFFSET,
            source_frame.y + CASCADE_OFFSET,
            source_frame.width,
            source_frame.height,
        );
        let window = WindowLayout::new(LayoutNode::group(vec![tab]), frame);
        let new_id = window.id;
        debug!(%id, window = %new_id, "detached panel into its own window");
        self.windows.push(window);
        self.close_emptied_windows();
        self.sync_engines();
        Some(new_id)
    }

    /// Moves a tab to a group anywhere in the controller, across windows if
    /// needed. Within one window this is the tree's own move; across
    /// windows it is the documented remove-then-insert pair.
    pub fn move_tab(&mut self, tab_id: TabId, to_group: NodeId, at_index: usize) -> bool {
        let Some(source) = self.windows.iter().position(|w| w.root.contains_tab(tab_id)) else {
            return false;
        };
        let Some(target_window) = self.window_with_group(to_group) else {
            return false;
        };
        let source_id = self.windows[source].id;

        if source_id == target_window {
            self.update_root(source_id, |root| root.moving_tab(tab_id, to_group, at_index));
        } else {
            let mut carried = None;
            self.update_root(source_id, |root| {
                let (root, tab) = root.detaching_tab(tab_id);
                carried = tab;
                root
            });
            let Some(tab) = carried else { return false };
            self.update_root(target_window, |root| {
                root.inserting_tab(to_group, tab, at_index)
            });
            self.close_emptied_windows();
        }
        self.sync_engines();
        true
    }

    pub fn drag_payload(&self, tab_id: TabId) -> Option<DragPayload> {
        for window in &self.windows {
            let Some(group) = window.root.group_of_tab(tab_id) else { continue };
            let tab = window.root.find_tab(tab_id)?;
            return Some(DragPayload {
                tab_id,
                source_group_id: group,
                title: tab.title.clone(),
                icon_name: tab.icon_name.clone(),
            });
        }
        None
    }

    pub fn compute_commands(&self, target: &LayoutSnapshot) -> ReconcileCommands {
        reconcile::compute_commands(&self.snapshot(), target)
    }

    /// Applies a target layout incrementally. Identical branches are left
    /// alone; the emitted events name exactly the work a host has to do.
    /// Calling again with the same target is a no-op. Overlapping calls are
    /// a contract violation and are rejected.
    pub fn update_layout(&mut self, target: &LayoutSnapshot) -> Result<Vec<DockEvent>, DockError> {
        if self.reconciling {
            return Err(DockError::ReentrantReconcile);
        }
        self.reconciling = true;
        let events = self.apply_target(target);
        self.reconciling = false;
        Ok(events)
    }

    fn apply_target(&mut self, target: &LayoutSnapshot) -> Vec<DockEvent> {
        let current = self.snapshot();
        let diff = reconcile::diff(&current, target);
        let commands = reconcile::compute_commands(&current, target);
        if diff.is_empty() && commands.is_empty() {
            debug!("update_layout: target already applied");
            return Vec::new();
        }

        let mut events = Vec::new();
        for id in commands.panels_to_remove {
            self.panels.remove(&id);
            events.push(DockEvent::PanelDetached(id));
        }
        for (id, _cargo) in commands.panels_to_create {
            let resolved = self.panel_provider.as_ref().and_then(|provider| provider(id));
            match resolved {
                Some(panel) => {
                    self.panels.insert(id, panel);
                    events.push(DockEvent::PanelAttached(id));
                }
                None => {
                    warn!(%id, "no live panel for tab; keeping placeholder");
                    events.push(DockEvent::PanelPlaceholder(id));
                }
            }
        }

        for id in &diff.opened {
            events.push(DockEvent::WindowOpened(*id));
        }
        for id in &diff.closed {
            events.push(DockEvent::WindowClosed(*id));
        }
        for (window, node) in &diff.rebuilt {
            events.push(DockEvent::SubtreeRebuilt { window: *window, node: *node });
        }
        for (window, node) in &diff.resized {
            events.push(DockEvent::ProportionsChanged { window: *window, node: *node });
        }
        for (window, node) in &diff.refreshed {
            events.push(DockEvent::SelectionRefreshed { window: *window, node: *node });
        }
        for window in &diff.reframed {
            events.push(DockEvent::WindowReframed(*window));
        }

        info!(
            opened = diff.opened.len(),
            closed = diff.closed.len(),
            rebuilt = diff.rebuilt.len(),
            "applied target layout"
        );
        self.windows = target.windows.clone();
        self.sync_engines();
        events
    }

    pub fn save_layout(&self) -> anyhow::Result<()> {
        self.save_layout_to(config::layout_file())
    }

    pub fn save_layout_to(&self, path: PathBuf) -> anyhow::Result<()> {
        self.snapshot().save(path)?;
        Ok(())
    }

    pub fn load_saved_layout(&mut self) -> anyhow::Result<Vec<DockEvent>> {
        self.load_layout_from(config::layout_file())
    }

    pub fn load_layout_from(&mut self, path: PathBuf) -> anyhow::Result<Vec<DockEvent>> {
        let snapshot = LayoutSnapshot::load(path)?;
        let events = self.update_layout(&snapshot)?;
        Ok(events)
    }

    /// Routes one scroll sample to the engine of a stage host. Committed
    /// index changes are applied back to the tree here; the engine itself
    /// never touches it.
    pub fn handle_stage_scroll(&mut self, host: NodeId, event: ScrollEvent) -> Vec<DockEvent> {
        let Some(engine) = self.engines.get(&host).copied() else {
            warn!(%host, "scroll for unknown stage host");
            return Vec::new();
        };
        let response = self.gestures.handle_scroll(engine, event);
        self.translate_nav(response.events)
    }

    /// Advances in-flight settles; call once per frame with the elapsed
    /// seconds.
    pub fn tick(&mut self, dt: f64) -> Vec<DockEvent> {
        let response = self.gestures.tick(dt);
        self.translate_nav(response.events)
    }

    /// Tells the engine how wide a stage host is on screen; one host width
    /// is one gesture step.
    pub fn set_stage_host_width(&mut self, host: NodeId, width: f64) {
        if let Some(engine) = self.engines.get(&host) {
            self.gestures.set_host_width(*engine, width);
        }
    }

    fn translate_nav(&mut self, events: Vec<(EngineId, NavEvent)>) -> Vec<DockEvent> {
        let mut out = Vec::new();
        for (engine, event) in events {
            let Some(host) = self.hosts.get(&engine).copied() else { continue };
            match event {
                NavEvent::OffsetChanged { base_index, offset } => {
                    out.push(DockEvent::StageOffsetChanged { host, base_index, offset });
                }
                NavEvent::GestureEnded { committed } => {
                    out.push(DockEvent::StageGestureEnded { host, committed });
                }
                NavEvent::IndexCommitted { index } => {
                    if let Some(window_id) = self.window_with_node(host) {
                        self.update_root(window_id, |root| root.with_active_stage(host, index));
                    }
                    out.push(DockEvent::StageCommitted { host, index });
                }
                NavEvent::BubbledToParent => {}
            }
        }
        out
    }

    #[cfg(test)]
    pub(crate) fn set_reconciling_for_test(&mut self, value: bool) {
        self.reconciling = value;
    }

    fn tab_for(&self, panel: &Rc<dyn Panel>) -> Tab {
        Tab {
            id: panel.id(),
            title: panel.title(),
            icon_name: panel.icon_name(),
            cargo: serde_json::Value::Null,
        }
    }

    fn window_with_group(&self, group: NodeId) -> Option<WindowId> {
        self.windows
            .iter()
            .find(|w| w.root.find_group(group).is_some())
            .map(|w| w.id)
    }

    fn window_with_node(&self, node: NodeId) -> Option<WindowId> {
        self.windows
            .iter()
            .find(|w| w.root.find_node(node).is_some())
            .map(|w| w.id)
    }

    fn update_root(&mut self, window: WindowId, f: impl FnOnce(LayoutNode) -> LayoutNode) {
        let Some(entry) = self.windows.iter_mut().find(|w| w.id == window) else { return };
        let root = std::mem::replace(&mut entry.root, LayoutNode::empty_group());
        entry.root = f(root);
    }

    fn close_emptied_windows(&mut self) {
        if !self.settings.close_empty_windows {
            return;
        }
        self.windows.retain(|w| {
            let keep = !w.root.is_empty_tab_group();
            if !keep {
                info!(window = %w.id, "closing emptied window");
            }
            keep
        });
    }

    /// Rebuilds the engine forest to mirror the stage hosts currently in
    /// the trees. Parent links follow host nesting; hosts keep their engine
    /// (and any in-flight state is resynced) across structural changes.
    fn sync_engines(&mut self) {
        struct HostInfo {
            node: NodeId,
            stage_count: usize,
            active_index: usize,
            parent: Option<NodeId>,
            width: f64,
        }

        fn collect(
            node: &LayoutNode,
            parent: Option<NodeId>,
            width: f64,
            out: &mut Vec<HostInfo>,
        ) {
            match node {
                LayoutNode::StageHost { id, stages, active_stage_index, .. } => {
                    out.push(HostInfo {
                        node: *id,
                        stage_count: stages.len(),
                        active_index: *active_stage_index,
                        parent,
                        width,
                    });
                    for stage in stages {
                        collect(&stage.layout, Some(*id), width, out);
                    }
                }
                LayoutNode::Split { children, .. } => {
                    for child in children {
                        collect(child, parent, width, out);
                    }
                }
                LayoutNode::TabGroup { .. } => {}
            }
        }

        let mut found = Vec::new();
        for window in &self.windows {
            collect(&window.root, None, window.frame.width, &mut found);
        }

        let live: HashSet<NodeId> = found.iter().map(|h| h.node).collect();
        let stale: Vec<NodeId> =
            self.engines.keys().filter(|n| !live.contains(n)).copied().collect();
        for node in stale {
            if let Some(engine) = self.engines.remove(&node) {
                self.hosts.remove(&engine);
                self.gestures.remove_host(engine);
            }
        }

        // Pre-order guarantees a parent host is registered before the hosts
        // nested inside its stages.
        for info in found {
            match self.engines.get(&info.node).copied() {
                Some(engine) => {
                    self.gestures.sync_host(engine, info.stage_count, info.active_index);
                }
                None => {
                    let parent_engine =
                        info.parent.and_then(|p| self.engines.get(&p).copied());
                    let engine = self.gestures.register_host(
                        info.stage_count,
                        info.active_index,
                        info.width,
                        parent_engine,
                    );
                    self.engines.insert(info.node, engine);
                    self.hosts.insert(engine, info.node);
                }
            }
        }
    }
}
