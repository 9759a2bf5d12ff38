//! Diffing a live layout against a target layout.
//!
//! Two layers. [`compute_commands`] answers "which panels must exist" by tab
//! id presence alone; it is order-independent with respect to tree shape.
//! [`diff`] answers "which live objects must be touched" and pins down the
//! minimality rules: a branch rebuilds at the shallowest node whose variant,
//! id, or child identity sequence changed, and nothing above or beside it is
//! disturbed. Proportion-only and selection-only differences are reported
//! separately so hosts can apply them without tearing anything down.
//!
//! Ordering guarantees: panel creations come in target pre-order (windows in
//! target order), removals in current pre-order. The same input pair always
//! produces the same output.

use serde_json::Value;
use tracing::trace;

use crate::common::collections::HashSet;
use crate::model::{LayoutNode, NodeId, TabId, WindowId, PROPORTION_EPSILON};
use crate::persist::LayoutSnapshot;

/// Panel lifecycle commands needed to go from `current` to `target`.
#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileCommands {
    /// Tab ids present only in the target, with their cargo payloads.
    pub panels_to_create: Vec<(TabId, Value)>,
    /// Tab ids present only in the current layout.
    pub panels_to_remove: Vec<TabId>,
}

impl ReconcileCommands {
    pub fn is_empty(&self) -> bool {
        self.panels_to_create.is_empty() && self.panels_to_remove.is_empty()
    }
}

pub fn compute_commands(current: &LayoutSnapshot, target: &LayoutSnapshot) -> ReconcileCommands {
    let current_ids: HashSet<TabId> =
        current.windows.iter().flat_map(|w| w.root.tab_ids()).collect();
    let target_ids: HashSet<TabId> =
        target.windows.iter().flat_map(|w| w.root.tab_ids()).collect();

    let mut seen = HashSet::default();
    let mut panels_to_create = Vec::new();
    for window in &target.windows {
        for tab in window.root.tabs() {
            if !current_ids.contains(&tab.id) && seen.insert(tab.id) {
                panels_to_create.push((tab.id, tab.cargo.clone()));
            }
        }
    }

    let mut seen = HashSet::default();
    let mut panels_to_remove = Vec::new();
    for window in &current.windows {
        for tab in window.root.tabs() {
            if !target_ids.contains(&tab.id) && seen.insert(tab.id) {
                panels_to_remove.push(tab.id);
            }
        }
    }

    ReconcileCommands { panels_to_create, panels_to_remove }
}

/// Structural difference between two snapshots, expressed as the minimal
/// work a host has to perform on its live objects.
#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutDiff {
    /// Windows present only in the target.
    pub opened: Vec<WindowId>,
    /// Windows present only in the current layout.
    pub closed: Vec<WindowId>,
    /// Shallowest changed subtree roots, per window; node ids refer to the
    /// target tree.
    pub rebuilt: Vec<(WindowId, NodeId)>,
    /// Splits whose proportions changed but whose structure did not.
    pub resized: Vec<(WindowId, NodeId)>,
    /// Groups/hosts whose selection or presentation changed but whose
    /// structure did not.
    pub refreshed: Vec<(WindowId, NodeId)>,
    /// Windows whose frame or full-screen flag changed.
    pub reframed: Vec<WindowId>,
}

impl LayoutDiff {
    pub fn is_empty(&self) -> bool {
        self.opened.is_empty()
            && self.closed.is_empty()
            && self.rebuilt.is_empty()
            && self.resized.is_empty()
            && self.refreshed.is_empty()
            && self.reframed.is_empty()
    }
}

pub fn diff(current: &LayoutSnapshot, target: &LayoutSnapshot) -> LayoutDiff {
    let mut out = LayoutDiff::default();

    for window in &target.windows {
        match current.window(window.id) {
            None => out.opened.push(window.id),
            Some(live) => {
                if live.frame != window.frame || live.is_full_screen != window.is_full_screen {
                    out.reframed.push(window.id);
                }
                diff_nodes(&live.root, &window.root, window.id, &mut out);
            }
        }
    }
    for window in &current.windows {
        if target.window(window.id).is_none() {
            out.closed.push(window.id);
        }
    }

    if !out.is_empty() {
        trace!(
            opened = out.opened.len(),
            closed = out.closed.len(),
            rebuilt = out.rebuilt.len(),
            "computed layout diff"
        );
    }
    out
}

fn diff_nodes(current: &LayoutNode, target: &LayoutNode, window: WindowId, out: &mut LayoutDiff) {
    match (current, target) {
        (
            LayoutNode::Split {
                id: cur_id,
                axis: cur_axis,
                children: cur_children,
                proportions: cur_props,
            },
            LayoutNode::Split {
                id: tgt_id,
                axis: tgt_axis,
                children: tgt_children,
                proportions: tgt_props,
            },
        ) if cur_id == tgt_id
            && cur_axis == tgt_axis
            && cur_children.len() == tgt_children.len() =>
        {
            for (cur, tgt) in cur_children.iter().zip(tgt_children) {
                diff_nodes(cur, tgt, window, out);
            }
            if !proportions_match(cur_props, tgt_props) {
                out.resized.push((window, *tgt_id));
            }
        }
        (
            LayoutNode::TabGroup {
                id: cur_id,
                tabs: cur_tabs,
                active_tab_index: cur_active,
                display_mode: cur_mode,
            },
            LayoutNode::TabGroup {
                id: tgt_id,
                tabs: tgt_tabs,
                active_tab_index: tgt_active,
                display_mode: tgt_mode,
            },
        ) if cur_id == tgt_id
            && cur_tabs.iter().map(|t| t.id).eq(tgt_tabs.iter().map(|t| t.id)) =>
        {
            let presentation_changed = cur_tabs
                .iter()
                .zip(tgt_tabs)
                .any(|(c, t)| c.title != t.title || c.icon_name != t.icon_name);
            if cur_active != tgt_active || cur_mode != tgt_mode || presentation_changed {
                out.refreshed.push((window, *tgt_id));
            }
        }
        (
            LayoutNode::StageHost {
                id: cur_id,
                stages: cur_stages,
                active_stage_index: cur_active,
                display_mode: cur_mode,
            },
            LayoutNode::StageHost {
                id: tgt_id,
                stages: tgt_stages,
                active_stage_index: tgt_active,
                display_mode: tgt_mode,
            },
        ) if cur_id == tgt_id
            && cur_stages.iter().map(|s| s.id).eq(tgt_stages.iter().map(|s| s.id)) =>
        {
            for (cur, tgt) in cur_stages.iter().zip(tgt_stages) {
                diff_nodes(&cur.layout, &tgt.layout, window, out);
            }
            let presentation_changed = cur_stages
                .iter()
                .zip(tgt_stages)
                .any(|(c, t)| c.title != t.title || c.icon_name != t.icon_name);
            if cur_active != tgt_active || cur_mode != tgt_mode || presentation_changed {
                out.refreshed.push((window, *tgt_id));
            }
        }
        // Variant, id, or child identity changed: rebuild from here down.
        _ => out.rebuilt.push((window, target.id())),
    }
}

fn proportions_match(current: &[f64], target: &[f64]) -> bool {
    current.len() == target.len()
        && current
            .iter()
            .zip(target)
            .all(|(c, t)| (c - t).abs() <= PROPORTION_EPSILON)
}
