//! Structural mutations over [`LayoutNode`] trees.
//!
//! Every operation is a pure transform: it consumes the tree and returns a
//! new, normalized one. Unknown ids leave the tree unchanged rather than
//! erroring, and out-of-range indices clamp. Where an id could match more
//! than one node, the first pre-order match wins; that is a documented
//! policy, not an error condition.

use tracing::{debug, trace};

use super::node::{
    LayoutNode, NodeId, SplitDirection, Stage, Tab, TabId, PROPORTION_EPSILON,
};

/// Smallest share a split child can be resized down to.
const MIN_SHARE: f64 = 0.05;

impl LayoutNode {
    /// Moves a tab to another group, inserting at `at_index` (clamped) and
    /// making it active there. If either the tab or the target group is not
    /// found the tree is returned unchanged. Moves are confined to this
    /// tree; cross-window moves are an explicit remove + insert by the
    /// caller.
    pub fn moving_tab(mut self, tab_id: TabId, to_group: NodeId, at_index: usize) -> LayoutNode {
        if self.find_group(to_group).is_none() {
            trace!(%tab_id, %to_group, "move target group not found, leaving tree unchanged");
            return self;
        }
        let Some(tab) = self.take_tab(tab_id) else {
            trace!(%tab_id, "tab to move not found, leaving tree unchanged");
            return self;
        };
        let mut slot = Some(tab);
        let inserted = self.insert_tab_at(to_group, &mut slot, at_index);
        debug_assert!(inserted, "target group vanished during move");
        debug!(%tab_id, %to_group, at_index, "moved tab");
        self
    }

    /// Replaces the tab group `group_id` with a split of the existing group
    /// and a new singleton group holding `with_tab`. The new group sits on
    /// the edge named by `direction`; proportions start at an even split.
    /// Unknown ids are a no-op.
    pub fn splitting(
        mut self,
        group_id: NodeId,
        direction: SplitDirection,
        with_tab: Tab,
    ) -> LayoutNode {
        let mut slot = Some(with_tab);
        if self.split_at(group_id, direction, &mut slot) {
            debug!(%group_id, %direction, "split tab group");
        } else {
            trace!(%group_id, "group to split not found, leaving tree unchanged");
        }
        self
    }

    /// Removes the tab wherever it is found, then normalizes. The flag
    /// reports whether the tab was present.
    pub fn removing_tab(mut self, tab_id: TabId) -> (LayoutNode, bool) {
        let removed = self.take_tab(tab_id).is_some();
        if removed {
            debug!(%tab_id, "removed tab");
        }
        (self.cleaned_up(), removed)
    }

    /// Removes the tab and hands it back for re-insertion elsewhere: the
    /// caller-driven half of a cross-window move. The remaining tree is
    /// normalized.
    pub fn detaching_tab(mut self, tab_id: TabId) -> (LayoutNode, Option<Tab>) {
        let tab = self.take_tab(tab_id);
        (self.cleaned_up(), tab)
    }

    /// Inserts a tab into the group `group_id` at `at_index` (clamped),
    /// making it active. Unknown group id is a no-op.
    pub fn inserting_tab(mut self, group_id: NodeId, tab: Tab, at_index: usize) -> LayoutNode {
        let mut slot = Some(tab);
        if !self.insert_tab_at(group_id, &mut slot, at_index) {
            trace!(%group_id, "group to insert into not found, leaving tree unchanged");
        }
        self
    }

    /// Bottom-up normalization: empty tab groups are dropped from splits, a
    /// split left with one child is replaced by that child, and a split
    /// left with none becomes an empty tab group. Surviving proportions are
    /// renormalized. Idempotent.
    pub fn cleaned_up(self) -> LayoutNode {
        match self {
            node @ LayoutNode::TabGroup { .. } => node,
            LayoutNode::StageHost { id, stages, active_stage_index, display_mode } => {
                let stages: Vec<Stage> = stages
                    .into_iter()
                    .map(|s| Stage { layout: s.layout.cleaned_up(), ..s })
                    .collect();
                let active_stage_index = active_stage_index.min(stages.len().saturating_sub(1));
                LayoutNode::StageHost { id, stages, active_stage_index, display_mode }
            }
            LayoutNode::Split { id, axis, children, proportions } => {
                // Self-heal a length mismatch by falling back to even shares.
                let shares = if proportions.len() == children.len() {
                    proportions
                } else {
                    vec![1.0 / children.len().max(1) as f64; children.len()]
                };
                let mut kept = Vec::with_capacity(children.len());
                let mut kept_shares = Vec::with_capacity(shares.len());
                for (child, share) in children.into_iter().zip(shares) {
                    let child = child.cleaned_up();
                    if child.is_empty_tab_group() {
                        continue;
                    }
                    kept.push(child);
                    kept_shares.push(share);
                }
                match kept.len() {
                    0 => LayoutNode::empty_group(),
                    // Promotion: the split disappears, the child takes its place.
                    1 => kept.remove(0),
                    _ => LayoutNode::Split {
                        id,
                        axis,
                        children: kept,
                        proportions: normalized_shares(kept_shares),
                    },
                }
            }
        }
    }

    /// Selects a tab by index in the group `group_id`, clamped to the valid
    /// range. Unknown group id is a no-op.
    pub fn with_active_tab(mut self, group_id: NodeId, index: usize) -> LayoutNode {
        self.select_tab(group_id, index);
        self
    }

    /// Selects a stage by index in the host `host_id`, clamped to the valid
    /// range. Unknown host id is a no-op.
    pub fn with_active_stage(mut self, host_id: NodeId, index: usize) -> LayoutNode {
        self.select_stage(host_id, index);
        self
    }

    /// Grows child `child_index` of the split `split_id` by `delta` of the
    /// total, shrinking its nearest following sibling (the previous one for
    /// the last child). Shares clamp so neither drops below a minimum.
    pub fn resizing_child(mut self, split_id: NodeId, child_index: usize, delta: f64) -> LayoutNode {
        self.resize_at(split_id, child_index, delta);
        self
    }

    /// Resets every split in the tree to even proportions.
    pub fn equalized(self) -> LayoutNode {
        match self {
            node @ LayoutNode::TabGroup { .. } => node,
            LayoutNode::StageHost { id, stages, active_stage_index, display_mode } => {
                let stages = stages
                    .into_iter()
                    .map(|s| Stage { layout: s.layout.equalized(), ..s })
                    .collect();
                LayoutNode::StageHost { id, stages, active_stage_index, display_mode }
            }
            LayoutNode::Split { id, axis, children, .. } => {
                let n = children.len().max(1);
                LayoutNode::Split {
                    id,
                    axis,
                    proportions: vec![1.0 / n as f64; children.len()],
                    children: children.into_iter().map(LayoutNode::equalized).collect(),
                }
            }
        }
    }

    fn take_tab(&mut self, tab_id: TabId) -> Option<Tab> {
        match self {
            LayoutNode::TabGroup { tabs, active_tab_index, .. } => {
                let idx = tabs.iter().position(|t| t.id == tab_id)?;
                let tab = tabs.remove(idx);
                if idx < *active_tab_index {
                    *active_tab_index -= 1;
                }
                if *active_tab_index >= tabs.len() {
                    *active_tab_index = tabs.len().saturating_sub(1);
                }
                Some(tab)
            }
            LayoutNode::Split { children, .. } => {
                children.iter_mut().find_map(|c| c.take_tab(tab_id))
            }
            LayoutNode::StageHost { stages, .. } => {
                stages.iter_mut().find_map(|s| s.layout.take_tab(tab_id))
            }
        }
    }

    fn insert_tab_at(&mut self, group_id: NodeId, slot: &mut Option<Tab>, at: usize) -> bool {
        match self {
            LayoutNode::TabGroup { id, tabs, active_tab_index, .. } if *id == group_id => {
                let Some(tab) = slot.take() else { return false };
                let at = at.min(tabs.len());
                tabs.insert(at, tab);
                *active_tab_index = at;
                true
            }
            LayoutNode::TabGroup { .. } => false,
            LayoutNode::Split { children, .. } => {
                children.iter_mut().any(|c| c.insert_tab_at(group_id, slot, at))
            }
            LayoutNode::StageHost { stages, .. } => {
                stages.iter_mut().any(|s| s.layout.insert_tab_at(group_id, slot, at))
            }
        }
    }

    fn split_at(
        &mut self,
        group_id: NodeId,
        direction: SplitDirection,
        slot: &mut Option<Tab>,
    ) -> bool {
        match self {
            LayoutNode::TabGroup { id, .. } if *id == group_id => {
                let Some(tab) = slot.take() else { return false };
                let existing = std::mem::replace(self, LayoutNode::empty_group());
                let new_group = LayoutNode::group(vec![tab]);
                let children = if direction.inserts_before() {
                    vec![new_group, existing]
                } else {
                    vec![existing, new_group]
                };
                *self = LayoutNode::Split {
                    id: NodeId::new(),
                    axis: direction.axis(),
                    children,
                    proportions: vec![0.5, 0.5],
                };
                true
            }
            LayoutNode::TabGroup { .. } => false,
            LayoutNode::Split { children, .. } => {
                children.iter_mut().any(|c| c.split_at(group_id, direction, slot))
            }
            LayoutNode::StageHost { stages, .. } => {
                stages.iter_mut().any(|s| s.layout.split_at(group_id, direction, slot))
            }
        }
    }

    fn select_tab(&mut self, group_id: NodeId, index: usize) -> bool {
        match self {
            LayoutNode::TabGroup { id, tabs, active_tab_index, .. } if *id == group_id => {
                *active_tab_index = index.min(tabs.len().saturating_sub(1));
                true
            }
            LayoutNode::TabGroup { .. } => false,
            LayoutNode::Split { children, .. } => {
                children.iter_mut().any(|c| c.select_tab(group_id, index))
            }
            LayoutNode::StageHost { stages, .. } => {
                stages.iter_mut().any(|s| s.layout.select_tab(group_id, index))
            }
        }
    }

    fn select_stage(&mut self, host_id: NodeId, index: usize) -> bool {
        match self {
            LayoutNode::StageHost { id, stages, active_stage_index, .. } if *id == host_id => {
                *active_stage_index = index.min(stages.len().saturating_sub(1));
                true
            }
            LayoutNode::StageHost { stages, .. } => {
                stages.iter_mut().any(|s| s.layout.select_stage(host_id, index))
            }
            LayoutNode::Split { children, .. } => {
                children.iter_mut().any(|c| c.select_stage(host_id, index))
            }
            LayoutNode::TabGroup { .. } => false,
        }
    }

    fn resize_at(&mut self, split_id: NodeId, child_index: usize, delta: f64) -> bool {
        match self {
            LayoutNode::Split { id, proportions, .. } if *id == split_id => {
                if proportions.len() < 2 || child_index >= proportions.len() {
                    return true;
                }
                let partner = if child_index + 1 < proportions.len() {
                    child_index + 1
                } else {
                    child_index - 1
                };
                let grow_room = proportions[partner] - MIN_SHARE;
                let shrink_room = proportions[child_index] - MIN_SHARE;
                let delta = delta.clamp(-shrink_room.max(0.0), grow_room.max(0.0));
                proportions[child_index] += delta;
                proportions[partner] -= delta;
                true
            }
            LayoutNode::Split { children, .. } => children
                .iter_mut()
                .any(|c| c.resize_at(split_id, child_index, delta)),
            LayoutNode::StageHost { stages, .. } => stages
                .iter_mut()
                .any(|s| s.layout.resize_at(split_id, child_index, delta)),
            LayoutNode::TabGroup { .. } => false,
        }
    }
}

fn normalized_shares(mut shares: Vec<f64>) -> Vec<f64> {
    let sum: f64 = shares.iter().sum();
    if sum <= f64::EPSILON {
        let n = shares.len().max(1);
        return vec![1.0 / n as f64; shares.len()];
    }
    // Within tolerance the shares are left untouched so normalization stays
    // idempotent under float equality.
    if (sum - 1.0).abs() > PROPORTION_EPSILON {
        for share in &mut shares {
            *share /= sum;
        }
    }
    shares
}
