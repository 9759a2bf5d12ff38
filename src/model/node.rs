use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tolerance for the "proportions sum to one" invariant on splits.
pub const PROPORTION_EPSILON: f64 = 1e-3;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self { $name(Uuid::new_v4()) }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let full = self.0.simple().to_string();
                write!(f, "{}", &full[..8])
            }
        }
    };
}

id_type! {
    /// Identity of a structural node (split, tab group, or stage host).
    /// Stable for the node's whole lifetime; mutations that move a node
    /// keep its id, mutations that recreate one mint a fresh id.
    NodeId
}
id_type! {
    /// Identity of a tab, and of the panel it associates with.
    TabId
}
id_type! { StageId }
id_type! { WindowId }

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const ZERO: Rect = Rect { x: 0.0, y: 0.0, width: 0.0, height: 0.0 };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect { x, y, width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn perpendicular(self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }
}

/// Edge a new pane is pushed toward when splitting an existing group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SplitDirection {
    Left,
    Right,
    Top,
    Bottom,
}

impl SplitDirection {
    pub fn axis(self) -> Axis {
        match self {
            SplitDirection::Left | SplitDirection::Right => Axis::Horizontal,
            SplitDirection::Top | SplitDirection::Bottom => Axis::Vertical,
        }
    }

    /// New content goes toward the edge named by the direction: before the
    /// existing node for left/top, after it for right/bottom.
    pub fn inserts_before(self) -> bool {
        matches!(self, SplitDirection::Left | SplitDirection::Top)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    Tabs,
    Minimal,
    Hidden,
}

/// A tab holds identity and presentation only. The panel it displays is an
/// external collaborator looked up by id; it is never owned or serialized
/// by the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    pub title: String,
    #[serde(default)]
    pub icon_name: Option<String>,
    /// Opaque host payload, carried through persistence and moves untouched.
    #[serde(default)]
    pub cargo: serde_json::Value,
}

impl Tab {
    pub fn new(title: impl Into<String>) -> Tab {
        Tab {
            id: TabId::new(),
            title: title.into(),
            icon_name: None,
            cargo: serde_json::Value::Null,
        }
    }

    pub fn with_cargo(mut self, cargo: serde_json::Value) -> Tab {
        self.cargo = cargo;
        self
    }
}

/// One swipeable workspace inside a stage host. Owns a full layout subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: StageId,
    pub title: String,
    #[serde(default)]
    pub icon_name: Option<String>,
    pub layout: LayoutNode,
}

impl Stage {
    pub fn new(title: impl Into<String>, layout: LayoutNode) -> Stage {
        Stage {
            id: StageId::new(),
            title: title.into(),
            icon_name: None,
            layout,
        }
    }
}

/// The recursive layout tree. A window owns exactly one root node; subtree
/// ownership is exclusive (no sharing, no cycles).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LayoutNode {
    #[serde(rename_all = "camelCase")]
    Split {
        id: NodeId,
        axis: Axis,
        children: Vec<LayoutNode>,
        proportions: Vec<f64>,
    },
    #[serde(rename_all = "camelCase")]
    TabGroup {
        id: NodeId,
        tabs: Vec<Tab>,
        active_tab_index: usize,
        #[serde(default)]
        display_mode: DisplayMode,
    },
    #[serde(rename_all = "camelCase")]
    StageHost {
        id: NodeId,
        stages: Vec<Stage>,
        active_stage_index: usize,
        #[serde(default)]
        display_mode: DisplayMode,
    },
}

impl LayoutNode {
    /// A tab group with no tabs; the transient state cleanup prunes.
    pub fn empty_group() -> LayoutNode {
        LayoutNode::TabGroup {
            id: NodeId::new(),
            tabs: Vec::new(),
            active_tab_index: 0,
            display_mode: DisplayMode::default(),
        }
    }

    pub fn group(tabs: Vec<Tab>) -> LayoutNode {
        LayoutNode::TabGroup {
            id: NodeId::new(),
            tabs,
            active_tab_index: 0,
            display_mode: DisplayMode::default(),
        }
    }

    /// Builder-style selection for freshly constructed groups; clamps.
    pub fn with_active_tab_index(mut self, index: usize) -> LayoutNode {
        if let LayoutNode::TabGroup { tabs, active_tab_index, .. } = &mut self {
            *active_tab_index = index.min(tabs.len().saturating_sub(1));
        }
        self
    }

    pub fn split(axis: Axis, children: Vec<LayoutNode>) -> LayoutNode {
        let n = children.len().max(1);
        LayoutNode::Split {
            id: NodeId::new(),
            axis,
            proportions: vec![1.0 / n as f64; children.len()],
            children,
        }
    }

    pub fn stage_host(stages: Vec<Stage>) -> LayoutNode {
        LayoutNode::StageHost {
            id: NodeId::new(),
            stages,
            active_stage_index: 0,
            display_mode: DisplayMode::default(),
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            LayoutNode::Split { id, .. }
            | LayoutNode::TabGroup { id, .. }
            | LayoutNode::StageHost { id, .. } => *id,
        }
    }

    pub fn is_empty_tab_group(&self) -> bool {
        matches!(self, LayoutNode::TabGroup { tabs, .. } if tabs.is_empty())
    }

    /// Pre-order traversal over every node in the tree, descending into
    /// split children and into each stage's subtree.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes { stack: vec![self] }
    }

    /// All tabs in the tree, in pre-order.
    pub fn tabs(&self) -> impl Iterator<Item = &Tab> + '_ {
        self.nodes().flat_map(|node| {
            let tabs: &[Tab] = match node {
                LayoutNode::TabGroup { tabs, .. } => tabs,
                _ => &[],
            };
            tabs.iter()
        })
    }

    pub fn tab_ids(&self) -> Vec<TabId> {
        self.tabs().map(|t| t.id).collect()
    }

    pub fn contains_tab(&self, tab_id: TabId) -> bool {
        self.tabs().any(|t| t.id == tab_id)
    }

    pub fn find_tab(&self, tab_id: TabId) -> Option<&Tab> {
        self.tabs().find(|t| t.id == tab_id)
    }

    pub fn find_node(&self, node_id: NodeId) -> Option<&LayoutNode> {
        self.nodes().find(|n| n.id() == node_id)
    }

    /// First pre-order tab group with the given id.
    pub fn find_group(&self, group_id: NodeId) -> Option<&LayoutNode> {
        self.nodes()
            .find(|n| n.id() == group_id && matches!(n, LayoutNode::TabGroup { .. }))
    }

    /// The tab group holding the given tab, first pre-order match.
    pub fn group_of_tab(&self, tab_id: TabId) -> Option<NodeId> {
        self.nodes()
            .find(|n| match n {
                LayoutNode::TabGroup { tabs, .. } => tabs.iter().any(|t| t.id == tab_id),
                _ => false,
            })
            .map(|n| n.id())
    }

    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    pub fn tab_count(&self) -> usize {
        self.tabs().count()
    }

    /// Checks the split invariants on this node alone (not recursively):
    /// matched lengths and proportions summing to one.
    pub fn proportions_valid(&self) -> bool {
        match self {
            LayoutNode::Split { children, proportions, .. } => {
                proportions.len() == children.len()
                    && (proportions.iter().sum::<f64>() - 1.0).abs() <= PROPORTION_EPSILON
            }
            _ => true,
        }
    }

    fn describe(&self) -> String {
        match self {
            LayoutNode::Split { id, axis, children, .. } => {
                format!("split {axis} ({id}) [{}]", children.len())
            }
            LayoutNode::TabGroup { id, tabs, active_tab_index, .. } => {
                let titles: Vec<&str> = tabs.iter().map(|t| t.title.as_str()).collect();
                format!("tabs ({id}) {titles:?} active={active_tab_index}")
            }
            LayoutNode::StageHost { id, stages, active_stage_index, .. } => {
                format!("stages ({id}) [{}] active={active_stage_index}", stages.len())
            }
        }
    }

    fn ascii_node(&self) -> ascii_tree::Tree {
        match self {
            LayoutNode::TabGroup { .. } => ascii_tree::Tree::Leaf(vec![self.describe()]),
            LayoutNode::Split { children, .. } => ascii_tree::Tree::Node(
                self.describe(),
                children.iter().map(|c| c.ascii_node()).collect(),
            ),
            LayoutNode::StageHost { stages, .. } => ascii_tree::Tree::Node(
                self.describe(),
                stages.iter().map(|s| s.layout.ascii_node()).collect(),
            ),
        }
    }

    /// Renders the tree structure for logs and failure messages.
    pub fn draw_tree(&self) -> String {
        let mut out = String::new();
        ascii_tree::write_tree(&mut out, &self.ascii_node()).unwrap();
        out
    }
}

pub struct Nodes<'a> {
    stack: Vec<&'a LayoutNode>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a LayoutNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        match node {
            LayoutNode::Split { children, .. } => {
                self.stack.extend(children.iter().rev());
            }
            LayoutNode::StageHost { stages, .. } => {
                self.stack.extend(stages.iter().rev().map(|s| &s.layout));
            }
            LayoutNode::TabGroup { .. } => {}
        }
        Some(node)
    }
}
