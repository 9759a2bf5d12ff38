//! stagedock — a layout core for dockable panel interfaces.
//!
//! Hosts arrange panels into nestable splits, tab groups, and swipeable
//! stages, persist the arrangement, and drive it with drag payloads and
//! trackpad gestures. This crate owns the layout tree, its mutation and
//! normalization algorithms, the diff/reconciliation contract, and the
//! gesture navigation engine; rendering and OS integration stay with the
//! host.

pub mod common;
pub mod dock;
pub mod error;
pub mod model;
pub mod navigation;
pub mod persist;
pub mod reconcile;

pub use common::config::{Config, GestureSettings, Settings};
pub use dock::{DockController, DockEvent, Panel, PanelProvider};
pub use error::DockError;
pub use model::{
    Axis, DisplayMode, LayoutNode, NodeId, Rect, SplitDirection, Stage, StageId, Tab, TabId,
    WindowId,
};
pub use navigation::{GestureCoordinator, NavEvent, ScrollEvent, ScrollPhase};
pub use persist::{DragPayload, LayoutSnapshot, WindowLayout};
pub use reconcile::{compute_commands, diff, LayoutDiff, ReconcileCommands};
