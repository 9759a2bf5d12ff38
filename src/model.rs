pub mod mutation;
pub mod node;

pub use node::{
    Axis, DisplayMode, LayoutNode, NodeId, Rect, SplitDirection, Stage, StageId, Tab, TabId,
    WindowId, PROPORTION_EPSILON,
};
