//! Persisted layout snapshots and the other serializable wire shapes.
//!
//! Only identity and presentation are persisted: panel content is never
//! serialized, tabs rehydrate through the host's panel provider on load.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::{LayoutNode, NodeId, Rect, TabId, WindowId};

/// One host window: chrome-level state plus the layout tree it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowLayout {
    pub id: WindowId,
    pub frame: Rect,
    #[serde(default)]
    pub is_full_screen: bool,
    #[serde(rename = "rootNode")]
    pub root: LayoutNode,
}

impl WindowLayout {
    pub fn new(root: LayoutNode, frame: Rect) -> WindowLayout {
        WindowLayout {
            id: WindowId::new(),
            frame,
            is_full_screen: false,
            root,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LayoutSnapshot {
    pub windows: Vec<WindowLayout>,
}

impl LayoutSnapshot {
    pub fn window(&self, id: WindowId) -> Option<&WindowLayout> {
        self.windows.iter().find(|w| w.id == id)
    }

    pub fn load(path: PathBuf) -> anyhow::Result<Self> {
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    }

    pub fn save(&self, path: PathBuf) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        File::create(path)?.write_all(self.serialize_to_string().as_bytes())?;
        Ok(())
    }

    pub fn serialize_to_string(&self) -> String {
        serde_json::to_string_pretty(&self).unwrap()
    }
}

/// Pasteboard payload describing a dragged tab. Enough for a drop target in
/// another process to render the drag image and request the move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragPayload {
    pub tab_id: TabId,
    pub source_group_id: NodeId,
    pub title: String,
    #[serde(default)]
    pub icon_name: Option<String>,
}
