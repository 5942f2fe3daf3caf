//! Host-side capability interface for scene mutation.

use async_trait::async_trait;
use serde_json::Value;

use drawbridge_core::error::Result;

use crate::node::{FontName, NodeKind, Paint, TextAlign};

/// The surface the command interpreter drives.
///
/// Implementations own node lifetime; callers address nodes only by the
/// opaque id handed out at creation. Setters that apply to a subset of node
/// kinds return `PropertyNotSupported` on the others instead of silently
/// ignoring the call. Fonts must be loaded before any text mutation that
/// depends on them, matching how real canvas hosts gate text edits.
#[async_trait]
pub trait SceneHost: Send + Sync {
    /// Create a detached node of the given kind with document defaults.
    fn create_node(&self, kind: NodeKind) -> String;

    /// Create an instance of an existing component node.
    fn create_instance(&self, component_id: &str) -> Result<String>;

    fn kind_of(&self, id: &str) -> Result<NodeKind>;

    /// Current font of a text node.
    fn font_of(&self, id: &str) -> Result<FontName>;

    fn resize(&self, id: &str, width: f64, height: f64) -> Result<()>;
    fn set_x(&self, id: &str, x: f64) -> Result<()>;
    fn set_y(&self, id: &str, y: f64) -> Result<()>;
    fn set_name(&self, id: &str, name: &str) -> Result<()>;
    fn set_fill(&self, id: &str, paint: Paint) -> Result<()>;
    fn set_stroke(&self, id: &str, paint: Paint) -> Result<()>;
    fn set_corner_radius(&self, id: &str, radius: f64) -> Result<()>;

    fn set_characters(&self, id: &str, text: &str) -> Result<()>;
    fn set_font_size(&self, id: &str, size: f64) -> Result<()>;
    fn set_font_name(&self, id: &str, font: FontName) -> Result<()>;
    fn set_text_align(&self, id: &str, align: TextAlign) -> Result<()>;

    async fn load_font(&self, font: &FontName) -> Result<()>;

    /// Decode raw bytes into an image, returning its content hash.
    fn create_image(&self, bytes: &[u8]) -> Result<String>;

    /// Attach a created node to the current page.
    fn append_to_page(&self, id: &str) -> Result<()>;

    /// Permanently remove a node.
    fn remove(&self, id: &str) -> Result<()>;

    /// Set a documented property by name. Unknown keys, wrongly-typed values,
    /// and kind mismatches return `PropertyNotSupported`; nothing is silently
    /// dropped.
    fn set_dynamic(&self, id: &str, key: &str, value: &Value) -> Result<()>;
}
