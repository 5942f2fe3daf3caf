//! In-process scene document.
//!
//! `MemoryDocument` is the host used by the CLI plugin runner and the test
//! suites. Created nodes stay detached until appended to the page, matching
//! how a canvas host hands out nodes before they are placed.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use serde_json::Value;
use tracing::debug;

use drawbridge_core::error::{DrawbridgeError, Result};

use crate::host::SceneHost;
use crate::node::{FontName, NodeKind, Paint, SceneNode, TextAlign, TextData};

#[derive(Default)]
struct DocumentInner {
    nodes: HashMap<String, SceneNode>,
    /// Ordered ids of nodes attached to the current page.
    page: Vec<String>,
    /// Image hash -> byte size.
    images: HashMap<String, usize>,
    loaded_fonts: HashSet<FontName>,
    next_id: u64,
}

pub struct MemoryDocument {
    inner: RwLock<DocumentInner>,
    /// When set, only these fonts load successfully.
    fonts: Option<HashSet<FontName>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(DocumentInner::default()),
            fonts: None,
        }
    }

    /// Restrict which fonts can load; `new()` accepts any font.
    pub fn with_fonts(fonts: impl IntoIterator<Item = FontName>) -> Self {
        Self {
            inner: RwLock::new(DocumentInner::default()),
            fonts: Some(fonts.into_iter().collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<SceneNode> {
        self.read().nodes.get(id).cloned()
    }

    /// Ids attached to the page, in append order.
    pub fn page(&self) -> Vec<String> {
        self.read().page.clone()
    }

    pub fn is_font_loaded(&self, font: &FontName) -> bool {
        self.read().loaded_fonts.contains(font)
    }

    pub fn image_count(&self) -> usize {
        self.read().images.len()
    }

    /// Point-in-time copy for logging and assertions.
    pub fn snapshot(&self) -> DocumentSnapshot {
        let inner = self.read();
        let nodes = inner
            .page
            .iter()
            .filter_map(|id| inner.nodes.get(id).cloned())
            .collect();
        let mut detached: Vec<SceneNode> = inner
            .nodes
            .values()
            .filter(|n| !inner.page.iter().any(|p| p == &n.id))
            .cloned()
            .collect();
        detached.sort_by(|a, b| a.id.cmp(&b.id));
        let mut loaded_fonts: Vec<FontName> = inner.loaded_fonts.iter().cloned().collect();
        loaded_fonts.sort_by(|a, b| {
            (a.family.as_str(), a.style.as_str()).cmp(&(b.family.as_str(), b.style.as_str()))
        });
        DocumentSnapshot {
            nodes,
            detached,
            loaded_fonts,
            image_count: inner.images.len(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, DocumentInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, DocumentInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    fn with_node<T>(&self, id: &str, f: impl FnOnce(&mut SceneNode) -> Result<T>) -> Result<T> {
        let mut inner = self.write();
        let node = inner
            .nodes
            .get_mut(id)
            .ok_or_else(|| DrawbridgeError::NodeNotFound(id.to_string()))?;
        f(node)
    }

    /// Text mutation gated on the node's current font being loaded.
    fn mutate_text(&self, id: &str, key: &str, f: impl FnOnce(&mut TextData)) -> Result<()> {
        let mut inner = self.write();
        let font = {
            let node = inner
                .nodes
                .get(id)
                .ok_or_else(|| DrawbridgeError::NodeNotFound(id.to_string()))?;
            let text = node.text.as_ref().ok_or_else(|| not_supported(node.kind, key))?;
            text.font_name.clone()
        };
        if !inner.loaded_fonts.contains(&font) {
            return Err(font_not_loaded(&font));
        }
        if let Some(text) = inner.nodes.get_mut(id).and_then(|n| n.text.as_mut()) {
            f(text);
        }
        Ok(())
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

fn not_supported(kind: NodeKind, key: &str) -> DrawbridgeError {
    DrawbridgeError::PropertyNotSupported {
        kind: kind.label().to_string(),
        key: key.to_string(),
    }
}

fn font_not_loaded(font: &FontName) -> DrawbridgeError {
    DrawbridgeError::Scene(format!("Font {} {} not loaded", font.family, font.style))
}

fn expect_f64(kind: NodeKind, key: &str, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| not_supported(kind, key))
}

fn expect_bool(kind: NodeKind, key: &str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| not_supported(kind, key))
}

fn expect_str<'a>(kind: NodeKind, key: &str, value: &'a Value) -> Result<&'a str> {
    value.as_str().ok_or_else(|| not_supported(kind, key))
}

#[async_trait]
impl SceneHost for MemoryDocument {
    fn create_node(&self, kind: NodeKind) -> String {
        let mut inner = self.write();
        inner.next_id += 1;
        let id = format!("node-{}", inner.next_id);
        inner.nodes.insert(id.clone(), SceneNode::new(id.as_str(), kind));
        debug!(node = %id, kind = ?kind, "Node created");
        id
    }

    fn create_instance(&self, component_id: &str) -> Result<String> {
        let mut inner = self.write();
        let (width, height, fill, stroke) = {
            let component = inner
                .nodes
                .get(component_id)
                .ok_or_else(|| DrawbridgeError::NodeNotFound(component_id.to_string()))?;
            if component.kind != NodeKind::Component {
                return Err(DrawbridgeError::Scene(format!(
                    "{component_id} is not a component"
                )));
            }
            (
                component.width,
                component.height,
                component.fill.clone(),
                component.stroke.clone(),
            )
        };
        inner.next_id += 1;
        let id = format!("node-{}", inner.next_id);
        let mut node = SceneNode::new(id.as_str(), NodeKind::Instance);
        node.width = width;
        node.height = height;
        node.fill = fill;
        node.stroke = stroke;
        inner.nodes.insert(id.clone(), node);
        debug!(instance = %id, component = %component_id, "Instance created");
        Ok(id)
    }

    fn kind_of(&self, id: &str) -> Result<NodeKind> {
        self.get(id)
            .map(|n| n.kind)
            .ok_or_else(|| DrawbridgeError::NodeNotFound(id.to_string()))
    }

    fn font_of(&self, id: &str) -> Result<FontName> {
        let inner = self.read();
        let node = inner
            .nodes
            .get(id)
            .ok_or_else(|| DrawbridgeError::NodeNotFound(id.to_string()))?;
        match &node.text {
            Some(text) => Ok(text.font_name.clone()),
            None => Err(not_supported(node.kind, "fontName")),
        }
    }

    fn resize(&self, id: &str, width: f64, height: f64) -> Result<()> {
        self.with_node(id, |n| {
            n.width = width;
            n.height = height;
            Ok(())
        })
    }

    fn set_x(&self, id: &str, x: f64) -> Result<()> {
        self.with_node(id, |n| {
            n.x = x;
            Ok(())
        })
    }

    fn set_y(&self, id: &str, y: f64) -> Result<()> {
        self.with_node(id, |n| {
            n.y = y;
            Ok(())
        })
    }

    fn set_name(&self, id: &str, name: &str) -> Result<()> {
        self.with_node(id, |n| {
            n.name = name.to_string();
            Ok(())
        })
    }

    fn set_fill(&self, id: &str, paint: Paint) -> Result<()> {
        self.with_node(id, |n| {
            n.fill = Some(paint);
            Ok(())
        })
    }

    fn set_stroke(&self, id: &str, paint: Paint) -> Result<()> {
        self.with_node(id, |n| {
            n.stroke = Some(paint);
            Ok(())
        })
    }

    fn set_corner_radius(&self, id: &str, radius: f64) -> Result<()> {
        self.with_node(id, |n| {
            if !n.kind.supports_corner_radius() {
                return Err(not_supported(n.kind, "cornerRadius"));
            }
            n.corner_radius = Some(radius);
            Ok(())
        })
    }

    fn set_characters(&self, id: &str, text: &str) -> Result<()> {
        self.mutate_text(id, "characters", |t| t.characters = text.to_string())
    }

    fn set_font_size(&self, id: &str, size: f64) -> Result<()> {
        self.mutate_text(id, "fontSize", |t| t.font_size = size)
    }

    fn set_font_name(&self, id: &str, font: FontName) -> Result<()> {
        let mut inner = self.write();
        {
            let node = inner
                .nodes
                .get(id)
                .ok_or_else(|| DrawbridgeError::NodeNotFound(id.to_string()))?;
            if node.text.is_none() {
                return Err(not_supported(node.kind, "fontName"));
            }
        }
        if !inner.loaded_fonts.contains(&font) {
            return Err(font_not_loaded(&font));
        }
        if let Some(text) = inner.nodes.get_mut(id).and_then(|n| n.text.as_mut()) {
            text.font_name = font;
        }
        Ok(())
    }

    fn set_text_align(&self, id: &str, align: TextAlign) -> Result<()> {
        self.with_node(id, |n| match &mut n.text {
            Some(text) => {
                text.align = align;
                Ok(())
            }
            None => Err(not_supported(n.kind, "textAlign")),
        })
    }

    async fn load_font(&self, font: &FontName) -> Result<()> {
        if let Some(available) = &self.fonts {
            if !available.contains(font) {
                return Err(DrawbridgeError::FontNotAvailable {
                    family: font.family.clone(),
                    style: font.style.clone(),
                });
            }
        }
        self.write().loaded_fonts.insert(font.clone());
        Ok(())
    }

    fn create_image(&self, bytes: &[u8]) -> Result<String> {
        if bytes.is_empty() {
            return Err(DrawbridgeError::Image("empty image data".to_string()));
        }
        let hash = format!("{:x}", Sha256::digest(bytes));
        self.write().images.insert(hash.clone(), bytes.len());
        Ok(hash)
    }

    fn append_to_page(&self, id: &str) -> Result<()> {
        let mut inner = self.write();
        if !inner.nodes.contains_key(id) {
            return Err(DrawbridgeError::NodeNotFound(id.to_string()));
        }
        if !inner.page.iter().any(|p| p == id) {
            inner.page.push(id.to_string());
        }
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<()> {
        let mut inner = self.write();
        inner
            .nodes
            .remove(id)
            .ok_or_else(|| DrawbridgeError::NodeNotFound(id.to_string()))?;
        inner.page.retain(|p| p != id);
        debug!(node = %id, "Node removed");
        Ok(())
    }

    fn set_dynamic(&self, id: &str, key: &str, value: &Value) -> Result<()> {
        let node = self
            .get(id)
            .ok_or_else(|| DrawbridgeError::NodeNotFound(id.to_string()))?;
        let kind = node.kind;
        match key {
            "x" => self.set_x(id, expect_f64(kind, key, value)?),
            "y" => self.set_y(id, expect_f64(kind, key, value)?),
            "width" => self.resize(id, expect_f64(kind, key, value)?, node.height),
            "height" => self.resize(id, node.width, expect_f64(kind, key, value)?),
            "name" => self.set_name(id, expect_str(kind, key, value)?),
            "opacity" => {
                let v = expect_f64(kind, key, value)?;
                self.with_node(id, |n| {
                    n.opacity = v;
                    Ok(())
                })
            }
            "rotation" => {
                let v = expect_f64(kind, key, value)?;
                self.with_node(id, |n| {
                    n.rotation = v;
                    Ok(())
                })
            }
            "visible" => {
                let v = expect_bool(kind, key, value)?;
                self.with_node(id, |n| {
                    n.visible = v;
                    Ok(())
                })
            }
            "locked" => {
                let v = expect_bool(kind, key, value)?;
                self.with_node(id, |n| {
                    n.locked = v;
                    Ok(())
                })
            }
            "cornerRadius" => self.set_corner_radius(id, expect_f64(kind, key, value)?),
            "characters" => self.set_characters(id, expect_str(kind, key, value)?),
            "fontSize" => self.set_font_size(id, expect_f64(kind, key, value)?),
            "textAlign" => self.set_text_align(id, TextAlign::from_wire(expect_str(kind, key, value)?)),
            _ => Err(not_supported(kind, key)),
        }
    }
}

/// Serializable copy of the document for logs and tests.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSnapshot {
    /// Page nodes in append order.
    pub nodes: Vec<SceneNode>,
    /// Nodes never appended to the page (e.g. throwaway components).
    pub detached: Vec<SceneNode>,
    pub loaded_fonts: Vec<FontName>,
    pub image_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use serde_json::json;

    #[test]
    fn test_create_and_append() {
        let doc = MemoryDocument::new();
        let id = doc.create_node(NodeKind::Rectangle);
        assert!(doc.page().is_empty());
        doc.append_to_page(&id).unwrap();
        assert_eq!(doc.page(), vec![id.clone()]);

        let node = doc.get(&id).unwrap();
        assert_eq!(node.name, "Rectangle");
        assert_eq!((node.width, node.height), (100.0, 100.0));
        assert!(node.fill.is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let doc = MemoryDocument::new();
        let a = doc.create_node(NodeKind::Frame);
        let b = doc.create_node(NodeKind::Frame);
        assert_ne!(a, b);
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_resize_and_position() {
        let doc = MemoryDocument::new();
        let id = doc.create_node(NodeKind::Ellipse);
        doc.resize(&id, 300.0, 150.0).unwrap();
        doc.set_x(&id, 40.0).unwrap();
        doc.set_y(&id, -10.0).unwrap();
        let node = doc.get(&id).unwrap();
        assert_eq!((node.width, node.height), (300.0, 150.0));
        assert_eq!((node.x, node.y), (40.0, -10.0));
    }

    #[test]
    fn test_fill_and_stroke() {
        let doc = MemoryDocument::new();
        let id = doc.create_node(NodeKind::Line);
        doc.set_stroke(&id, Paint::solid(Rgb::BLACK)).unwrap();
        let node = doc.get(&id).unwrap();
        assert_eq!(node.stroke, Some(Paint::solid(Rgb::BLACK)));
        assert!(node.fill.is_none());
    }

    #[test]
    fn test_corner_radius_guard() {
        let doc = MemoryDocument::new();
        let rect = doc.create_node(NodeKind::Rectangle);
        doc.set_corner_radius(&rect, 8.0).unwrap();
        assert_eq!(doc.get(&rect).unwrap().corner_radius, Some(8.0));

        let ellipse = doc.create_node(NodeKind::Ellipse);
        let err = doc.set_corner_radius(&ellipse, 8.0).unwrap_err();
        assert!(matches!(
            err,
            DrawbridgeError::PropertyNotSupported { ref key, .. } if key == "cornerRadius"
        ));
    }

    #[tokio::test]
    async fn test_text_mutation_requires_loaded_font() {
        let doc = MemoryDocument::new();
        let id = doc.create_node(NodeKind::Text);

        let err = doc.set_characters(&id, "hello").unwrap_err();
        assert!(matches!(err, DrawbridgeError::Scene(_)));

        doc.load_font(&FontName::default()).await.unwrap();
        doc.set_characters(&id, "hello").unwrap();
        doc.set_font_size(&id, 24.0).unwrap();

        let text = doc.get(&id).unwrap().text.unwrap();
        assert_eq!(text.characters, "hello");
        assert_eq!(text.font_size, 24.0);
    }

    #[test]
    fn test_text_setters_guard_kind() {
        let doc = MemoryDocument::new();
        let id = doc.create_node(NodeKind::Rectangle);
        let err = doc.set_characters(&id, "nope").unwrap_err();
        assert!(matches!(
            err,
            DrawbridgeError::PropertyNotSupported { ref key, .. } if key == "characters"
        ));
        assert!(doc.get(&id).unwrap().text.is_none());
    }

    #[tokio::test]
    async fn test_font_registry_restricts_loads() {
        let doc = MemoryDocument::with_fonts([FontName::new("Inter", "Regular")]);
        doc.load_font(&FontName::new("Inter", "Regular")).await.unwrap();
        let err = doc
            .load_font(&FontName::new("Comic Sans", "Regular"))
            .await
            .unwrap_err();
        assert!(matches!(err, DrawbridgeError::FontNotAvailable { .. }));
        assert!(doc.is_font_loaded(&FontName::new("Inter", "Regular")));
    }

    #[tokio::test]
    async fn test_font_name_requires_target_font_loaded() {
        let doc = MemoryDocument::new();
        let id = doc.create_node(NodeKind::Text);
        let roboto = FontName::new("Roboto", "Bold");

        let err = doc.set_font_name(&id, roboto.clone()).unwrap_err();
        assert!(matches!(err, DrawbridgeError::Scene(_)));

        doc.load_font(&roboto).await.unwrap();
        doc.set_font_name(&id, roboto.clone()).unwrap();
        assert_eq!(doc.font_of(&id).unwrap(), roboto);
    }

    #[test]
    fn test_create_image_hashes_content() {
        let doc = MemoryDocument::new();
        let a = doc.create_image(b"png-bytes").unwrap();
        let b = doc.create_image(b"png-bytes").unwrap();
        assert_eq!(a, b);
        assert_eq!(doc.image_count(), 1);

        let err = doc.create_image(b"").unwrap_err();
        assert!(matches!(err, DrawbridgeError::Image(_)));
    }

    #[test]
    fn test_instance_copies_component_shape() {
        let doc = MemoryDocument::new();
        let component = doc.create_node(NodeKind::Component);
        doc.resize(&component, 50.0, 60.0).unwrap();
        doc.set_fill(&component, Paint::solid(Rgb::new(0.0, 0.0, 1.0)))
            .unwrap();

        let instance = doc.create_instance(&component).unwrap();
        let node = doc.get(&instance).unwrap();
        assert_eq!(node.kind, NodeKind::Instance);
        assert_eq!((node.width, node.height), (50.0, 60.0));
        assert_eq!(node.fill, Some(Paint::solid(Rgb::new(0.0, 0.0, 1.0))));
    }

    #[test]
    fn test_instance_requires_component() {
        let doc = MemoryDocument::new();
        let rect = doc.create_node(NodeKind::Rectangle);
        assert!(matches!(
            doc.create_instance(&rect).unwrap_err(),
            DrawbridgeError::Scene(_)
        ));
        assert!(matches!(
            doc.create_instance("node-999").unwrap_err(),
            DrawbridgeError::NodeNotFound(_)
        ));
    }

    #[test]
    fn test_remove() {
        let doc = MemoryDocument::new();
        let id = doc.create_node(NodeKind::Star);
        doc.append_to_page(&id).unwrap();
        doc.remove(&id).unwrap();
        assert!(doc.get(&id).is_none());
        assert!(doc.page().is_empty());
        assert!(matches!(
            doc.remove(&id).unwrap_err(),
            DrawbridgeError::NodeNotFound(_)
        ));
    }

    #[test]
    fn test_set_dynamic_documented_keys() {
        let doc = MemoryDocument::new();
        let id = doc.create_node(NodeKind::Rectangle);
        doc.set_dynamic(&id, "opacity", &json!(0.5)).unwrap();
        doc.set_dynamic(&id, "visible", &json!(false)).unwrap();
        doc.set_dynamic(&id, "width", &json!(320.0)).unwrap();
        doc.set_dynamic(&id, "name", &json!("Hero")).unwrap();

        let node = doc.get(&id).unwrap();
        assert_eq!(node.opacity, 0.5);
        assert!(!node.visible);
        assert_eq!((node.width, node.height), (320.0, 100.0));
        assert_eq!(node.name, "Hero");
    }

    #[test]
    fn test_set_dynamic_rejects_unknown_key() {
        let doc = MemoryDocument::new();
        let id = doc.create_node(NodeKind::Rectangle);
        let err = doc.set_dynamic(&id, "blur", &json!(4.0)).unwrap_err();
        assert!(matches!(
            err,
            DrawbridgeError::PropertyNotSupported { ref key, .. } if key == "blur"
        ));
    }

    #[test]
    fn test_set_dynamic_rejects_wrong_type() {
        let doc = MemoryDocument::new();
        let id = doc.create_node(NodeKind::Rectangle);
        let err = doc.set_dynamic(&id, "opacity", &json!("high")).unwrap_err();
        assert!(matches!(err, DrawbridgeError::PropertyNotSupported { .. }));
        assert_eq!(doc.get(&id).unwrap().opacity, 1.0);
    }

    #[test]
    fn test_set_dynamic_missing_node() {
        let doc = MemoryDocument::new();
        let err = doc.set_dynamic("node-404", "x", &json!(1.0)).unwrap_err();
        assert!(matches!(err, DrawbridgeError::NodeNotFound(_)));
    }

    #[test]
    fn test_snapshot_separates_detached() {
        let doc = MemoryDocument::new();
        let shown = doc.create_node(NodeKind::Rectangle);
        doc.append_to_page(&shown).unwrap();
        let hidden = doc.create_node(NodeKind::Component);

        let snapshot = doc.snapshot();
        assert_eq!(snapshot.nodes.len(), 1);
        assert_eq!(snapshot.nodes[0].id, shown);
        assert_eq!(snapshot.detached.len(), 1);
        assert_eq!(snapshot.detached[0].id, hidden);
    }
}
