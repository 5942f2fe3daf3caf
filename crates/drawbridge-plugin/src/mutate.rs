//! Property updates, moves, and deletes against existing nodes.

use drawbridge_core::error::{DrawbridgeError, Result};
use drawbridge_scene::color::Rgb;
use drawbridge_scene::host::SceneHost;
use drawbridge_scene::node::{NodeKind, Paint};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Apply a property map to a node. Each property is applied independently;
/// one that fails is skipped with a debug log rather than aborting the rest.
/// A missing target node is a warning, not an error.
pub async fn update_node(host: &dyn SceneHost, id: &str, props: &Map<String, Value>) -> Result<()> {
    let kind = match host.kind_of(id) {
        Ok(kind) => kind,
        Err(_) => {
            warn!(node = id, "Update target not found");
            return Ok(());
        }
    };

    for (key, value) in props {
        if let Err(e) = apply_prop(host, id, kind, key, value).await {
            debug!(node = id, key, %e, "Property skipped");
        }
    }
    Ok(())
}

async fn apply_prop(
    host: &dyn SceneHost,
    id: &str,
    kind: NodeKind,
    key: &str,
    value: &Value,
) -> Result<()> {
    match key {
        "color" | "background" => {
            let hex = value.as_str().ok_or_else(|| unsupported(kind, key))?;
            host.set_fill(id, Paint::solid(Rgb::from_hex(hex)))
        }
        "stroke" => {
            let hex = value.as_str().ok_or_else(|| unsupported(kind, key))?;
            host.set_stroke(id, Paint::solid(Rgb::from_hex(hex)))
        }
        "text" => {
            if !kind.is_text() {
                return Err(unsupported(kind, key));
            }
            let text = value.as_str().ok_or_else(|| unsupported(kind, key))?;
            // Reload the node's current font before touching content
            let font = host.font_of(id)?;
            host.load_font(&font).await?;
            host.set_characters(id, text)
        }
        "fontSize" => {
            if !kind.is_text() {
                return Err(unsupported(kind, key));
            }
            let size = value.as_f64().ok_or_else(|| unsupported(kind, key))?;
            let font = host.font_of(id)?;
            host.load_font(&font).await?;
            host.set_font_size(id, size)
        }
        "cornerRadius" => {
            let radius = value.as_f64().ok_or_else(|| unsupported(kind, key))?;
            host.set_corner_radius(id, radius)
        }
        _ => host.set_dynamic(id, key, value),
    }
}

fn unsupported(kind: NodeKind, key: &str) -> DrawbridgeError {
    DrawbridgeError::PropertyNotSupported {
        kind: kind.label().to_string(),
        key: key.to_string(),
    }
}

/// Reposition a node. Either axis may be absent, leaving that axis alone.
pub fn move_node(host: &dyn SceneHost, id: &str, x: Option<f64>, y: Option<f64>) -> Result<()> {
    if host.kind_of(id).is_err() {
        warn!(node = id, "Move target not found");
        return Ok(());
    }
    if let Some(x) = x {
        host.set_x(id, x)?;
    }
    if let Some(y) = y {
        host.set_y(id, y)?;
    }
    Ok(())
}

/// Remove a node from the scene. A missing target is a warning, not an error.
pub fn delete_node(host: &dyn SceneHost, id: &str) -> Result<()> {
    match host.remove(id) {
        Ok(()) => {
            debug!(node = id, "Node deleted");
            Ok(())
        }
        Err(DrawbridgeError::NodeNotFound(_)) => {
            warn!(node = id, "Delete target not found");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawbridge_scene::document::MemoryDocument;
    use drawbridge_scene::node::FontName;

    fn props(json: Value) -> Map<String, Value> {
        json.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_update_color() {
        let doc = MemoryDocument::new();
        let id = doc.create_node(NodeKind::Rectangle);
        update_node(&doc, &id, &props(serde_json::json!({"color": "#00FF00"})))
            .await
            .unwrap();
        let fill = doc.get(&id).unwrap().fill.unwrap();
        assert_eq!(fill, Paint::solid(Rgb::new(0.0, 1.0, 0.0)));
    }

    #[tokio::test]
    async fn test_text_on_non_text_is_skipped() {
        let doc = MemoryDocument::new();
        let id = doc.create_node(NodeKind::Rectangle);
        update_node(&doc, &id, &props(serde_json::json!({"text": "nope"})))
            .await
            .unwrap();
        assert!(doc.get(&id).unwrap().text.is_none());
    }

    #[tokio::test]
    async fn test_text_update_loads_current_font() {
        let doc = MemoryDocument::new();
        let id = doc.create_node(NodeKind::Text);
        update_node(&doc, &id, &props(serde_json::json!({"text": "Revised"})))
            .await
            .unwrap();
        let text = doc.get(&id).unwrap().text.unwrap();
        assert_eq!(text.characters, "Revised");
        assert!(doc.is_font_loaded(&FontName::default()));
    }

    #[tokio::test]
    async fn test_unloadable_font_skips_text_update() {
        let doc = MemoryDocument::with_fonts([FontName::new("Other", "Bold")]);
        let id = doc.create_node(NodeKind::Text);
        update_node(
            &doc,
            &id,
            &props(serde_json::json!({"text": "hi", "fontSize": 30.0})),
        )
        .await
        .unwrap();
        let text = doc.get(&id).unwrap().text.unwrap();
        assert_eq!(text.characters, "");
        assert_eq!(text.font_size, 12.0);
    }

    #[tokio::test]
    async fn test_mixed_props_apply_partially() {
        let doc = MemoryDocument::new();
        let id = doc.create_node(NodeKind::Frame);
        update_node(
            &doc,
            &id,
            &props(serde_json::json!({
                "opacity": 0.5,
                "blur": 10.0,
                "name": "Hero",
            })),
        )
        .await
        .unwrap();
        let node = doc.get(&id).unwrap();
        assert_eq!(node.opacity, 0.5);
        assert_eq!(node.name, "Hero");
    }

    #[tokio::test]
    async fn test_corner_radius_on_ellipse_is_skipped() {
        let doc = MemoryDocument::new();
        let id = doc.create_node(NodeKind::Ellipse);
        update_node(&doc, &id, &props(serde_json::json!({"cornerRadius": 8.0})))
            .await
            .unwrap();
        assert!(doc.get(&id).unwrap().corner_radius.is_none());
    }

    #[tokio::test]
    async fn test_update_missing_node_is_noop() {
        let doc = MemoryDocument::new();
        update_node(&doc, "node-99", &props(serde_json::json!({"color": "#000000"})))
            .await
            .unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_move_single_axis() {
        let doc = MemoryDocument::new();
        let id = doc.create_node(NodeKind::Star);
        doc.set_y(&id, 40.0).unwrap();
        move_node(&doc, &id, Some(25.0), None).unwrap();
        let node = doc.get(&id).unwrap();
        assert_eq!((node.x, node.y), (25.0, 40.0));
    }

    #[test]
    fn test_move_missing_node_is_noop() {
        let doc = MemoryDocument::new();
        move_node(&doc, "node-99", Some(1.0), Some(2.0)).unwrap();
    }

    #[test]
    fn test_delete_and_delete_again() {
        let doc = MemoryDocument::new();
        let id = doc.create_node(NodeKind::Vector);
        doc.append_to_page(&id).unwrap();
        delete_node(&doc, &id).unwrap();
        assert!(doc.is_empty());
        assert!(doc.page().is_empty());
        delete_node(&doc, &id).unwrap();
    }
}
