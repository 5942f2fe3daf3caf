//! Node creation from element descriptors.

use drawbridge_core::command::{ElementDescriptor, ElementType};
use drawbridge_core::error::{DrawbridgeError, Result};
use drawbridge_scene::color::Rgb;
use drawbridge_scene::host::SceneHost;
use drawbridge_scene::node::{FontName, NodeKind, Paint, TextAlign};
use tracing::{debug, error, warn};

/// Create one scene node from a descriptor and attach it to the page.
///
/// `Ok(None)` means the descriptor was dropped with a warning (unknown type,
/// or an image element without a url). A font that fails to load aborts
/// creation before any node exists; an image that fails to fetch keeps the
/// node without a fill.
pub async fn create_element(
    host: &dyn SceneHost,
    client: &reqwest::Client,
    element: &ElementDescriptor,
) -> Result<Option<String>> {
    let type_tag = element.element_type.as_deref().unwrap_or("");
    let element_type = match type_tag.parse::<ElementType>() {
        Ok(t) => t,
        Err(e) => {
            warn!(%e, "Dropping element");
            return Ok(None);
        }
    };

    let id = match element_type {
        ElementType::Rectangle => create_shape(host, element, NodeKind::Rectangle)?,
        ElementType::Circle | ElementType::Ellipse => {
            create_shape(host, element, NodeKind::Ellipse)?
        }
        ElementType::Frame => create_shape(host, element, NodeKind::Frame)?,
        ElementType::Polygon => create_shape(host, element, NodeKind::Polygon)?,
        ElementType::Star => create_shape(host, element, NodeKind::Star)?,
        ElementType::Line => {
            let id = host.create_node(NodeKind::Line);
            // 0 means "not set" on the wire, so it falls back like absence
            host.resize(
                &id,
                or_nonzero(element.width, 100.0),
                or_nonzero(element.height, 0.1),
            )?;
            let color = Rgb::from_hex(element.color.as_deref().unwrap_or("#000000"));
            host.set_stroke(&id, Paint::solid(color))?;
            id
        }
        ElementType::Text => {
            let font = FontName::new(
                element.font_family.as_deref().unwrap_or("Inter"),
                element.font_style.as_deref().unwrap_or("Regular"),
            );
            // Font first: if it cannot load there is no node to clean up
            host.load_font(&font).await?;
            let id = host.create_node(NodeKind::Text);
            host.set_font_name(&id, font)?;
            host.set_characters(&id, element.text.as_deref().unwrap_or(""))?;
            host.set_font_size(&id, or_nonzero(element.font_size, 16.0))?;
            if let Some(align) = &element.text_align {
                host.set_text_align(&id, TextAlign::from_wire(align))?;
            }
            let color = Rgb::from_hex(element.color.as_deref().unwrap_or("#000000"));
            host.set_fill(&id, Paint::solid(color))?;
            id
        }
        ElementType::Image => {
            let Some(url) = element.url.as_deref() else {
                warn!("Dropping image element without url");
                return Ok(None);
            };
            let id = host.create_node(NodeKind::Rectangle);
            host.resize(
                &id,
                element.width.unwrap_or(0.0),
                element.height.unwrap_or(0.0),
            )?;
            match fetch_image(client, url).await {
                Ok(bytes) => match host.create_image(&bytes) {
                    Ok(hash) => host.set_fill(&id, Paint::image(hash))?,
                    Err(e) => error!(%e, url, "Image decode failed"),
                },
                Err(e) => error!(%e, url, "Image load failed"),
            }
            id
        }
        ElementType::Vector => host.create_node(NodeKind::Vector),
        ElementType::Boolean => host.create_node(NodeKind::BooleanOperation),
        ElementType::Component => host.create_node(NodeKind::Component),
        ElementType::Instance => {
            // Each call makes a fresh throwaway component; there is no
            // component registry to reference
            let component = host.create_node(NodeKind::Component);
            host.create_instance(&component)?
        }
    };

    host.set_x(&id, element.x.unwrap_or(0.0))?;
    host.set_y(&id, element.y.unwrap_or(0.0))?;
    if let Some(name) = &element.name {
        host.set_name(&id, name)?;
    }
    host.append_to_page(&id)?;
    debug!(node = %id, element = type_tag, "Element created");
    Ok(Some(id))
}

fn create_shape(
    host: &dyn SceneHost,
    element: &ElementDescriptor,
    kind: NodeKind,
) -> Result<String> {
    let id = host.create_node(kind);
    host.resize(
        &id,
        element.width.unwrap_or(0.0),
        element.height.unwrap_or(0.0),
    )?;
    let color = Rgb::from_hex(element.color.as_deref().unwrap_or(""));
    host.set_fill(&id, Paint::solid(color))?;
    Ok(id)
}

fn or_nonzero(value: Option<f64>, fallback: f64) -> f64 {
    match value {
        Some(v) if v != 0.0 => v,
        _ => fallback,
    }
}

async fn fetch_image(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| DrawbridgeError::Image(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(DrawbridgeError::Image(format!(
            "fetch {url}: HTTP {}",
            resp.status()
        )));
    }
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| DrawbridgeError::Image(e.to_string()))?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawbridge_scene::document::MemoryDocument;
    use drawbridge_scene::node::TextAlign;

    fn descriptor(json: serde_json::Value) -> ElementDescriptor {
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test]
    async fn test_rectangle_defaults() {
        let doc = MemoryDocument::new();
        let client = reqwest::Client::new();
        let id = create_element(&doc, &client, &descriptor(serde_json::json!({"type": "rectangle"})))
            .await
            .unwrap()
            .expect("node created");

        let node = doc.get(&id).unwrap();
        assert_eq!(node.kind, NodeKind::Rectangle);
        assert_eq!((node.width, node.height), (0.0, 0.0));
        assert_eq!((node.x, node.y), (0.0, 0.0));
        assert_eq!(node.fill, Some(Paint::solid(Rgb::WHITE)));
        assert_eq!(doc.page(), vec![id]);
    }

    #[tokio::test]
    async fn test_circle_becomes_ellipse() {
        let doc = MemoryDocument::new();
        let client = reqwest::Client::new();
        let id = create_element(
            &doc,
            &client,
            &descriptor(serde_json::json!({
                "type": "circle", "width": 80.0, "height": 80.0, "color": "#FF0000",
            })),
        )
        .await
        .unwrap()
        .unwrap();

        let node = doc.get(&id).unwrap();
        assert_eq!(node.kind, NodeKind::Ellipse);
        assert_eq!(node.fill, Some(Paint::solid(Rgb::new(1.0, 0.0, 0.0))));
    }

    #[tokio::test]
    async fn test_line_stroke_and_fallbacks() {
        let doc = MemoryDocument::new();
        let client = reqwest::Client::new();
        let id = create_element(
            &doc,
            &client,
            &descriptor(serde_json::json!({"type": "line", "width": 0.0})),
        )
        .await
        .unwrap()
        .unwrap();

        let node = doc.get(&id).unwrap();
        assert_eq!(node.kind, NodeKind::Line);
        assert_eq!((node.width, node.height), (100.0, 0.1));
        assert_eq!(node.stroke, Some(Paint::solid(Rgb::BLACK)));
        assert!(node.fill.is_none());
    }

    #[tokio::test]
    async fn test_text_element() {
        let doc = MemoryDocument::new();
        let client = reqwest::Client::new();
        let id = create_element(
            &doc,
            &client,
            &descriptor(serde_json::json!({
                "type": "text",
                "text": "Launch",
                "fontSize": 0.0,
                "textAlign": "CENTER",
                "name": "Headline",
                "x": 10.0,
            })),
        )
        .await
        .unwrap()
        .unwrap();

        let node = doc.get(&id).unwrap();
        assert_eq!(node.name, "Headline");
        assert_eq!(node.x, 10.0);
        let text = node.text.unwrap();
        assert_eq!(text.characters, "Launch");
        assert_eq!(text.font_size, 16.0);
        assert_eq!(text.align, TextAlign::Center);
        assert_eq!(node.fill, Some(Paint::solid(Rgb::BLACK)));
        assert!(doc.is_font_loaded(&FontName::default()));
    }

    #[tokio::test]
    async fn test_text_font_failure_creates_nothing() {
        let doc = MemoryDocument::with_fonts([FontName::default()]);
        let client = reqwest::Client::new();
        let err = create_element(
            &doc,
            &client,
            &descriptor(serde_json::json!({"type": "text", "fontFamily": "Missing"})),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DrawbridgeError::FontNotAvailable { .. }));
        assert!(doc.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_type_is_noop() {
        let doc = MemoryDocument::new();
        let client = reqwest::Client::new();
        let created = create_element(&doc, &client, &descriptor(serde_json::json!({"type": "blob"})))
            .await
            .unwrap();
        assert!(created.is_none());
        assert!(doc.is_empty());

        let created = create_element(&doc, &client, &descriptor(serde_json::json!({})))
            .await
            .unwrap();
        assert!(created.is_none());
        assert!(doc.is_empty());
    }

    #[tokio::test]
    async fn test_image_without_url_is_noop() {
        let doc = MemoryDocument::new();
        let client = reqwest::Client::new();
        let created = create_element(&doc, &client, &descriptor(serde_json::json!({"type": "image"})))
            .await
            .unwrap();
        assert!(created.is_none());
        assert!(doc.is_empty());
    }

    #[tokio::test]
    async fn test_image_fetch_failure_keeps_node_unfilled() {
        let doc = MemoryDocument::new();
        let client = reqwest::Client::new();
        // Port 1 refuses connections, so the fetch errors immediately
        let id = create_element(
            &doc,
            &client,
            &descriptor(serde_json::json!({
                "type": "image",
                "url": "http://127.0.0.1:1/logo.png",
                "width": 50.0,
                "height": 50.0,
            })),
        )
        .await
        .unwrap()
        .unwrap();

        let node = doc.get(&id).unwrap();
        assert_eq!((node.width, node.height), (50.0, 50.0));
        assert!(node.fill.is_none());
        assert_eq!(doc.image_count(), 0);
    }

    #[tokio::test]
    async fn test_structural_kinds_keep_document_defaults() {
        let doc = MemoryDocument::new();
        let client = reqwest::Client::new();
        let id = create_element(
            &doc,
            &client,
            &descriptor(serde_json::json!({"type": "component", "width": 300.0})),
        )
        .await
        .unwrap()
        .unwrap();

        let node = doc.get(&id).unwrap();
        assert_eq!(node.kind, NodeKind::Component);
        // Structural nodes take no geometry from the descriptor
        assert_eq!((node.width, node.height), (100.0, 100.0));
    }

    #[tokio::test]
    async fn test_instance_makes_fresh_component_each_call() {
        let doc = MemoryDocument::new();
        let client = reqwest::Client::new();
        let first = create_element(&doc, &client, &descriptor(serde_json::json!({"type": "instance"})))
            .await
            .unwrap()
            .unwrap();
        let second = create_element(&doc, &client, &descriptor(serde_json::json!({"type": "instance"})))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(doc.get(&first).unwrap().kind, NodeKind::Instance);
        assert_eq!(doc.get(&second).unwrap().kind, NodeKind::Instance);
        // Two instances, two throwaway components
        assert_eq!(doc.len(), 4);
        // Only the instances reach the page
        assert_eq!(doc.page(), vec![first, second]);
    }
}
