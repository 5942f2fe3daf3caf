//! Scene node model.

use serde::{Deserialize, Serialize};

use crate::color::Rgb;

/// Node kinds the document can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Rectangle,
    Ellipse,
    Frame,
    Line,
    Polygon,
    Star,
    Text,
    Vector,
    BooleanOperation,
    Component,
    Instance,
}

impl NodeKind {
    /// Display label, also used as the default node name.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Rectangle => "Rectangle",
            NodeKind::Ellipse => "Ellipse",
            NodeKind::Frame => "Frame",
            NodeKind::Line => "Line",
            NodeKind::Polygon => "Polygon",
            NodeKind::Star => "Star",
            NodeKind::Text => "Text",
            NodeKind::Vector => "Vector",
            NodeKind::BooleanOperation => "Boolean Operation",
            NodeKind::Component => "Component",
            NodeKind::Instance => "Instance",
        }
    }

    pub fn supports_corner_radius(&self) -> bool {
        matches!(
            self,
            NodeKind::Rectangle
                | NodeKind::Frame
                | NodeKind::Polygon
                | NodeKind::Star
                | NodeKind::Component
                | NodeKind::Instance
        )
    }

    pub fn is_text(&self) -> bool {
        matches!(self, NodeKind::Text)
    }
}

/// Paint applied to a node's fill or stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Paint {
    Solid { color: Rgb },
    Image { hash: String, scale_mode: ScaleMode },
}

impl Paint {
    pub fn solid(color: Rgb) -> Paint {
        Paint::Solid { color }
    }

    pub fn image(hash: impl Into<String>) -> Paint {
        Paint::Image {
            hash: hash.into(),
            scale_mode: ScaleMode::Fill,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    Fill,
    Fit,
    Crop,
    Tile,
}

/// Font reference, e.g. "Inter" / "Regular".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontName {
    pub family: String,
    pub style: String,
}

impl FontName {
    pub fn new(family: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            style: style.into(),
        }
    }
}

impl Default for FontName {
    fn default() -> Self {
        Self::new("Inter", "Regular")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// Wire mapping is exact-case: `CENTER` and `RIGHT` are recognized,
    /// anything else means left.
    pub fn from_wire(s: &str) -> TextAlign {
        match s {
            "CENTER" => TextAlign::Center,
            "RIGHT" => TextAlign::Right,
            _ => TextAlign::Left,
        }
    }
}

/// Text-specific data, present only on text nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub characters: String,
    pub font_size: f64,
    pub font_name: FontName,
    pub align: TextAlign,
}

impl Default for TextData {
    fn default() -> Self {
        Self {
            characters: String::new(),
            font_size: 12.0,
            font_name: FontName::default(),
            align: TextAlign::Left,
        }
    }
}

/// One node in the document. Fields cover the host properties the bridge can
/// address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub id: String,
    pub kind: NodeKind,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Paint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Paint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
    pub opacity: f64,
    pub visible: bool,
    pub rotation: f64,
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextData>,
}

impl SceneNode {
    /// New node with document defaults: 100×100 at the origin, unstyled.
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            name: kind.label().to_string(),
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            fill: None,
            stroke: None,
            corner_radius: None,
            opacity: 1.0,
            visible: true,
            rotation: 0.0,
            locked: false,
            text: kind.is_text().then(TextData::default),
        }
    }
}
