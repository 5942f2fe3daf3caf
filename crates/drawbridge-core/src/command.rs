//! Wire vocabulary for bridge commands.
//!
//! Commands travel as loose JSON from the gateway queue to the plugin. Typing
//! happens in two stages: the dispatch loop routes on the `action` tag via
//! [`Command::from_value`], and create payloads deserialize into
//! [`ElementDescriptor`]. Field names follow the planner wire format
//! (camelCase).

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DrawbridgeError, Result};

/// Closed set of element types the node factory can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Rectangle,
    Circle,
    Ellipse,
    Frame,
    Line,
    Polygon,
    Star,
    Text,
    Image,
    Vector,
    Boolean,
    Component,
    Instance,
}

impl FromStr for ElementType {
    type Err = DrawbridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rectangle" => Ok(Self::Rectangle),
            "circle" => Ok(Self::Circle),
            "ellipse" => Ok(Self::Ellipse),
            "frame" => Ok(Self::Frame),
            "line" => Ok(Self::Line),
            "polygon" => Ok(Self::Polygon),
            "star" => Ok(Self::Star),
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "vector" => Ok(Self::Vector),
            "boolean" => Ok(Self::Boolean),
            "component" => Ok(Self::Component),
            "instance" => Ok(Self::Instance),
            _ => Err(DrawbridgeError::UnknownElementType(s.to_string())),
        }
    }
}

/// One node to create. Geometry defaults (0 for position and size, with the
/// line-specific fallbacks) are applied by the factory, not here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDescriptor {
    /// Raw type tag. Unknown values are reported by the factory as a no-op
    /// warning, so this stays a string rather than an [`ElementType`].
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Hex color string, e.g. `#FF8800`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// `LEFT`, `CENTER`, or `RIGHT` (exact-case, anything else means left).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
    /// Source URL for image elements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Action tag routing a command to the factory or the mutator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandAction {
    Create,
    Update,
    Move,
    Delete,
}

impl FromStr for CommandAction {
    type Err = DrawbridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "move" => Ok(Self::Move),
            "delete" => Ok(Self::Delete),
            _ => Err(DrawbridgeError::UnknownAction(s.to_string())),
        }
    }
}

/// A fully-routed bridge command.
#[derive(Debug, Clone)]
pub enum Command {
    Create(ElementDescriptor),
    Update { id: String, props: Map<String, Value> },
    Move { id: String, x: Option<f64>, y: Option<f64> },
    Delete { id: String },
}

impl Command {
    /// Route a raw command value on its `action` tag.
    ///
    /// A missing or null `action` is an implicit create. Unknown actions and
    /// mutations without an `id` are hard errors; the dispatch loop reports
    /// them per command without aborting the batch. A missing `props` on
    /// update is the empty mapping.
    pub fn from_value(value: &Value) -> Result<Command> {
        let obj = value.as_object().ok_or_else(|| {
            DrawbridgeError::InvalidCommand(format!("expected object, got {value}"))
        })?;

        let action = match obj.get("action") {
            None | Some(Value::Null) => CommandAction::Create,
            Some(Value::String(s)) => s.parse()?,
            Some(other) => return Err(DrawbridgeError::UnknownAction(other.to_string())),
        };

        match action {
            CommandAction::Create => {
                let descriptor: ElementDescriptor = serde_json::from_value(value.clone())?;
                Ok(Command::Create(descriptor))
            }
            CommandAction::Update => Ok(Command::Update {
                id: require_id(obj)?,
                props: obj
                    .get("props")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
            }),
            CommandAction::Move => Ok(Command::Move {
                id: require_id(obj)?,
                x: obj.get("x").and_then(Value::as_f64),
                y: obj.get("y").and_then(Value::as_f64),
            }),
            CommandAction::Delete => Ok(Command::Delete {
                id: require_id(obj)?,
            }),
        }
    }
}

fn require_id(obj: &Map<String, Value>) -> Result<String> {
    obj.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DrawbridgeError::InvalidCommand("missing node id".to_string()))
}
