//! Prompt planners: turn a text prompt into a list of command payloads.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use drawbridge_core::config::Config;

const GROQ_BASE_URL: &str = "https://api.groq.com/openai";

/// Instruction template sent to the LLM planner. `{prompt}` is replaced with
/// the user prompt. Overridable via `planner.prompt_path` in config.
const DEFAULT_INSTRUCTIONS: &str = r#"Convert the following prompt into a JSON array of design elements.

Design principles:
- Create a top-level "Page" frame (width 1440, height to fit the content).
- Lay sections out in vertical flow: Header, Hero, content sections, Footer.
- Use a single background color (#F9FAFB) for the Page frame; section
  backgrounds stay transparent or subtle (#FFFFFF, #F3F4F6).
- Follow an 8px spacing system with at least 80px vertical padding per
  section and a centered content width of 1200px.
- Typography: H1 48px bold, H2 32px semi-bold, body 16px regular, buttons
  18px bold. Use the Inter family everywhere.
- Buttons are rectangles with centered text, cornerRadius 8 and the primary
  color #2563EB. Cards are rounded rectangles holding text and an image.

JSON requirements, per element:
- type: one of ["frame","rectangle","circle","text","image","line","ellipse","polygon","star","vector","boolean","component","instance"]
- x, y (absolute position) and width, height
- color (hex; optional for text and images)
- text, fontSize, fontFamily, textAlign (only for type="text")
- optional: name, cornerRadius, stroke, opacity, url (for images)

Respond only with valid JSON. Do not include explanations or code blocks.

Prompt: {prompt}
"#;

/// Turns a prompt into an ordered list of command payloads.
#[async_trait]
pub trait Planner: Send + Sync {
    fn id(&self) -> &str;
    async fn plan(&self, prompt: &str) -> anyhow::Result<Vec<Value>>;
}

/// The command queued when planning fails, so the failure renders on the
/// canvas instead of disappearing into a log.
pub fn fallback_commands(err: &anyhow::Error) -> Vec<Value> {
    vec![json!({
        "type": "text",
        "x": 100,
        "y": 100,
        "text": format!("Error: {err}"),
        "fontSize": 24,
        "color": "#FF0000",
    })]
}

/// Pick the planner named by `planner.provider`. Anything other than
/// `"rules"` is treated as an OpenAI-compatible provider and needs a
/// resolvable API key; without one the gateway falls back to rules.
pub fn planner_from_config(config: &Config) -> anyhow::Result<Box<dyn Planner>> {
    let Some(planner_cfg) = config.planner.as_ref() else {
        return Ok(Box::new(RulePlanner));
    };
    if planner_cfg.provider == "rules" {
        return Ok(Box::new(RulePlanner));
    }
    let Some(api_key) = planner_cfg.resolve_api_key() else {
        warn!(
            provider = %planner_cfg.provider,
            "No API key resolved, falling back to the rule planner"
        );
        return Ok(Box::new(RulePlanner));
    };
    let instructions = planner_cfg
        .load_prompt_template()?
        .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string());
    Ok(Box::new(LlmPlanner::new(
        &planner_cfg.provider,
        planner_cfg.base_url.as_deref(),
        api_key,
        planner_cfg.model.clone(),
        instructions,
    )))
}

/// Deterministic planner: regex extraction over the prompt, no network.
/// Always produces exactly one command.
pub struct RulePlanner;

#[async_trait]
impl Planner for RulePlanner {
    fn id(&self) -> &str {
        "rules"
    }

    async fn plan(&self, prompt: &str) -> anyhow::Result<Vec<Value>> {
        Ok(vec![plan_by_rules(prompt)])
    }
}

fn plan_by_rules(prompt: &str) -> Value {
    let lower = prompt.to_lowercase();

    let mut width = 200u32;
    let mut height = 100u32;
    let mut color = "#0000FF".to_string();
    let mut text = String::new();
    let mut font_size = 24u32;

    if let Some(caps) = Regex::new(r"#([0-9a-fA-F]{6})").unwrap().captures(prompt) {
        color = format!("#{}", &caps[1]);
    }
    if let Some(caps) = Regex::new(r"width (\d+)").unwrap().captures(&lower) {
        width = caps[1].parse().unwrap_or(width);
    }
    if let Some(caps) = Regex::new(r"height (\d+)").unwrap().captures(&lower) {
        height = caps[1].parse().unwrap_or(height);
    }
    // Quoted text is taken from the original prompt to keep its casing
    if let Some(caps) = Regex::new(r"'(.*?)'").unwrap().captures(prompt) {
        text = caps[1].to_string();
    }

    if lower.contains("circle") {
        json!({"type": "circle", "width": width, "height": height, "color": color})
    } else if lower.contains("text") {
        if let Some(caps) = Regex::new(r"font size (\d+)").unwrap().captures(&lower) {
            font_size = caps[1].parse().unwrap_or(font_size);
        }
        json!({"type": "text", "text": text, "fontSize": font_size})
    } else {
        json!({
            "type": "rectangle",
            "width": width,
            "height": height,
            "color": color,
            "text": text,
            "fontSize": font_size,
        })
    }
}

/// OpenAI-compatible chat-completions planner. The default base URL points
/// at Groq; any compatible endpoint works via `planner.base_url`.
pub struct LlmPlanner {
    provider_id: String,
    base_url: String,
    api_key: String,
    model: String,
    instructions: String,
    client: reqwest::Client,
}

impl LlmPlanner {
    pub fn new(
        provider_id: &str,
        base_url: Option<&str>,
        api_key: String,
        model: String,
        instructions: String,
    ) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            base_url: base_url
                .unwrap_or(GROQ_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model,
            instructions,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Planner for LlmPlanner {
    fn id(&self) -> &str {
        &self.provider_id
    }

    async fn plan(&self, prompt: &str) -> anyhow::Result<Vec<Value>> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a JSON generator. Output only valid JSON array. \
                              No markdown, no explanations."
                        .to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: self.instructions.replace("{prompt}", prompt),
                },
            ],
            temperature: 0.5,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Planner API error {status}: {body}");
        }

        let completion: ChatResponse = response.json().await?;
        let content = completion
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .ok_or_else(|| anyhow::anyhow!("Planner response had no content"))?;
        debug!(chars = content.len(), "Planner response received");
        parse_planner_response(content)
    }
}

/// Parse model output into a command list: strip markdown code fences, parse
/// as JSON, and wrap a lone object into a one-element array.
pub fn parse_planner_response(content: &str) -> anyhow::Result<Vec<Value>> {
    let fences = Regex::new(r"(?m)^```json\s*|\s*```$").unwrap();
    let cleaned = fences.replace_all(content.trim(), "");
    let parsed: Value = serde_json::from_str(cleaned.trim())?;
    match parsed {
        Value::Array(items) => Ok(items),
        object @ Value::Object(_) => Ok(vec![object]),
        other => anyhow::bail!("Planner produced {other} instead of commands"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawbridge_core::config::PlannerConfig;

    #[test]
    fn test_rules_rectangle_defaults() {
        let cmd = plan_by_rules("make me a box");
        assert_eq!(
            cmd,
            json!({
                "type": "rectangle",
                "width": 200,
                "height": 100,
                "color": "#0000FF",
                "text": "",
                "fontSize": 24,
            })
        );
    }

    #[test]
    fn test_rules_circle_extraction() {
        let cmd = plan_by_rules("a #FF5500 Circle with width 300 and height 120");
        assert_eq!(
            cmd,
            json!({"type": "circle", "width": 300, "height": 120, "color": "#FF5500"})
        );
    }

    #[test]
    fn test_rules_text_with_font_size() {
        let cmd = plan_by_rules("text saying 'Hello World' in font size 36");
        assert_eq!(
            cmd,
            json!({"type": "text", "text": "Hello World", "fontSize": 36})
        );
    }

    #[test]
    fn test_rules_circle_wins_over_text_keyword() {
        let cmd = plan_by_rules("circle with text 'x'");
        assert_eq!(cmd["type"], "circle");
    }

    #[tokio::test]
    async fn test_rule_planner_yields_one_command() {
        let commands = RulePlanner.plan("anything").await.unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(RulePlanner.id(), "rules");
    }

    #[test]
    fn test_parse_response_plain_array() {
        let commands = parse_planner_response(r#"[{"type": "rectangle"}]"#).unwrap();
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn test_parse_response_strips_fences() {
        let content = "```json\n[{\"type\": \"text\"}, {\"type\": \"circle\"}]\n```";
        let commands = parse_planner_response(content).unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[1]["type"], "circle");
    }

    #[test]
    fn test_parse_response_wraps_lone_object() {
        let commands = parse_planner_response(r#"{"type": "frame"}"#).unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0]["type"], "frame");
    }

    #[test]
    fn test_parse_response_rejects_scalars() {
        assert!(parse_planner_response("42").is_err());
        assert!(parse_planner_response("not json at all").is_err());
    }

    #[test]
    fn test_fallback_command_shape() {
        let commands = fallback_commands(&anyhow::anyhow!("boom"));
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0]["type"], "text");
        assert_eq!(commands[0]["text"], "Error: boom");
        assert_eq!(commands[0]["color"], "#FF0000");
    }

    #[test]
    fn test_planner_selection_defaults_to_rules() {
        let planner = planner_from_config(&Config::default()).unwrap();
        assert_eq!(planner.id(), "rules");
    }

    #[test]
    fn test_planner_selection_needs_api_key() {
        let mut config = Config::default();
        config.planner = Some(PlannerConfig {
            provider: "groq".to_string(),
            api_key: None,
            api_key_env: None,
            base_url: None,
            model: "llama-3.3-70b-versatile".to_string(),
            prompt_path: None,
        });
        assert_eq!(planner_from_config(&config).unwrap().id(), "rules");

        config.planner.as_mut().unwrap().api_key = Some("k-123".to_string());
        assert_eq!(planner_from_config(&config).unwrap().id(), "groq");
    }
}
