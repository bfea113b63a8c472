//! Events emitted by the rendering engine.
//!
//! The engine writes one JSON object per line. Each object is either a log
//! line, the single bootstrap (`"initial"`) event, or a rendered page.

use serde::Deserialize;
use serde_json::Value;

/// A tag rendered into the document head.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind")]
pub enum HeadTag {
    /// A plain element such as `meta` or `link`.
    #[serde(rename = "meta", alias = "head")]
    Meta {
        /// Element name
        name: String,
        /// Attributes in emission order
        #[serde(default)]
        attributes: Vec<(String, String)>,
    },

    /// Structured data embedded as `application/ld+json`.
    #[serde(rename = "json-ld")]
    JsonLd {
        /// The JSON-LD document
        contents: Value,
    },
}

/// A single pre-rendered route.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDescriptor {
    /// Logical route, e.g. `blog/post-1`
    pub route: String,

    /// Rendered body stored in `content.json`
    #[serde(alias = "body")]
    pub rendered_body: String,

    /// Head tags in render order
    #[serde(default, alias = "head")]
    pub head_tags: Vec<HeadTag>,

    /// Body fragment embedded in `index.html`
    pub html: String,

    /// Route data stored in `content.json`
    #[serde(default, alias = "contentJson")]
    pub static_data: Value,
}

/// A file the engine asks to be written verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneratedFile {
    /// Path relative to the output root
    pub path: String,
    /// File content
    pub content: String,
}

/// The bootstrap payload, sent once before any page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootstrap {
    /// Raw manifest data, transformed before it is written
    pub manifest: Value,

    #[serde(default)]
    pub files_to_generate: Vec<GeneratedFile>,
}

/// A decoded engine event.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Log(String),
    Bootstrap(Bootstrap),
    Render(Box<PageDescriptor>),
}

/// Errors raised while decoding engine output.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Engine output is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Failed to read engine output: {0}")]
    Read(String),

    #[error("Unknown engine command: {0}")]
    UnknownCommand(String),

    #[error("Malformed bootstrap event: {0}")]
    MalformedBootstrap(String),

    #[error("Malformed page descriptor{}: {message}", route_suffix(.route))]
    MalformedPage {
        route: Option<String>,
        message: String,
    },
}

fn route_suffix(route: &Option<String>) -> String {
    match route {
        Some(route) => format!(" for /{}", route.trim_start_matches('/')),
        None => String::new(),
    }
}

impl EngineEvent {
    /// Decode one line of engine output.
    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_str(line).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
        Self::from_value(value)
    }

    /// Decode an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let command = value
            .get("command")
            .and_then(Value::as_str)
            .map(str::to_owned);

        match command.as_deref() {
            Some("log") => {
                let message = match value.get("value") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                Ok(EngineEvent::Log(message))
            }
            Some("initial") => serde_json::from_value(value)
                .map(EngineEvent::Bootstrap)
                .map_err(|e| ProtocolError::MalformedBootstrap(e.to_string())),
            None | Some("render") => {
                let route = value
                    .get("route")
                    .and_then(Value::as_str)
                    .map(str::to_owned);
                serde_json::from_value::<PageDescriptor>(value)
                    .map(|page| EngineEvent::Render(Box::new(page)))
                    .map_err(|e| ProtocolError::MalformedPage {
                        route,
                        message: e.to_string(),
                    })
            }
            Some(other) => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}
