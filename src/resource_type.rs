//! Resource type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ResourceType is the request category a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    MainFrame,
    SubFrame,
    Stylesheet,
    Script,
    Image,
    Font,
    Object,
    #[serde(rename = "xmlhttprequest")]
    XmlHttpRequest,
    Ping,
    Media,
    Websocket,
    Other,
}

impl ResourceType {
    /// Every type the matching engine knows, in its canonical order.
    pub const ALL: [ResourceType; 12] = [
        ResourceType::MainFrame,
        ResourceType::SubFrame,
        ResourceType::Stylesheet,
        ResourceType::Script,
        ResourceType::Image,
        ResourceType::Font,
        ResourceType::Object,
        ResourceType::XmlHttpRequest,
        ResourceType::Ping,
        ResourceType::Media,
        ResourceType::Websocket,
        ResourceType::Other,
    ];

    /// Types a filter option may narrow a rule to, in precedence order.
    pub const NARROWABLE: [ResourceType; 4] = [
        ResourceType::Image,
        ResourceType::Script,
        ResourceType::Stylesheet,
        ResourceType::XmlHttpRequest,
    ];

    /// Parse a resource type from its option name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "main_frame" | "document" => Some(ResourceType::MainFrame),
            "sub_frame" | "subdocument" => Some(ResourceType::SubFrame),
            "stylesheet" | "css" => Some(ResourceType::Stylesheet),
            "script" => Some(ResourceType::Script),
            "image" => Some(ResourceType::Image),
            "font" => Some(ResourceType::Font),
            "object" => Some(ResourceType::Object),
            "xmlhttprequest" | "xhr" => Some(ResourceType::XmlHttpRequest),
            "ping" => Some(ResourceType::Ping),
            "media" => Some(ResourceType::Media),
            "websocket" => Some(ResourceType::Websocket),
            "other" => Some(ResourceType::Other),
            _ => None,
        }
    }

    /// Get the engine's string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::MainFrame => "main_frame",
            ResourceType::SubFrame => "sub_frame",
            ResourceType::Stylesheet => "stylesheet",
            ResourceType::Script => "script",
            ResourceType::Image => "image",
            ResourceType::Font => "font",
            ResourceType::Object => "object",
            ResourceType::XmlHttpRequest => "xmlhttprequest",
            ResourceType::Ping => "ping",
            ResourceType::Media => "media",
            ResourceType::Websocket => "websocket",
            ResourceType::Other => "other",
        }
    }

    /// The default type set for rules without a narrowing option.
    pub fn all() -> Vec<ResourceType> {
        Self::ALL.to_vec()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
