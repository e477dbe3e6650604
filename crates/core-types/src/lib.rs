use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Opaque top-level window (tab) handle reported by the driver.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(pub String);

impl WindowHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque element reference, only meaningful inside the document it came from.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One element-finding strategy together with its selector value.
///
/// Serialized externally tagged so configuration reads naturally:
/// `- xpath: "//iframe[@id='main']"`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum By {
    Id(String),
    Css(String),
    #[serde(rename = "xpath")]
    XPath(String),
    TagName(String),
    ClassName(String),
    Name(String),
    LinkText(String),
}

impl By {
    /// Strategy name as used in logs and the `kind:value` shorthand.
    pub fn kind(&self) -> &'static str {
        match self {
            By::Id(_) => "id",
            By::Css(_) => "css",
            By::XPath(_) => "xpath",
            By::TagName(_) => "tag_name",
            By::ClassName(_) => "class_name",
            By::Name(_) => "name",
            By::LinkText(_) => "link_text",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            By::Id(v)
            | By::Css(v)
            | By::XPath(v)
            | By::TagName(v)
            | By::ClassName(v)
            | By::Name(v)
            | By::LinkText(v) => v,
        }
    }

    /// Express the strategy as a CSS selector where one exists.
    ///
    /// WebDriver only speaks css, xpath, link text and tag name natively;
    /// id, class and name are rewritten onto css.
    pub fn to_css(&self) -> Option<String> {
        match self {
            By::Css(v) => Some(v.clone()),
            By::Id(v) => Some(format!("[id=\"{}\"]", escape_css_string(v))),
            By::Name(v) => Some(format!("[name=\"{}\"]", escape_css_string(v))),
            By::ClassName(v) => Some(format!(".{}", v.trim())),
            By::TagName(v) => Some(v.clone()),
            By::XPath(_) | By::LinkText(_) => None,
        }
    }
}

fn escape_css_string(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.value())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseByError {
    #[error("missing strategy prefix in '{0}' (expected kind:value)")]
    MissingPrefix(String),

    #[error("unknown locator strategy '{0}'")]
    UnknownStrategy(String),

    #[error("empty selector for strategy '{0}'")]
    EmptySelector(String),
}

impl FromStr for By {
    type Err = ParseByError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| ParseByError::MissingPrefix(s.to_string()))?;
        let value = value.trim();
        if value.is_empty() {
            return Err(ParseByError::EmptySelector(kind.to_string()));
        }
        let value = value.to_string();
        match kind.trim() {
            "id" => Ok(By::Id(value)),
            "css" => Ok(By::Css(value)),
            "xpath" => Ok(By::XPath(value)),
            "tag_name" | "tag" => Ok(By::TagName(value)),
            "class_name" | "class" => Ok(By::ClassName(value)),
            "name" => Ok(By::Name(value)),
            "link_text" => Ok(By::LinkText(value)),
            other => Err(ParseByError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Failure categories shared by every engine layer.
///
/// Layer-specific error enums map onto these so reports and step events can
/// carry a stable kind regardless of where the failure originated.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ElementNotFound,
    ElementNotInteractable,
    ContextUnreachable,
    WindowNotFound,
    RetryExhausted,
    SessionLost,
    ContextUnrecoverable,
    PostConditionFailed,
    Driver,
    Invalid,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::ElementNotFound => "element_not_found",
            ErrorKind::ElementNotInteractable => "element_not_interactable",
            ErrorKind::ContextUnreachable => "context_unreachable",
            ErrorKind::WindowNotFound => "window_not_found",
            ErrorKind::RetryExhausted => "retry_exhausted",
            ErrorKind::SessionLost => "session_lost",
            ErrorKind::ContextUnrecoverable => "context_unrecoverable",
            ErrorKind::PostConditionFailed => "post_condition_failed",
            ErrorKind::Driver => "driver",
            ErrorKind::Invalid => "invalid",
        }
    }

    /// Kinds that abort a scenario or cycle regardless of best-effort marking.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorKind::SessionLost | ErrorKind::ContextUnrecoverable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shorthand_locators() {
        assert_eq!(
            "xpath://iframe[@id='x']".parse::<By>().unwrap(),
            By::XPath("//iframe[@id='x']".to_string())
        );
        assert_eq!("id:convoy".parse::<By>().unwrap(), By::Id("convoy".into()));
        assert_eq!("tag:iframe".parse::<By>().unwrap(), By::TagName("iframe".into()));
    }

    #[test]
    fn rejects_malformed_shorthand() {
        assert!(matches!(
            "div.button".parse::<By>(),
            Err(ParseByError::MissingPrefix(_))
        ));
        assert!(matches!(
            "regex:.*".parse::<By>(),
            Err(ParseByError::UnknownStrategy(_))
        ));
        assert!(matches!(
            "css:   ".parse::<By>(),
            Err(ParseByError::EmptySelector(_))
        ));
    }

    #[test]
    fn css_rewrites_for_id_and_class() {
        assert_eq!(
            By::Id("iTalentFrame".into()).to_css().as_deref(),
            Some("[id=\"iTalentFrame\"]")
        );
        assert_eq!(
            By::ClassName("phoenix-loading".into()).to_css().as_deref(),
            Some(".phoenix-loading")
        );
        assert!(By::XPath("//div".into()).to_css().is_none());
    }

    #[test]
    fn yaml_form_is_externally_tagged() {
        let parsed: Vec<By> = serde_yaml::from_str("- id: main\n- xpath: //iframe\n").unwrap();
        assert_eq!(
            parsed,
            vec![By::Id("main".into()), By::XPath("//iframe".into())]
        );
    }

    #[test]
    fn fatal_kinds() {
        assert!(ErrorKind::SessionLost.is_fatal());
        assert!(ErrorKind::ContextUnrecoverable.is_fatal());
        assert!(!ErrorKind::ElementNotFound.is_fatal());
        assert_eq!(
            serde_json::to_string(&ErrorKind::RetryExhausted).unwrap(),
            "\"retry_exhausted\""
        );
    }
}
