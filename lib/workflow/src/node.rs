//! Workflow node types.
//!
//! Nodes are the building blocks of workflows. Each node has:
//! - A unique ID within the graph
//! - A kind from a fixed set (trigger, branch, integrations)
//! - A canvas position
//! - An attribute bag whose meaningful keys depend on the kind
//!
//! Everything that varies by kind (default attributes, handles, edit form,
//! card rendering) is a single exhaustive `match` on [`NodeKind`].

use crate::port::{HandleSide, Handles, OutputHandles};
use flowsmith_core::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

/// The kind of a workflow node. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Entry point of the workflow.
    Start,
    /// Terminal point of the workflow.
    End,
    /// Boolean branch with `true`/`false` outputs.
    Condition,
    /// Post a Slack message.
    Slack,
    /// Open an issue/ticket.
    Issue,
    /// Call an HTTP API.
    Api,
    /// Run an automated script or action.
    Automated,
    /// Send an email.
    Email,
}

impl NodeKind {
    /// Every kind, in palette order.
    pub const ALL: [NodeKind; 8] = [
        NodeKind::Start,
        NodeKind::End,
        NodeKind::Condition,
        NodeKind::Slack,
        NodeKind::Issue,
        NodeKind::Api,
        NodeKind::Automated,
        NodeKind::Email,
    ];

    /// Returns the wire name of the kind (also the drag-and-drop payload).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Condition => "condition",
            Self::Slack => "slack",
            Self::Issue => "issue",
            Self::Api => "api",
            Self::Automated => "automated",
            Self::Email => "email",
        }
    }

    /// Returns the handles nodes of this kind expose.
    #[must_use]
    pub const fn handles(self) -> Handles {
        match self {
            Self::Start => Handles {
                input: false,
                outputs: OutputHandles::Single,
            },
            Self::End => Handles {
                input: true,
                outputs: OutputHandles::None,
            },
            Self::Condition => Handles {
                input: true,
                outputs: OutputHandles::Branch,
            },
            Self::Slack | Self::Issue | Self::Api | Self::Automated | Self::Email => Handles {
                input: true,
                outputs: OutputHandles::Single,
            },
        }
    }

    /// Returns the attributes a freshly placed node of this kind starts with.
    #[must_use]
    pub fn default_data(self) -> NodeData {
        let mut data = NodeData::new();
        data.set("label", format!("New {self}"));
        match self {
            Self::Condition => {
                data.set("condition", "x > 5");
            }
            Self::Issue => {
                data.set("title", "New Issue");
                data.set("severity", Severity::Low.as_str());
            }
            Self::Start
            | Self::End
            | Self::Slack
            | Self::Api
            | Self::Automated
            | Self::Email => {}
        }
        data
    }

    /// Returns the edit-form fields for this kind.
    #[must_use]
    pub const fn edit_fields(self) -> &'static [FieldSpec] {
        match self {
            Self::Start | Self::End => LABEL_FIELDS,
            Self::Condition => CONDITION_FIELDS,
            Self::Slack => SLACK_FIELDS,
            Self::Issue => ISSUE_FIELDS,
            Self::Api => API_FIELDS,
            Self::Automated => AUTOMATED_FIELDS,
            Self::Email => EMAIL_FIELDS,
        }
    }

    /// Looks up the edit-form field for `key`, if this kind has one.
    #[must_use]
    pub fn field(self, key: &str) -> Option<&'static FieldSpec> {
        self.edit_fields().iter().find(|field| field.key == key)
    }

    /// Renders the card summary for a node of this kind.
    ///
    /// Missing or empty attributes fall back to placeholder text; the
    /// placeholders are never written back into the node's data.
    #[must_use]
    pub fn card(self, data: &NodeData) -> NodeCard {
        let (title, accent, lines) = match self {
            Self::Start => ("Start", "#4ade80", vec![data.text_or("label", "")]),
            Self::End => ("End", "#94a3b8", vec![data.text_or("label", "")]),
            Self::Condition => (
                "Condition",
                "#c084fc",
                vec![data.text_or("condition", "if (x > 5)")],
            ),
            Self::Slack => (
                "Slack Msg",
                "#f472b6",
                vec![
                    format!("Ch: {}", data.text_or("channel", "#general")),
                    format!("\"{}\"", data.text_or("message", "...")),
                ],
            ),
            Self::Issue => (
                "Issue / Ticket",
                "#ef4444",
                vec![
                    data.text_or("title", "New Issue Ticket"),
                    format!("Severity: {}", data.severity()),
                ],
            ),
            Self::Api => (
                "API Request",
                "#818cf8",
                vec![
                    data.method().to_string(),
                    data.text_or("url", "/api/v1/..."),
                ],
            ),
            Self::Automated => (
                "Auto Step",
                "#22d3ee",
                vec![format!("Action: {}", data.text_or("action", "Run Script"))],
            ),
            Self::Email => (
                "Email Auto",
                "#facc15",
                vec![
                    format!("To: {}", data.text_or("to", "user@ex.com")),
                    format!("Subj: {}", data.text_or("subject", "Alert")),
                ],
            ),
        };
        NodeCard {
            title,
            accent,
            lines,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a node kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKindError {
    /// The rejected input.
    pub value: String,
}

impl fmt::Display for ParseKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown node kind '{}'", self.value)
    }
}

impl std::error::Error for ParseKindError {}

/// Error returned when a string is not one of a select field's options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptionError {
    /// Attribute key the value was meant for.
    pub field: &'static str,
    /// The rejected input.
    pub value: String,
}

impl fmt::Display for ParseOptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a valid {}", self.value, self.field)
    }
}

impl std::error::Error for ParseOptionError {}

impl FromStr for NodeKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseKindError {
                value: s.to_string(),
            })
    }
}

/// Issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    /// Select options, in display order.
    pub const NAMES: [&'static str; 3] = ["Low", "Medium", "High"];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Self::Low),
            "Medium" => Ok(Self::Medium),
            "High" => Ok(Self::High),
            other => Err(ParseOptionError {
                field: "severity",
                value: other.to_string(),
            }),
        }
    }
}

/// HTTP method of an API node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Select options, in display order.
    pub const NAMES: [&'static str; 4] = ["GET", "POST", "PUT", "DELETE"];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            other => Err(ParseOptionError {
                field: "method",
                value: other.to_string(),
            }),
        }
    }
}

/// Kind-specific attribute bag.
///
/// Stored as an open JSON object so keys a kind does not use survive a load
/// and save unchanged. Typed accessors interpret the well-known keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeData(Map<String, JsonValue>);

impl NodeData {
    /// Creates an empty attribute bag.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Returns the raw value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Returns the value under `key` if it is a string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(JsonValue::as_str)
    }

    /// Sets `key` to `value`, keeping every other key.
    ///
    /// Returns whether the stored value changed.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> bool {
        let value = value.into();
        let key = key.into();
        if self.0.get(&key) == Some(&value) {
            return false;
        }
        self.0.insert(key, value);
        true
    }

    /// Returns the node label, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.get_str("label")
    }

    /// Returns the issue severity, defaulting to `Low` when absent or unknown.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.get_str("severity")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Returns the API method, defaulting to `GET` when absent or unknown.
    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.get_str("method")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Returns the string under `key`, or `fallback` when it is missing or empty.
    #[must_use]
    pub fn text_or(&self, key: &str, fallback: &str) -> String {
        match self.get_str(key) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => fallback.to_string(),
        }
    }

    /// Iterates over the stored keys and values.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, JsonValue>> for NodeData {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }
}

/// A point on the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns whether both coordinates are finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A workflow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique identifier for this node within the graph.
    pub id: NodeId,
    /// The node kind.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Top-left corner of the node's box on the canvas.
    #[serde(default)]
    pub position: Position,
    /// Kind-specific attributes.
    #[serde(default)]
    pub data: NodeData,
    /// Side the output handles are drawn on, set by layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_position: Option<HandleSide>,
    /// Side the input handle is drawn on, set by layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_position: Option<HandleSide>,
}

impl Node {
    /// Creates a node with explicit ID and attributes.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, kind: NodeKind, position: Position, data: NodeData) -> Self {
        Self {
            id: id.into(),
            kind,
            position,
            data,
            source_position: None,
            target_position: None,
        }
    }

    /// Creates a node as a drop onto the canvas would: fresh ID, default data.
    #[must_use]
    pub fn placed(kind: NodeKind, position: Position) -> Self {
        Self::new(NodeId::generate(kind.as_str()), kind, position, kind.default_data())
    }

    /// Returns the node's label, or the empty string.
    #[must_use]
    pub fn label(&self) -> &str {
        self.data.label().unwrap_or_default()
    }

    /// Returns the handles this node exposes.
    #[must_use]
    pub fn handles(&self) -> Handles {
        self.kind.handles()
    }

    /// Renders this node's card summary.
    #[must_use]
    pub fn card(&self) -> NodeCard {
        self.kind.card(&self.data)
    }
}

/// Summary of a node as the canvas draws it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCard {
    /// Header text.
    pub title: &'static str,
    /// Border/handle colour.
    pub accent: &'static str,
    /// Body lines.
    pub lines: Vec<String>,
}

/// Input widget for an edit-form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidget {
    Text,
    TextArea,
    Select(&'static [&'static str]),
}

/// One field of a node's edit form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Attribute key the field writes.
    pub key: &'static str,
    /// Field caption.
    pub label: &'static str,
    pub widget: FieldWidget,
    pub placeholder: Option<&'static str>,
}

impl FieldSpec {
    /// Returns whether `value` is acceptable for this field.
    ///
    /// Free-text fields accept anything; selects accept only their options.
    #[must_use]
    pub fn accepts(&self, value: &str) -> bool {
        match self.widget {
            FieldWidget::Text | FieldWidget::TextArea => true,
            FieldWidget::Select(options) => options.contains(&value),
        }
    }
}

const LABEL_FIELDS: &[FieldSpec] = &[FieldSpec {
    key: "label",
    label: "Label",
    widget: FieldWidget::Text,
    placeholder: None,
}];

const CONDITION_FIELDS: &[FieldSpec] = &[FieldSpec {
    key: "condition",
    label: "Expression (e.g., data.value > 10)",
    widget: FieldWidget::TextArea,
    placeholder: Some("x > 5"),
}];

const SLACK_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        key: "channel",
        label: "Channel",
        widget: FieldWidget::Text,
        placeholder: Some("#general"),
    },
    FieldSpec {
        key: "message",
        label: "Message",
        widget: FieldWidget::TextArea,
        placeholder: Some("Type message here..."),
    },
];

const ISSUE_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        key: "title",
        label: "Issue Title",
        widget: FieldWidget::Text,
        placeholder: None,
    },
    FieldSpec {
        key: "severity",
        label: "Severity",
        widget: FieldWidget::Select(&Severity::NAMES),
        placeholder: None,
    },
];

const API_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        key: "method",
        label: "Method",
        widget: FieldWidget::Select(&HttpMethod::NAMES),
        placeholder: None,
    },
    FieldSpec {
        key: "url",
        label: "Endpoint URL",
        widget: FieldWidget::Text,
        placeholder: Some("https://api.example.com/data"),
    },
];

const EMAIL_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        key: "to",
        label: "Recipient (To)",
        widget: FieldWidget::Text,
        placeholder: Some("user@company.com"),
    },
    FieldSpec {
        key: "subject",
        label: "Subject",
        widget: FieldWidget::Text,
        placeholder: Some("Notification Subject"),
    },
];

const AUTOMATED_FIELDS: &[FieldSpec] = &[FieldSpec {
    key: "action",
    label: "Automation Action / Script",
    widget: FieldWidget::Text,
    placeholder: Some("run_data_sync.py"),
}];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::BranchPort;

    #[test]
    fn kind_round_trips_through_wire_name() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.as_str().parse::<NodeKind>(), Ok(kind));
        }
        assert!("webhook".parse::<NodeKind>().is_err());
    }

    #[test]
    fn select_values_parse_with_their_own_error() {
        assert_eq!("High".parse::<Severity>(), Ok(Severity::High));
        assert_eq!("PUT".parse::<HttpMethod>(), Ok(HttpMethod::Put));

        let err = "Urgent".parse::<Severity>().unwrap_err();
        assert_eq!(err.to_string(), "'Urgent' is not a valid severity");
        let err = "PATCH".parse::<HttpMethod>().unwrap_err();
        assert_eq!(err.field, "method");
        assert!(!err.to_string().contains("node kind"));
    }

    #[test]
    fn default_data_for_condition_and_issue() {
        let condition = NodeKind::Condition.default_data();
        assert_eq!(condition.label(), Some("New condition"));
        assert_eq!(condition.get_str("condition"), Some("x > 5"));

        let issue = NodeKind::Issue.default_data();
        assert_eq!(issue.get_str("title"), Some("New Issue"));
        assert_eq!(issue.severity(), Severity::Low);
    }

    #[test]
    fn default_data_for_plain_kinds_is_label_only() {
        let data = NodeKind::Slack.default_data();
        assert_eq!(data.len(), 1);
        assert_eq!(data.label(), Some("New slack"));
    }

    #[test]
    fn start_has_no_input_and_end_has_no_output() {
        assert!(!NodeKind::Start.handles().input);
        assert_eq!(NodeKind::End.handles().outputs, OutputHandles::None);
        assert_eq!(
            NodeKind::Condition.handles().outputs.ports(),
            &[Some(BranchPort::True), Some(BranchPort::False)]
        );
    }

    #[test]
    fn set_is_idempotent_and_preserves_other_keys() {
        let mut data = NodeKind::Issue.default_data();
        assert!(data.set("label", "X"));
        assert!(!data.set("label", "X"));
        assert_eq!(data.label(), Some("X"));
        assert_eq!(data.get_str("title"), Some("New Issue"));
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn typed_accessors_fall_back_on_unknown_values() {
        let mut data = NodeData::new();
        data.set("severity", "Critical");
        data.set("method", "PATCH");
        assert_eq!(data.severity(), Severity::Low);
        assert_eq!(data.method(), HttpMethod::Get);
    }

    #[test]
    fn card_uses_placeholders_for_missing_values() {
        let mut data = NodeData::new();
        data.set("channel", "");
        let card = NodeKind::Slack.card(&data);
        assert_eq!(card.title, "Slack Msg");
        assert_eq!(card.lines, vec!["Ch: #general", "\"...\""]);
        assert!(data.get_str("message").is_none());
    }

    #[test]
    fn select_fields_only_accept_their_options() {
        let severity = NodeKind::Issue.field("severity").expect("issue has severity");
        assert!(severity.accepts("High"));
        assert!(!severity.accepts("Urgent"));
        assert!(NodeKind::Issue.field("url").is_none());
    }

    #[test]
    fn placed_node_gets_kind_prefixed_id() {
        let node = Node::placed(NodeKind::Email, Position::new(10.0, 20.0));
        assert!(node.id.as_str().starts_with("email-"));
        assert_eq!(node.label(), "New email");
    }

    #[test]
    fn node_serializes_with_canvas_field_names() {
        let node = Node::new("1", NodeKind::Start, Position::new(500.0, 100.0), NodeData::new());
        let json = serde_json::to_value(&node).expect("serialize");
        assert_eq!(json["type"], "start");
        assert_eq!(json["position"]["x"], 500.0);
        assert!(json.get("sourcePosition").is_none());
    }
}
