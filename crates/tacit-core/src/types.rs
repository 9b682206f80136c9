//! Core type definitions for Tacit

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// The message the user is currently looking at
///
/// Serializes as the prediction request body: `{"subject": ..., "sender": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Context {
    pub subject: String,
    pub sender: String,
}

impl Context {
    pub fn new(subject: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            sender: sender.into(),
        }
    }

    /// Whether two contexts identify the same message.
    ///
    /// Only the subject is compared. Two senders writing with an identical
    /// subject are treated as the same context.
    pub fn same_message(&self, other: &Context) -> bool {
        self.subject == other.subject
    }
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' from {}", self.subject, self.sender)
    }
}

/// What the inspector currently sees on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageView {
    /// List/inbox view, or nothing relevant visible
    NoDetailView,
    /// Detail marker present but subject or sender not rendered yet
    Incomplete,
    /// A single message is open
    Detail(Context),
}

impl PageView {
    /// Build a view from raw extraction results.
    ///
    /// `subject` is `None` when the detail marker is absent. Empty strings count
    /// as missing.
    pub fn from_extraction(subject: Option<String>, sender: Option<String>) -> Self {
        match subject {
            None => Self::NoDetailView,
            Some(subject) => match sender {
                Some(sender) if !subject.is_empty() && !sender.is_empty() => {
                    Self::Detail(Context { subject, sender })
                }
                _ => Self::Incomplete,
            },
        }
    }
}

/// Predicted action label for a context
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Suggestion {
    pub action: String,
}

impl Suggestion {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
        }
    }
}

impl std::fmt::Display for Suggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.action)
    }
}

/// The (context, suggestion) pair currently on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub context: Context,
    pub suggestion: Suggestion,
}

impl Binding {
    pub fn new(context: Context, suggestion: Suggestion) -> Self {
        Self {
            context,
            suggestion,
        }
    }
}

/// User verdict on a displayed suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accepted,
    Rejected,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accepted => write!(f, "accepted"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "accepted" | "accept" => Ok(Self::Accepted),
            "rejected" | "reject" => Ok(Self::Rejected),
            _ => Err(format!("Invalid decision: {}", s)),
        }
    }
}

/// Body of a feedback report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    #[serde(flatten)]
    pub context: Context,
    pub suggestion: String,
    pub feedback: Decision,
}

impl FeedbackEvent {
    /// Build an event from a live binding. There is no constructor taking
    /// partial data.
    pub fn from_binding(binding: &Binding, decision: Decision) -> Self {
        Self {
            context: binding.context.clone(),
            suggestion: binding.suggestion.action.clone(),
            feedback: decision,
        }
    }
}

/// Action the user took directly in the mail interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    Delete,
    Archive,
    ReportSpam,
}

impl UserAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Archive => "archive",
            Self::ReportSpam => "report_spam",
        }
    }
}

impl std::fmt::Display for UserAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for UserAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "delete" => Ok(Self::Delete),
            "archive" => Ok(Self::Archive),
            "report_spam" | "spam" => Ok(Self::ReportSpam),
            _ => Err(format!("Invalid user action: {}", s)),
        }
    }
}

/// A user action observed on the page, with the context inferred at click time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedAction {
    pub action: UserAction,
    pub context: Option<Context>,
}

/// Body of a capture report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureEvent {
    pub sender: String,
    pub subject: String,
    /// RFC 3339 / ISO-8601 timestamp
    pub capture_timestamp: String,
    pub user_decision: String,
}

impl CaptureEvent {
    pub fn new(context: &Context, action: UserAction, at: DateTime<Utc>) -> Self {
        Self {
            sender: context.sender.clone(),
            subject: context.subject.clone(),
            capture_timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            user_decision: action.label().to_string(),
        }
    }
}
