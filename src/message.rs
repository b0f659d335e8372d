use serde::{Deserialize, Serialize};
use std::fmt;

/// The originator of a conversation message.
///
/// Roles are a closed enum rather than free-form strings so that persisted
/// checkpoints keep a stable, explicitly versioned schema: a `Message` always
/// serializes as `{"role": "human" | "ai" | "system", "content": "..."}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A message typed by the end user.
    Human,
    /// A message produced by the language model.
    Ai,
    /// An instruction message, never persisted into conversation history.
    System,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Ai => "ai",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role-tagged message in a conversation.
///
/// Messages are the only state field with append semantics: the reducer
/// concatenates new messages onto the history instead of replacing it, which
/// is what makes conversations resumable across passes and process restarts.
///
/// # Examples
///
/// ```
/// use ragloom::message::{Message, Role};
///
/// let question = Message::human("What is a checkpoint?");
/// let answer = Message::ai("A durable snapshot of conversation state.");
///
/// assert!(question.has_role(Role::Human));
/// assert_eq!(answer.role, Role::Ai);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who produced this message.
    pub role: Role,
    /// The text content of the message.
    pub content: String,
}

impl Message {
    /// Creates a message with an explicit role.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a human (end-user) message.
    #[must_use]
    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Role::Human, content)
    }

    /// Creates an AI (model response) message.
    #[must_use]
    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(Role::Ai, content)
    }

    /// Creates a system instruction message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Returns true if this message has the given role.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_role_and_content() {
        let human = Message::human("hi");
        assert_eq!(human.role, Role::Human);
        assert_eq!(human.content, "hi");

        let ai = Message::ai("hello");
        assert_eq!(ai.role, Role::Ai);

        let system = Message::system("be brief");
        assert_eq!(system.role, Role::System);
    }

    #[test]
    fn role_checking() {
        let msg = Message::human("hi");
        assert!(msg.has_role(Role::Human));
        assert!(!msg.has_role(Role::Ai));
        assert!(!msg.has_role(Role::System));
    }

    #[test]
    fn serialized_form_is_lowercase_tagged() {
        let msg = Message::ai("done");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"ai","content":"done"}"#);

        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = serde_json::from_str::<Message>(r#"{"role":"robot","content":"x"}"#);
        assert!(err.is_err());
    }
}
