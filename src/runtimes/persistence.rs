/*!
Persistence primitives for serializing conversation state.

Checkpoints are stored as an explicit, versioned JSON schema rather than an
opaque blob of runtime objects, so persisted conversations stay readable
across releases. This module is pure data transformation; it performs no I/O.
*/

use serde::{Deserialize, Serialize};

use crate::document::DocumentChunk;
use crate::message::Message;
use crate::state::ConversationState;

use miette::Diagnostic;
use thiserror::Error;

/// Schema version written into every persisted state.
///
/// Bump this (and add an upgrade path in [`TryFrom`]) whenever a field
/// changes meaning; readers reject versions newer than they understand.
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// The persisted wire shape of [`ConversationState`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedState {
    pub schema_version: u32,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub documents: Vec<DocumentChunk>,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub retries: u32,
    #[serde(default)]
    pub needs_retry: bool,
}

/// Serialization and schema errors for persisted state.
#[derive(Debug, Error, Diagnostic)]
pub enum PersistenceError {
    #[error("JSON serialization/deserialization failed: {source}")]
    #[diagnostic(
        code(ragloom::persistence::serde),
        help("Ensure the stored JSON matches the PersistedState schema.")
    )]
    Serde {
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported state schema version {found} (this build reads up to {supported})")]
    #[diagnostic(
        code(ragloom::persistence::schema),
        help("The checkpoint was written by a newer release; upgrade before reading it.")
    )]
    UnsupportedSchema { found: u32, supported: u32 },
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

impl From<&ConversationState> for PersistedState {
    fn from(state: &ConversationState) -> Self {
        PersistedState {
            schema_version: STATE_SCHEMA_VERSION,
            messages: state.messages.clone(),
            question: state.question.clone(),
            documents: state.documents.clone(),
            answer: state.answer.clone(),
            retries: state.retries,
            needs_retry: state.needs_retry,
        }
    }
}

impl TryFrom<PersistedState> for ConversationState {
    type Error = PersistenceError;

    fn try_from(p: PersistedState) -> Result<Self> {
        if p.schema_version > STATE_SCHEMA_VERSION {
            return Err(PersistenceError::UnsupportedSchema {
                found: p.schema_version,
                supported: STATE_SCHEMA_VERSION,
            });
        }
        Ok(ConversationState {
            messages: p.messages,
            question: p.question,
            documents: p.documents,
            answer: p.answer,
            retries: p.retries,
            needs_retry: p.needs_retry,
        })
    }
}

/// Serializes a state into its persisted JSON form.
pub fn encode_state(state: &ConversationState) -> Result<String> {
    serde_json::to_string(&PersistedState::from(state))
        .map_err(|source| PersistenceError::Serde { source })
}

/// Deserializes a persisted JSON form back into a live state.
pub fn decode_state(json: &str) -> Result<ConversationState> {
    let persisted: PersistedState =
        serde_json::from_str(json).map_err(|source| PersistenceError::Serde { source })?;
    ConversationState::try_from(persisted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn sample_state() -> ConversationState {
        ConversationState {
            messages: vec![Message::human("hi"), Message::ai("hello")],
            question: "hi".into(),
            documents: vec![DocumentChunk::new("chunk", 0.7)],
            answer: "hello".into(),
            retries: 1,
            needs_retry: false,
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let state = sample_state();
        let json = encode_state(&state).unwrap();
        let decoded = decode_state(&json).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn schema_version_is_written() {
        let json = encode_state(&sample_state()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["schema_version"], STATE_SCHEMA_VERSION);
    }

    #[test]
    fn newer_schema_versions_are_rejected() {
        let mut persisted = PersistedState::from(&sample_state());
        persisted.schema_version = STATE_SCHEMA_VERSION + 1;
        let err = ConversationState::try_from(persisted).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::UnsupportedSchema { found, .. } if found == STATE_SCHEMA_VERSION + 1
        ));
    }

    #[test]
    fn missing_optional_fields_default() {
        let decoded = decode_state(r#"{"schema_version":1,"question":"q"}"#).unwrap();
        assert_eq!(decoded.question, "q");
        assert!(decoded.messages.is_empty());
        assert_eq!(decoded.retries, 0);
    }
}
