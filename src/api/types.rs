//! Session protocol message types.

use serde::{Deserialize, Serialize};

/// Message sent by the client, discriminated by `method`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Request the current prompt.
    Prompt,
    /// A keystroke (single character or control code).
    Key { key: String },
    /// Request completions for a partial path.
    Tab {
        #[serde(default)]
        start: String,
    },
    /// Run a command line, or change directory.
    Command { command: String },
}

/// Message sent by the server.
///
/// The protocol carries several loosely related shapes in one flat
/// object; only the fields that apply are serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Set on every subprocess output chunk. Standard output and
    /// standard error are not told apart on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_executing: Option<bool>,
}

impl ServerMessage {
    /// Prompt sent on connect: `{prompt}`.
    pub fn greeting(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Default::default()
        }
    }

    /// Prompt reply with empty output: `{data: "", prompt}`.
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self {
            data: Some(String::new()),
            prompt: Some(prompt.into()),
            ..Default::default()
        }
    }

    /// In-band failure text followed by a prompt: `{data, prompt}`.
    pub fn failure(message: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            data: Some(message.into()),
            prompt: Some(prompt.into()),
            ..Default::default()
        }
    }

    /// Subprocess output chunk: `{data, error: true}`.
    pub fn output(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            error: Some(true),
            ..Default::default()
        }
    }

    /// Completion candidates: `{completion}`.
    pub fn completion(candidates: Vec<String>) -> Self {
        Self {
            completion: Some(candidates),
            ..Default::default()
        }
    }

    /// Execution started: `{isExecuting: true}`.
    pub fn executing() -> Self {
        Self {
            is_executing: Some(true),
            ..Default::default()
        }
    }

    /// Execution finished, with the fresh prompt: `{prompt, isExecuting: false}`.
    pub fn finished(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            is_executing: Some(false),
            ..Default::default()
        }
    }
}
