//! Classification tags and plugin identity carried by every session.

use crate::error::{Result, SessionError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Channel through which the host reached the plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    #[default]
    Tool,
    Model,
    Endpoint,
    AgentStrategy,
    Oauth,
    Datasource,
    Trigger,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Tool => "tool",
            AccessType::Model => "model",
            AccessType::Endpoint => "endpoint",
            AccessType::AgentStrategy => "agent_strategy",
            AccessType::Oauth => "oauth",
            AccessType::Datasource => "datasource",
            AccessType::Trigger => "trigger",
        }
    }
}

impl std::fmt::Display for AccessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation the plugin is asked to perform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessAction {
    #[default]
    InvokeTool,
    ValidateToolCredentials,
    GetToolRuntimeParameters,
    InvokeLlm,
    InvokeTextEmbedding,
    InvokeRerank,
    InvokeTts,
    InvokeSpeech2text,
    InvokeModeration,
    ValidateProviderCredentials,
    ValidateModelCredentials,
    GetTtsModelVoices,
    GetTextEmbeddingNumTokens,
    GetAiModelSchemas,
    GetLlmNumTokens,
    InvokeEndpoint,
    InvokeAgentStrategy,
}

impl AccessAction {
    /// The access type an action belongs to.
    pub fn access_type(&self) -> AccessType {
        match self {
            AccessAction::InvokeTool
            | AccessAction::ValidateToolCredentials
            | AccessAction::GetToolRuntimeParameters => AccessType::Tool,
            AccessAction::InvokeEndpoint => AccessType::Endpoint,
            AccessAction::InvokeAgentStrategy => AccessType::AgentStrategy,
            _ => AccessType::Model,
        }
    }
}

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:([a-z0-9_-]{1,64})/)?([a-z0-9_-]{1,255}):([0-9]{1,4}(?:\.[0-9]{1,4}){1,3}(?:-[A-Za-z0-9]{1,16})?)@([a-f0-9]{32,64})$",
    )
    .unwrap()
});

/// `author/name:version@checksum` identity of an installed plugin package.
///
/// Deserialization does not validate, so snapshots written by peers always
/// decode; use [`PluginUniqueIdentifier::new`] at trust boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginUniqueIdentifier(String);

impl PluginUniqueIdentifier {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if !IDENTIFIER.is_match(&raw) {
            return Err(SessionError::Validation {
                field: "plugin_unique_identifier".to_string(),
                message: format!("'{}' is not author/name:version@checksum", raw),
            });
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `author/name` (or bare `name`) without version and checksum.
    pub fn plugin_id(&self) -> Option<&str> {
        self.0.split_once(':').map(|(id, _)| id)
    }

    pub fn author(&self) -> Option<&str> {
        self.plugin_id()?.split_once('/').map(|(author, _)| author)
    }

    pub fn version(&self) -> Option<&str> {
        let (_, rest) = self.0.split_once(':')?;
        rest.split_once('@').map(|(version, _)| version)
    }

    pub fn checksum(&self) -> Option<&str> {
        self.0.rsplit_once('@').map(|(_, checksum)| checksum)
    }
}

impl std::fmt::Display for PluginUniqueIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Plugin manifest data, owned by whoever supplied it.
///
/// Sessions hold it behind an `Arc` so every holder sees the same manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginDeclaration(serde_json::Value);

impl PluginDeclaration {
    pub fn new(manifest: serde_json::Value) -> Self {
        Self(manifest)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(|v| v.as_str())
    }

    pub fn version(&self) -> Option<&str> {
        self.0.get("version").and_then(|v| v.as_str())
    }
}
