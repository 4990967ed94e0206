//! Node identity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::team::{validate_display_name, TeamValidationError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NodeIdError {
    #[error("Node ID cannot be empty")]
    Empty,

    #[error("Node ID cannot exceed {0} characters")]
    TooLong(usize),

    #[error("Node ID cannot contain whitespace")]
    Whitespace,
}

const MAX_NODE_ID_LENGTH: usize = 64;

/// Stable identifier of a peer process. Generated as a UUID v4.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Result<Self, NodeIdError> {
        let id = id.into();

        if id.is_empty() {
            return Err(NodeIdError::Empty);
        }

        if id.len() > MAX_NODE_ID_LENGTH {
            return Err(NodeIdError::TooLong(MAX_NODE_ID_LENGTH));
        }

        if id.chars().any(char::is_whitespace) {
            return Err(NodeIdError::Whitespace);
        }

        Ok(Self(id))
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NodeId {
    type Error = NodeIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The local node. `node_id` never changes once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    node_id: NodeId,
    display_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Node {
    pub fn new(display_name: impl Into<String>) -> Result<Self, TeamValidationError> {
        let display_name = display_name.into();
        validate_display_name(&display_name)?;
        let now = Utc::now();

        Ok(Self {
            node_id: NodeId::generate(),
            display_name,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn rename(&mut self, display_name: impl Into<String>) -> Result<(), TeamValidationError> {
        let display_name = display_name.into();
        validate_display_name(&display_name)?;
        self.display_name = display_name;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
