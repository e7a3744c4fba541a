//! Unit module - the atomic inputs consumed one per engine turn

use serde::{Deserialize, Serialize};

/// A document or excerpt to extract information from
///
/// Materials are read in the order they are supplied. The source is shown to
/// the model alongside the content so it can attribute what it extracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    /// Raw text of the material
    pub content: String,

    /// Where the material came from (file name, URL, document id)
    #[serde(default)]
    pub source: String,
}

impl Material {
    /// Create a new material
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
        }
    }
}

/// A named policy rule to check against some context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule name, echoed back in the verdict
    pub name: String,

    /// Rule text
    pub content: String,
}

impl Rule {
    /// Create a new rule
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}
