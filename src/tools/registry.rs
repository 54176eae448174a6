// Tool registry - immutable catalog of the tools available in one session

use std::collections::HashMap;
use tracing::{info, warn};

use crate::errors::ActionError;
use crate::tools::collaborator::ToolCollaborator;
use crate::tools::types::{ToolDefinition, ToolDescriptor};

/// Catalog of tool descriptors, in listing order.
///
/// Built once by `load` and never mutated afterwards, so it can be shared
/// across concurrent requests behind an `Arc` without locking.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Populate the registry from the collaborator's listing call
    pub async fn load(collaborator: &dyn ToolCollaborator) -> Result<Self, ActionError> {
        let definitions = collaborator.list_tools().await.map_err(|e| {
            ActionError::RegistryUnavailable(format!("{}: {}", collaborator.name(), e))
        })?;

        let registry = Self::from_definitions(definitions);
        info!(
            "Loaded {} tool(s) from {}: {:?}",
            registry.len(),
            collaborator.name(),
            registry.names()
        );
        Ok(registry)
    }

    /// Build a registry from definitions. Duplicate names keep the first entry.
    pub fn from_definitions(definitions: Vec<ToolDefinition>) -> Self {
        let mut tools = Vec::with_capacity(definitions.len());
        let mut index = HashMap::new();
        for def in definitions {
            if index.contains_key(&def.name) {
                warn!("Duplicate tool '{}' in listing, keeping the first", def.name);
                continue;
            }
            index.insert(def.name.clone(), tools.len());
            tools.push(ToolDescriptor::from_definition(def));
        }
        Self { tools, index }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    /// `(name, ordered parameter names)` for prompt construction
    pub fn describe(&self) -> Vec<(String, Vec<String>)> {
        self.tools
            .iter()
            .map(|t| (t.name().to_string(), t.parameter_names()))
            .collect()
    }

    /// Numbered `name(arg, arg)` list, one tool per line
    pub fn catalog_prompt(&self) -> String {
        if self.is_empty() {
            return "No tools available.".to_string();
        }
        self.describe()
            .iter()
            .enumerate()
            .map(|(i, (name, params))| format!("{}. {}({})", i + 1, name, params.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
