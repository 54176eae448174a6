// System prompts built from the tool catalog

use crate::tools::registry::ToolRegistry;

/// Prompt asking the model to pick one tool and answer with JSON
pub fn action_prompt(registry: &ToolRegistry) -> String {
    format!(
        "You are an expert agent with access to the following tools:\n{}\n\n\
         Based on the user's query, respond with a JSON object: \
         {{\"tool\": ..., \"params\": {{...}}}}",
        registry.catalog_prompt()
    )
}

/// Prompt asking the model to describe the catalog in prose
pub fn explain_prompt(registry: &ToolRegistry) -> String {
    format!(
        "You are an expert agent. Here are the available tools:\n{}\n\n\
         List the available tools and their arguments in a readable format.",
        registry.catalog_prompt()
    )
}

pub const EXPLAIN_QUERY: &str = "Which tools can you use?";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::types::{ToolDefinition, ToolInputSchema};

    fn registry() -> ToolRegistry {
        ToolRegistry::from_definitions(vec![ToolDefinition {
            name: "text_append".to_string(),
            description: None,
            input_schema: ToolInputSchema::from_params(&[
                ("path", "string", "", true),
                ("text", "string", "", true),
            ]),
        }])
    }

    #[test]
    fn test_action_prompt_layout() {
        let prompt = action_prompt(&registry());
        assert!(prompt.starts_with("You are an expert agent with access to the following tools:\n1. text_append(path, text)\n\n"));
        assert!(prompt.ends_with("{\"tool\": ..., \"params\": {...}}"));
    }

    #[test]
    fn test_explain_prompt_lists_catalog() {
        let prompt = explain_prompt(&registry());
        assert!(prompt.contains("1. text_append(path, text)"));
        assert!(prompt.ends_with("in a readable format."));
    }
}
