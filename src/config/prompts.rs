//! Prompt templates for Podsift.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    /// Prompts explaining why a clip matches a query.
    pub summary: SummaryPrompts,
    /// Prompts rewriting a query before it is embedded.
    pub query: QueryPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for clip relevance explanations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryPrompts {
    pub system: String,
    pub user: String,
}

impl Default for SummaryPrompts {
    fn default() -> Self {
        Self {
            system: "You are a bot that helps provide short summaries of how the given podcast transcript clip is relevant to the query.".to_string(),

            user: r#"Summarize this podcast clip: {{context}} and how the conversation is relevant to the {{query}}, keep your response to 60 words or less and start with 'This clip is relevant to {{query}} because...'"#.to_string(),
        }
    }
}

/// Prompts for query enhancement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryPrompts {
    pub system: String,
    pub user: String,
}

impl Default for QueryPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a query enhancer for a podcast transcript search system.
Expand the given query to include related terms, synonyms, and contextual information relevant to podcasts.
Focus on creating a comprehensive query that captures the user's intent and related concepts.
Return only the enhanced query without any additional text but try to keep it as short as possible."#.to_string(),

            user: "Enhance this query for better search results: {{query}}".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let summary_path = custom_path.join("summary.toml");
            if summary_path.exists() {
                let content = std::fs::read_to_string(&summary_path)?;
                prompts.summary = toml::from_str(&content)?;
            }

            let query_path = custom_path.join("query.toml");
            if query_path.exists() {
                let content = std::fs::read_to_string(&query_path)?;
                prompts.query = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.summary.user.contains("{{query}}"));
        assert!(prompts.query.user.contains("{{query}}"));
    }

    #[test]
    fn test_render_with_custom_variables() {
        let mut prompts = Prompts::default();
        prompts
            .variables
            .insert("show".to_string(), "The Diary".to_string());
        prompts
            .variables
            .insert("query".to_string(), "overridden".to_string());

        let mut vars = HashMap::new();
        vars.insert("query".to_string(), "sleep".to_string());

        let rendered = prompts.render_with_custom("{{show}}: {{query}}", &vars);
        assert_eq!(rendered, "The Diary: sleep");
    }

    #[test]
    fn test_load_custom_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("query.toml"),
            "system = \"custom system\"\nuser = \"Q: {{query}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.query.system, "custom system");
        assert_eq!(prompts.summary.system, SummaryPrompts::default().system);
    }
}
