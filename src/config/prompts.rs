//! Prompt templates for Svar.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub query: QueryPrompts,
}

/// Prompt for answering a question against retrieved context.
///
/// The template receives two variables: `{{context}}` (retrieved chunk
/// contents joined by the context separator) and `{{question}}` (the user's
/// question verbatim).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryPrompts {
    pub template: String,
}

impl Default for QueryPrompts {
    fn default() -> Self {
        Self {
            template: r#"Answer the question based only on the following context:

{{context}}

---

Answer the question based on the above context: {{question}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from defaults, overridden by files in the custom directory.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

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
}
