//! Prompt library for the pipelines
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/nexus/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Each prompt is Markdown with YAML frontmatter and `# System` / `# User`
//! sections. The user section is a template: `{{var}}` is substituted and
//! `{{#if var}}...{{/if}}` blocks are dropped when `var` is missing or empty.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::RwLock;

use serde::Deserialize;

use crate::ai::TaskKind;
use crate::error::{Error, Result};

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const BUDGET_ANALYSIS: &str = include_str!("../../../prompts/budget_analysis.md");
    pub const CASH_FLOW_FORECAST: &str = include_str!("../../../prompts/cash_flow_forecast.md");
    pub const IDENTIFY_PRODUCT: &str = include_str!("../../../prompts/identify_product.md");
    pub const PURCHASE_ADVICE: &str = include_str!("../../../prompts/purchase_advice.md");
    pub const FINANCIAL_NARRATIVE: &str =
        include_str!("../../../prompts/financial_narrative.md");
    pub const QUICK_WIN: &str = include_str!("../../../prompts/quick_win.md");
    pub const EXTRACT_STATEMENT: &str = include_str!("../../../prompts/extract_statement.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    BudgetAnalysis,
    CashFlowForecast,
    /// Product name, price and category from a photo
    IdentifyProduct,
    PurchaseAdvice,
    FinancialNarrative,
    QuickWin,
    /// Transaction text from a bank statement document
    ExtractStatement,
}

impl PromptId {
    /// Get the string identifier for this prompt
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BudgetAnalysis => "budget_analysis",
            Self::CashFlowForecast => "cash_flow_forecast",
            Self::IdentifyProduct => "identify_product",
            Self::PurchaseAdvice => "purchase_advice",
            Self::FinancialNarrative => "financial_narrative",
            Self::QuickWin => "quick_win",
            Self::ExtractStatement => "extract_statement",
        }
    }

    /// Get all known prompt IDs
    pub fn all() -> &'static [PromptId] {
        &[
            Self::BudgetAnalysis,
            Self::CashFlowForecast,
            Self::IdentifyProduct,
            Self::PurchaseAdvice,
            Self::FinancialNarrative,
            Self::QuickWin,
            Self::ExtractStatement,
        ]
    }

    /// Get the default embedded content for this prompt
    fn default_content(&self) -> &'static str {
        match self {
            Self::BudgetAnalysis => defaults::BUDGET_ANALYSIS,
            Self::CashFlowForecast => defaults::CASH_FLOW_FORECAST,
            Self::IdentifyProduct => defaults::IDENTIFY_PRODUCT,
            Self::PurchaseAdvice => defaults::PURCHASE_ADVICE,
            Self::FinancialNarrative => defaults::FINANCIAL_NARRATIVE,
            Self::QuickWin => defaults::QUICK_WIN,
            Self::ExtractStatement => defaults::EXTRACT_STATEMENT,
        }
    }
}

impl FromStr for PromptId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| Error::InvalidData(format!("Unknown prompt: {}", s)))
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    /// Unique identifier
    pub id: String,
    /// Version number for tracking changes
    pub version: u32,
    /// Task kind the prompt is routed as (reasoning, conversation, multimodal, search)
    pub task_type: String,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    /// Metadata from frontmatter
    pub metadata: PromptMetadata,
    /// The prompt content (system + user sections)
    pub content: String,
    /// Whether this came from an override file
    pub is_override: bool,
    /// Path to override file (if any)
    pub override_path: Option<PathBuf>,
}

impl Prompt {
    /// Get the system section of the prompt
    pub fn system_section(&self) -> Option<&str> {
        extract_section(&self.content, "# System")
    }

    /// Get the user section of the prompt
    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// Task kind from the frontmatter, if it names one
    pub fn task_kind(&self) -> Option<TaskKind> {
        TaskKind::from_str(&self.metadata.task_type).ok()
    }

    /// Render the prompt with template variables replaced
    pub fn render(&self, vars: &HashMap<&str, &str>) -> String {
        render_template(&self.content, vars)
    }

    /// Render just the user section with variables
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        match self.user_section() {
            Some(user) => render_template(user, vars),
            None => self.render(vars),
        }
    }

    /// System section, or an empty string when the prompt has none
    pub fn system(&self) -> &str {
        self.system_section().unwrap_or_default()
    }
}

fn render_template(template: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let pattern = format!("{{{{{}}}}}", key);
        result = result.replace(&pattern, value);
    }
    remove_unmatched_conditionals(&result, vars)
}

/// Prompt library for loading and caching prompts
///
/// Shared read-only by every clone of the orchestrator; the cache sits
/// behind a lock so lookups only need `&self`.
pub struct PromptLibrary {
    /// Override directory path
    override_dir: Option<PathBuf>,
    /// Cached parsed prompts
    cache: RwLock<HashMap<PromptId, Prompt>>,
}

impl PromptLibrary {
    /// Create a new prompt library with default paths
    pub fn new() -> Self {
        Self {
            override_dir: default_prompts_dir(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Create a prompt library with a custom override directory
    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Create a prompt library with no override directory (embedded only)
    pub fn embedded_only() -> Self {
        Self {
            override_dir: None,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Get a prompt by ID, loading from override or default
    pub fn get(&self, id: PromptId) -> Result<Prompt> {
        if let Some(prompt) = self
            .cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
        {
            return Ok(prompt.clone());
        }

        let prompt = self.load(id)?;
        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, prompt.clone());
        Ok(prompt)
    }

    /// Load a prompt (checking override first, then default)
    fn load(&self, id: PromptId) -> Result<Prompt> {
        if let Some(override_path) = self.override_path(id) {
            if override_path.exists() {
                let content = fs::read_to_string(&override_path).map_err(|e| {
                    Error::InvalidData(format!("Failed to read prompt override: {}", e))
                })?;
                let (metadata, body) = parse_prompt(&content)?;
                return Ok(Prompt {
                    metadata,
                    content: body,
                    is_override: true,
                    override_path: Some(override_path),
                });
            }
        }

        let (metadata, body) = parse_prompt(id.default_content())?;
        Ok(Prompt {
            metadata,
            content: body,
            is_override: false,
            override_path: None,
        })
    }

    /// List all prompts with their override status
    pub fn list(&self) -> Vec<PromptInfo> {
        PromptId::all()
            .iter()
            .map(|&id| {
                let has_override = self.has_override(id);
                let prompt = self.get(id).ok();
                PromptInfo {
                    id: id.as_str().to_string(),
                    version: prompt.as_ref().map(|p| p.metadata.version).unwrap_or(0),
                    task_type: prompt
                        .map(|p| p.metadata.task_type)
                        .unwrap_or_default(),
                    has_override,
                    override_path: if has_override {
                        self.override_path(id)
                    } else {
                        None
                    },
                }
            })
            .collect()
    }

    /// Check if a prompt has an override file
    pub fn has_override(&self, id: PromptId) -> bool {
        self.override_path(id).is_some_and(|p| p.exists())
    }

    fn override_path(&self, id: PromptId) -> Option<PathBuf> {
        self.override_dir
            .as_ref()
            .map(|d| d.join(format!("{}.md", id.as_str())))
    }

    /// Get the override directory path
    pub fn override_dir(&self) -> Option<&PathBuf> {
        self.override_dir.as_ref()
    }

    /// Clear the cache (useful after editing override files)
    pub fn clear_cache(&self) {
        self.cache.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Information about a prompt for listing
#[derive(Debug, Clone)]
pub struct PromptInfo {
    /// Prompt identifier
    pub id: String,
    /// Version from metadata
    pub version: u32,
    /// Task kind the prompt is routed as
    pub task_type: String,
    /// Whether an override exists
    pub has_override: bool,
    /// Path to override file (if exists)
    pub override_path: Option<PathBuf>,
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("nexus").join("prompts").join("overrides"))
}

/// Parse a prompt file into metadata and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();

    if !content.starts_with("---") {
        return Err(Error::InvalidData(
            "Prompt must start with YAML frontmatter (---)".into(),
        ));
    }

    let rest = &content[3..];
    let end = rest.find("---").ok_or_else(|| {
        Error::InvalidData("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let frontmatter = rest[..end].trim();
    let body = rest[end + 3..].trim();

    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;

    Ok((metadata, body.to_string()))
}

/// Extract a section from the prompt content
fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];

    // Runs to the next top-level header or the end
    let end = after_header.find("\n# ").unwrap_or(after_header.len());

    Some(after_header[..end].trim())
}

/// Resolve `{{#if var}}...{{/if}}` blocks
fn remove_unmatched_conditionals(content: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = content.to_string();

    loop {
        if let Some(if_start) = result.find("{{#if ") {
            let var_start = if_start + 6;
            if let Some(var_end) = result[var_start..].find("}}") {
                let var_name = &result[var_start..var_start + var_end];
                let block_start = var_start + var_end + 2;

                if let Some(endif_pos) = result[block_start..].find("{{/if}}") {
                    let block_content = &result[block_start..block_start + endif_pos];
                    let full_end = block_start + endif_pos + 7;

                    let should_include = vars.get(var_name).is_some_and(|v| !v.is_empty());

                    result = if should_include {
                        format!(
                            "{}{}{}",
                            &result[..if_start],
                            block_content,
                            &result[full_end..]
                        )
                    } else {
                        format!("{}{}", &result[..if_start], &result[full_end..])
                    };
                    continue;
                }
            }
        }
        break;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prompt() {
        let content = r#"---
id: test_prompt
version: 1
task_type: reasoning
---

# System
Test system prompt.

# User
Test user prompt with {{variable}}.
"#;

        let (metadata, body) = parse_prompt(content).unwrap();
        assert_eq!(metadata.id, "test_prompt");
        assert_eq!(metadata.version, 1);
        assert_eq!(metadata.task_type, "reasoning");
        assert!(body.contains("# System"));
        assert!(body.contains("# User"));
    }

    #[test]
    fn test_parse_prompt_requires_frontmatter() {
        assert!(parse_prompt("# System\nNo frontmatter").is_err());
        assert!(parse_prompt("---\nid: x\n# System").is_err());
    }

    #[test]
    fn test_extract_section() {
        let content = r#"# System
System content here.

# User
User content here."#;

        assert_eq!(
            extract_section(content, "# System"),
            Some("System content here.")
        );
        assert_eq!(
            extract_section(content, "# User"),
            Some("User content here.")
        );
    }

    #[test]
    fn test_render_user_with_conditionals() {
        let prompt = Prompt {
            metadata: PromptMetadata {
                id: "t".into(),
                version: 1,
                task_type: "conversation".into(),
            },
            content: "# System\nBe kind.\n\n# User\nRate: {{rate}}%{{#if anomalies}}\nAnomalies: {{anomalies}}{{/if}}".into(),
            is_override: false,
            override_path: None,
        };

        let mut vars = HashMap::new();
        vars.insert("rate", "42.0");
        assert_eq!(prompt.render_user(&vars), "Rate: 42.0%");
        assert_eq!(prompt.system(), "Be kind.");
        assert_eq!(prompt.task_kind(), Some(TaskKind::Conversation));

        vars.insert("anomalies", "Coffee");
        assert_eq!(prompt.render_user(&vars), "Rate: 42.0%\nAnomalies: Coffee");
    }

    #[test]
    fn test_conditional_blocks() {
        let content = "Start{{#if category}}\nCategory: {{category}}{{/if}}\nEnd";

        let mut vars = HashMap::new();
        vars.insert("category", "Groceries");
        let result = remove_unmatched_conditionals(content, &vars);
        assert!(result.contains("Category: {{category}}"));

        let empty_vars: HashMap<&str, &str> = HashMap::new();
        let result = remove_unmatched_conditionals(content, &empty_vars);
        assert!(!result.contains("Category:"));
        assert!(result.contains("Start"));
        assert!(result.contains("End"));
    }

    #[test]
    fn test_prompt_library_embedded() {
        let lib = PromptLibrary::embedded_only();

        for id in PromptId::all() {
            let prompt = lib.get(*id).unwrap();
            assert!(!prompt.is_override);
            assert!(prompt.override_path.is_none());
            assert!(prompt.system_section().is_some(), "{} has no system", id.as_str());
            assert!(prompt.user_section().is_some(), "{} has no user", id.as_str());
            assert!(prompt.task_kind().is_some(), "{} has bad task_type", id.as_str());
        }
    }

    #[test]
    fn test_default_prompts_parse() {
        for id in PromptId::all() {
            let result = parse_prompt(id.default_content());
            assert!(
                result.is_ok(),
                "Failed to parse {}: {:?}",
                id.as_str(),
                result.err()
            );

            let (metadata, _) = result.unwrap();
            assert_eq!(metadata.id, id.as_str(), "Prompt ID mismatch for {}", id.as_str());
        }
    }

    #[test]
    fn test_prompt_id_from_str() {
        assert_eq!("quick_win".parse::<PromptId>().unwrap(), PromptId::QuickWin);
        assert!("classify_merchant".parse::<PromptId>().is_err());
    }

    #[test]
    fn test_override_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("quick_win.md"),
            "---\nid: quick_win\nversion: 7\ntask_type: conversation\n---\n\n# System\nCustom coach.\n\n# User\nTip for {{category}}",
        )
        .unwrap();

        let lib = PromptLibrary::with_override_dir(dir.path().to_path_buf());
        let prompt = lib.get(PromptId::QuickWin).unwrap();
        assert!(prompt.is_override);
        assert_eq!(prompt.metadata.version, 7);
        assert_eq!(prompt.system(), "Custom coach.");
        assert!(lib.has_override(PromptId::QuickWin));
        assert!(!lib.has_override(PromptId::BudgetAnalysis));

        let listed = lib.list();
        let quick = listed.iter().find(|p| p.id == "quick_win").unwrap();
        assert!(quick.has_override);
        assert_eq!(quick.version, 7);
        assert_eq!(listed.len(), PromptId::all().len());
    }
}
