//! Configuration for the analysis pipeline
//!
//! Loads per-project configuration from a `pymend.toml` file. Every
//! heuristic table (dangerous function names, severity thresholds, rewrite
//! toggles) lives here and is established once at startup, then passed by
//! shared reference through the pipeline; no ambient mutable state.
//!
//! # Configuration Format
//!
//! ```toml
//! # pymend.toml
//!
//! [rules]
//! critical_functions = ["eval", "exec"]
//! dangerous_modules = ["os", "subprocess"]
//! max_parameters = 5
//!
//! [repair]
//! max_attempts = 5
//! tab_width = 4
//! close_brackets = true
//!
//! [rewrite]
//! insert_docstrings = true
//! prune_dead_branches = true
//! normalize_casing = true
//! drop_unused_imports = true
//!
//! [collaborators]
//! formatter = ["black", "-q", "-"]
//! import_sorter = ["isort", "-"]
//! timeout_secs = 10
//!
//! [semantic]
//! enabled = false
//! backend = "anthropic"
//! ```

use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// Default config file name searched for in the working directory
pub const CONFIG_FILE_NAME: &str = "pymend.toml";

/// Immutable pipeline configuration, threaded through every component
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub repair: RepairConfig,
    #[serde(default)]
    pub rewrite: RewriteConfig,
    #[serde(default)]
    pub collaborators: CollaboratorsConfig,
    #[serde(default)]
    pub semantic: SemanticConfig,
}

/// Thresholds and name tables for the diagnostic rules
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
    /// Dynamic-execution primitives flagged as dangerous calls
    #[serde(default = "default_critical_functions")]
    pub critical_functions: Vec<String>,
    /// Modules whose attribute usage is flagged
    #[serde(default = "default_dangerous_modules")]
    pub dangerous_modules: Vec<String>,
    /// Maximum positional parameters before a function is flagged
    #[serde(default = "default_max_parameters")]
    pub max_parameters: usize,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            critical_functions: default_critical_functions(),
            dangerous_modules: default_dangerous_modules(),
            max_parameters: default_max_parameters(),
        }
    }
}

/// Normalizer and repair-loop settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepairConfig {
    /// Repair loop attempt budget
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Spaces per expanded tab
    #[serde(default = "default_tab_width")]
    pub tab_width: usize,
    /// Enable the low-confidence bracket-closing fix
    #[serde(default = "default_true")]
    pub close_brackets: bool,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            tab_width: default_tab_width(),
            close_brackets: true,
        }
    }
}

/// Per-rewrite toggles; each structural mutation is independently switchable
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewriteConfig {
    #[serde(default = "default_true")]
    pub insert_docstrings: bool,
    #[serde(default = "default_true")]
    pub prune_dead_branches: bool,
    #[serde(default = "default_true")]
    pub normalize_casing: bool,
    #[serde(default = "default_true")]
    pub drop_unused_imports: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            insert_docstrings: true,
            prune_dead_branches: true,
            normalize_casing: true,
            drop_unused_imports: true,
        }
    }
}

/// External formatter / import sorter commands.
///
/// Empty argv means the collaborator is disabled. Commands receive the
/// corrected source on stdin and must write the result to stdout.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollaboratorsConfig {
    #[serde(default)]
    pub formatter: Vec<String>,
    #[serde(default)]
    pub import_sorter: Vec<String>,
    #[serde(default = "default_collab_timeout")]
    pub timeout_secs: u64,
}

impl Default for CollaboratorsConfig {
    fn default() -> Self {
        Self {
            formatter: Vec::new(),
            import_sorter: Vec::new(),
            timeout_secs: default_collab_timeout(),
        }
    }
}

/// LLM semantic-commentary settings (BYOK via environment variables)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SemanticConfig {
    #[serde(default)]
    pub enabled: bool,
    /// "anthropic", "openai", or "ollama"
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Override the backend's default model
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_semantic_timeout")]
    pub timeout_secs: u64,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: default_backend(),
            model: None,
            timeout_secs: default_semantic_timeout(),
        }
    }
}

fn default_critical_functions() -> Vec<String> {
    vec!["eval".to_string(), "exec".to_string()]
}

fn default_dangerous_modules() -> Vec<String> {
    vec!["os".to_string(), "subprocess".to_string()]
}

fn default_max_parameters() -> usize {
    5
}

fn default_max_attempts() -> usize {
    5
}

fn default_tab_width() -> usize {
    4
}

fn default_collab_timeout() -> u64 {
    10
}

fn default_semantic_timeout() -> u64 {
    60
}

fn default_backend() -> String {
    "anthropic".to_string()
}

fn default_true() -> bool {
    true
}

/// Load configuration from an explicit path, or fall back to defaults.
///
/// A missing file is normal (defaults apply); a file that fails to parse
/// is reported and ignored rather than aborting the run.
pub fn load_config(path: Option<&Path>) -> AnalyzerConfig {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => Path::new(CONFIG_FILE_NAME).to_path_buf(),
    };

    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(_) => {
            debug!("no config file at {}, using defaults", path.display());
            return AnalyzerConfig::default();
        }
    };

    match toml::from_str::<AnalyzerConfig>(&content) {
        Ok(config) => {
            debug!("loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("failed to parse {}: {e}; using defaults", path.display());
            AnalyzerConfig::default()
        }
    }
}

/// Starter config written by `pymend init`
pub const EXAMPLE_CONFIG: &str = r#"# pymend configuration

[rules]
critical_functions = ["eval", "exec"]
dangerous_modules = ["os", "subprocess"]
max_parameters = 5

[repair]
max_attempts = 5
tab_width = 4
# The bracket-closing fix is a low-confidence heuristic; disable it here
# if it causes more harm than good on your codebase.
close_brackets = true

[rewrite]
insert_docstrings = true
prune_dead_branches = true
normalize_casing = true
drop_unused_imports = true

[collaborators]
# External commands receive source on stdin and write the result to stdout.
# Leave empty to disable.
# formatter = ["black", "-q", "-"]
# import_sorter = ["isort", "-"]
timeout_secs = 10

[semantic]
# Free-text commentary from an LLM. Requires ANTHROPIC_API_KEY or
# OPENAI_API_KEY depending on backend.
enabled = false
backend = "anthropic"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.rules.critical_functions, vec!["eval", "exec"]);
        assert_eq!(config.rules.max_parameters, 5);
        assert_eq!(config.repair.max_attempts, 5);
        assert!(config.rewrite.insert_docstrings);
        assert!(!config.semantic.enabled);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: AnalyzerConfig = toml::from_str(
            r#"
            [rules]
            max_parameters = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.rules.max_parameters, 8);
        assert_eq!(config.rules.critical_functions, vec!["eval", "exec"]);
        assert_eq!(config.repair.tab_width, 4);
    }

    #[test]
    fn example_config_parses() {
        let config: AnalyzerConfig = toml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config.collaborators.timeout_secs, 10);
        assert!(config.collaborators.formatter.is_empty());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Some(Path::new("/nonexistent/pymend.toml")));
        assert_eq!(config.repair.max_attempts, 5);
    }
}
