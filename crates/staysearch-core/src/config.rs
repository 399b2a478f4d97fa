//! Environment-driven configuration.
//!
//! | Variable                   | Meaning                                       |
//! |----------------------------|-----------------------------------------------|
//! | `LLM_DEPLOYMENT_ID`        | model or deployment identifier (required)     |
//! | `LLM_PROVIDER`             | `openai` (default) or `azure`                 |
//! | `LLM_API_KEY`              | API key; provider-specific fallbacks apply    |
//! | `LLM_API_BASE_URL`         | endpoint override (required for `azure`)      |
//! | `STAYSEARCH_MCP_CONFIG`    | MCP descriptor path (default `airbnb_mcp.json`)|
//! | `STAYSEARCH_MAX_STEPS`     | agent step budget (default 30)                |
//! | `STAYSEARCH_SYSTEM_PROMPT` | replaces the built-in system prompt           |

use std::path::{Path, PathBuf};

use staysearch_agent::{LlmClientConfig, LlmProvider};

use crate::error::{Result, SearchError};

pub const DEFAULT_DESCRIPTOR: &str = "airbnb_mcp.json";
pub const DEFAULT_MAX_STEPS: u32 = 30;

/// Validated settings for one search agent.  Immutable once loaded.
#[derive(Clone)]
pub struct SearchConfig {
    pub deployment_id: String,
    pub provider: LlmProvider,
    pub api_key: String,
    pub api_base_url: Option<String>,
    pub descriptor_path: PathBuf,
    pub max_steps: u32,
    pub system_prompt: Option<String>,
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("deployment_id", &self.deployment_id)
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("descriptor_path", &self.descriptor_path)
            .field("max_steps", &self.max_steps)
            .field("system_prompt", &self.system_prompt.is_some())
            .finish()
    }
}

impl SearchConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|name| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        })
    }

    /// Build from an arbitrary variable source.  Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let deployment_id = lookup("LLM_DEPLOYMENT_ID").ok_or_else(|| configuration(
            "LLM_DEPLOYMENT_ID is not set",
        ))?;

        let provider = match lookup("LLM_PROVIDER").as_deref() {
            None | Some("openai") => LlmProvider::OpenAi,
            Some("azure") => LlmProvider::AzureOpenAi,
            Some(other) => {
                return Err(configuration(format!(
                    "unknown LLM_PROVIDER `{other}` (expected `openai` or `azure`)"
                )));
            }
        };

        let fallback_key = match provider {
            LlmProvider::OpenAi => "OPENAI_API_KEY",
            LlmProvider::AzureOpenAi => "AZURE_OPENAI_API_KEY",
        };
        let api_key = lookup("LLM_API_KEY")
            .or_else(|| lookup(fallback_key))
            .ok_or_else(|| {
                configuration(format!("no API key: set LLM_API_KEY or {fallback_key}"))
            })?;

        let api_base_url = lookup("LLM_API_BASE_URL");
        if provider == LlmProvider::AzureOpenAi && api_base_url.is_none() {
            return Err(configuration("LLM_API_BASE_URL is required for the azure provider"));
        }

        let max_steps = match lookup("STAYSEARCH_MAX_STEPS") {
            None => DEFAULT_MAX_STEPS,
            Some(raw) => match raw.parse::<u32>() {
                Ok(0) | Err(_) => {
                    return Err(configuration(format!(
                        "STAYSEARCH_MAX_STEPS must be a positive integer, got `{raw}`"
                    )));
                }
                Ok(n) => n,
            },
        };

        let descriptor = lookup("STAYSEARCH_MCP_CONFIG").unwrap_or_else(|| DEFAULT_DESCRIPTOR.into());
        let descriptor_path = resolve_descriptor(Path::new(&descriptor))?;

        Ok(Self {
            deployment_id,
            provider,
            api_key,
            api_base_url,
            descriptor_path,
            max_steps,
            system_prompt: lookup("STAYSEARCH_SYSTEM_PROMPT"),
        })
    }

    /// Settings for the LLM client.
    pub fn llm_config(&self) -> LlmClientConfig {
        match (&self.provider, &self.api_base_url) {
            (LlmProvider::AzureOpenAi, Some(base)) => {
                LlmClientConfig::azure(&self.api_key, &self.deployment_id, base)
            }
            (_, Some(base)) => {
                LlmClientConfig::openai_compatible(&self.api_key, &self.deployment_id, base)
            }
            (_, None) => LlmClientConfig::openai(&self.api_key, &self.deployment_id),
        }
    }
}

fn configuration(reason: impl Into<String>) -> SearchError {
    SearchError::Configuration {
        reason: reason.into(),
    }
}

/// Find the descriptor file.
///
/// Relative paths are tried next to the executable first, then against the
/// working directory.
pub fn resolve_descriptor(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(configuration(format!(
                "MCP descriptor not found: {}",
                path.display()
            )))
        };
    }

    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let cwd = std::env::current_dir().ok();

    exe_dir
        .into_iter()
        .chain(cwd)
        .map(|dir| dir.join(path))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            configuration(format!(
                "MCP descriptor `{}` not found next to the executable or in the working directory",
                path.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn descriptor() -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"mcpServers": {"airbnb": {"command": "npx"}}}"#).unwrap();
        file
    }

    fn load(vars: &[(&str, &str)]) -> Result<SearchConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SearchConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn minimal_openai_config() {
        let file = descriptor();
        let path = file.path().to_str().unwrap();
        let config = load(&[
            ("LLM_DEPLOYMENT_ID", "gpt-4o"),
            ("OPENAI_API_KEY", "sk-test"),
            ("STAYSEARCH_MCP_CONFIG", path),
        ])
        .unwrap();

        assert_eq!(config.deployment_id, "gpt-4o");
        assert_eq!(config.provider, LlmProvider::OpenAi);
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(config.descriptor_path, file.path());
        assert!(config.system_prompt.is_none());

        let llm = config.llm_config();
        assert_eq!(llm.default_model, "gpt-4o");
        assert_eq!(llm.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn azure_requires_base_url() {
        let file = descriptor();
        let path = file.path().to_str().unwrap();
        let base = [
            ("LLM_DEPLOYMENT_ID", "search-gpt"),
            ("LLM_PROVIDER", "azure"),
            ("AZURE_OPENAI_API_KEY", "k"),
            ("STAYSEARCH_MCP_CONFIG", path),
        ];
        assert!(matches!(load(&base), Err(SearchError::Configuration { .. })));

        let mut with_url = base.to_vec();
        with_url.push(("LLM_API_BASE_URL", "https://example.openai.azure.com"));
        let config = load(&with_url).unwrap();
        assert_eq!(config.llm_config().provider, LlmProvider::AzureOpenAi);
    }

    #[test]
    fn missing_deployment_or_key_is_configuration_error() {
        let file = descriptor();
        let path = file.path().to_str().unwrap();

        let err = load(&[("OPENAI_API_KEY", "k"), ("STAYSEARCH_MCP_CONFIG", path)]).unwrap_err();
        assert!(err.to_string().contains("LLM_DEPLOYMENT_ID"));

        let err = load(&[("LLM_DEPLOYMENT_ID", "m"), ("STAYSEARCH_MCP_CONFIG", path)]).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn max_steps_must_be_positive_integer() {
        let file = descriptor();
        let path = file.path().to_str().unwrap();
        let with_steps = |steps| {
            load(&[
                ("LLM_DEPLOYMENT_ID", "m"),
                ("LLM_API_KEY", "k"),
                ("STAYSEARCH_MCP_CONFIG", path),
                ("STAYSEARCH_MAX_STEPS", steps),
            ])
        };
        assert_eq!(with_steps("12").unwrap().max_steps, 12);
        assert!(with_steps("0").is_err());
        assert!(with_steps("lots").is_err());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = load(&[
            ("LLM_DEPLOYMENT_ID", "m"),
            ("LLM_API_KEY", "k"),
            ("LLM_PROVIDER", "carrier-pigeon"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[test]
    fn missing_descriptor_is_configuration_error() {
        let err = resolve_descriptor(Path::new("/no/such/dir/airbnb_mcp.json")).unwrap_err();
        assert!(matches!(err, SearchError::Configuration { .. }));

        let err = resolve_descriptor(Path::new("staysearch-no-such-descriptor.json")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
