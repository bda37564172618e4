//! Build decision providers from configuration

use tracing::{info, warn};

use crate::config::AgentSpec;
use crate::error::{ArenaError, Result};

use super::llm::{LlmAgent, LlmConfig};
use super::momentum::MomentumAgent;
use super::traits::DecisionProvider;

/// Known strategy kinds and what they are
pub const AGENT_KINDS: &[(&str, &str)] = &[
    ("momentum", "Randomized 24h-momentum heuristic with take-profit/stop-loss"),
    ("openai", "OpenAI chat-completions model"),
    ("deepseek", "DeepSeek chat model (OpenAI-compatible API)"),
    (
        "openai_compatible",
        "Any OpenAI-compatible chat endpoint (base_url required)",
    ),
];

struct LlmDefaults {
    base_url: Option<&'static str>,
    model: &'static str,
    api_key_env: &'static str,
}

fn llm_defaults(kind: &str) -> Option<LlmDefaults> {
    match kind {
        "openai" => Some(LlmDefaults {
            base_url: Some("https://api.openai.com/v1"),
            model: "gpt-4o-mini",
            api_key_env: "OPENAI_API_KEY",
        }),
        "deepseek" => Some(LlmDefaults {
            base_url: Some("https://api.deepseek.com/v1"),
            model: "deepseek-chat",
            api_key_env: "DEEPSEEK_API_KEY",
        }),
        "openai_compatible" => Some(LlmDefaults {
            base_url: None,
            model: "default",
            api_key_env: "LLM_API_KEY",
        }),
        _ => None,
    }
}

/// Assigns `agent_<n>` ids in registration order
pub struct AgentRegistry<F> {
    next_id: usize,
    env: F,
}

impl AgentRegistry<fn(&str) -> Option<String>> {
    /// Registry that reads API keys from the process environment
    pub fn from_env() -> Self {
        Self::with_env(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }
}

impl<F> AgentRegistry<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn with_env(env: F) -> Self {
        Self { next_id: 0, env }
    }

    /// Build every enabled spec, expanding `count`
    pub fn build_all(&mut self, specs: &[AgentSpec]) -> Result<Vec<Box<dyn DecisionProvider>>> {
        let mut providers = Vec::new();
        for spec in specs.iter().filter(|s| s.enabled) {
            for copy in 0..spec.count {
                let name = if spec.count > 1 {
                    format!("{}-{}", spec.name, copy + 1)
                } else {
                    spec.name.clone()
                };
                providers.push(self.build(spec, &name)?);
            }
        }
        Ok(providers)
    }

    /// Build one provider named `name` from `spec`
    pub fn build(&mut self, spec: &AgentSpec, name: &str) -> Result<Box<dyn DecisionProvider>> {
        let kind = spec.kind.trim().to_ascii_lowercase();

        if kind == "momentum" {
            let id = self.next_agent_id();
            let agent = match spec.seed {
                Some(seed) => MomentumAgent::seeded(&id, name, seed),
                None => MomentumAgent::new(&id, name),
            };
            info!(agent_id = %id, %name, "registered momentum agent");
            return Ok(Box::new(agent));
        }

        let defaults = llm_defaults(&kind).ok_or_else(|| {
            ArenaError::InvalidConfig(format!("unknown agent kind '{}'", spec.kind))
        })?;
        let base_url = spec
            .base_url
            .clone()
            .or_else(|| defaults.base_url.map(str::to_string))
            .ok_or_else(|| {
                ArenaError::InvalidConfig(format!("agent '{}' needs a base_url", spec.name))
            })?;
        let key_env = spec
            .api_key_env
            .clone()
            .unwrap_or_else(|| defaults.api_key_env.to_string());
        let id = self.next_agent_id();

        match (self.env)(&key_env) {
            Some(api_key) => {
                let model = spec.model.as_deref().unwrap_or(defaults.model);
                let agent =
                    LlmAgent::new(&id, name, &kind, LlmConfig::new(&api_key, &base_url, model))?;
                info!(agent_id = %id, %name, %kind, %model, "registered LLM agent");
                Ok(Box::new(agent))
            }
            None => {
                let fallback_name = format!("{}-Simulated", name);
                warn!(
                    agent_id = %id,
                    %name,
                    env = %key_env,
                    "API key missing, registering momentum agent instead"
                );
                let agent = match spec.seed {
                    Some(seed) => MomentumAgent::seeded(&id, &fallback_name, seed),
                    None => MomentumAgent::new(&id, &fallback_name),
                };
                Ok(Box::new(agent))
            }
        }
    }

    fn next_agent_id(&mut self) -> String {
        self.next_id += 1;
        format!("agent_{}", self.next_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_keys(_: &str) -> Option<String> {
        None
    }

    fn llm_spec(kind: &str, name: &str) -> AgentSpec {
        let mut spec = AgentSpec::momentum(name);
        spec.kind = kind.to_string();
        spec
    }

    #[test]
    fn ids_follow_registration_order() {
        let mut registry = AgentRegistry::with_env(no_keys);
        let mut many = AgentSpec::momentum("Swarm");
        many.count = 2;
        let mut disabled = AgentSpec::momentum("Off");
        disabled.enabled = false;

        let agents = registry
            .build_all(&[AgentSpec::momentum("Solo"), disabled, many])
            .unwrap();
        let ids: Vec<&str> = agents.iter().map(|a| a.id()).collect();
        let names: Vec<&str> = agents.iter().map(|a| a.name()).collect();
        assert_eq!(ids, vec!["agent_1", "agent_2", "agent_3"]);
        assert_eq!(names, vec!["Solo", "Swarm-1", "Swarm-2"]);
    }

    #[test]
    fn missing_key_falls_back_to_momentum() {
        let mut registry = AgentRegistry::with_env(no_keys);
        let agent = registry
            .build(&llm_spec("deepseek", "DeepSeek"), "DeepSeek")
            .unwrap();
        assert_eq!(agent.kind(), "momentum");
        assert_eq!(agent.name(), "DeepSeek-Simulated");
    }

    #[test]
    fn key_present_builds_llm_agent() {
        let mut registry = AgentRegistry::with_env(|key: &str| {
            (key == "OPENAI_API_KEY").then(|| "sk-test".to_string())
        });
        let agent = registry.build(&llm_spec("openai", "GPT"), "GPT").unwrap();
        assert_eq!(agent.kind(), "openai");
        assert_eq!(agent.name(), "GPT");
    }

    #[test]
    fn rejects_unknown_kind_and_missing_base_url() {
        let mut registry = AgentRegistry::with_env(no_keys);
        assert!(matches!(
            registry.build(&llm_spec("oracle", "X"), "X"),
            Err(ArenaError::InvalidConfig(_))
        ));
        assert!(matches!(
            registry.build(&llm_spec("openai_compatible", "Local"), "Local"),
            Err(ArenaError::InvalidConfig(_))
        ));
    }
}
