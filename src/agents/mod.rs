//! Decision providers
//!
//! - `MomentumAgent`: randomized momentum heuristic, no external calls
//! - `LlmAgent`: OpenAI-compatible chat-completions model
//! - `AgentRegistry`: builds providers from `[[agents]]` config entries

mod llm;
mod momentum;
mod registry;
mod traits;

pub use llm::{parse_decision, LlmAgent, LlmConfig, LlmDecision};
pub use momentum::MomentumAgent;
pub use registry::{AgentRegistry, AGENT_KINDS};
pub use traits::{DecisionContext, DecisionProvider};
