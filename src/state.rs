//! Application state: scenario catalog, prompt templates, scoring policy and
//! the optional OpenAI client.
//!
//! Everything here is immutable after startup. Per-session mutable state
//! lives in `session::InterviewSession`, exclusively owned by its WebSocket
//! connection — there is no process-wide session table.

use tracing::{info, instrument};

use crate::catalog::ScenarioCatalog;
use crate::config::{load_agent_config_from_env, Prompts};
use crate::openai::OpenAI;
use crate::score::ClampPolicy;

#[derive(Clone)]
pub struct AppState {
    pub catalog: ScenarioCatalog,
    pub prompts: Prompts,
    pub clamp: ClampPolicy,
    pub openai: Option<OpenAI>,
}

impl AppState {
    /// Build state from env: load config, build the catalog, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_agent_config_from_env().unwrap_or_default();
        let prompts = cfg.prompts.clone();
        let clamp = ClampPolicy { min: cfg.scoring.clamp_min, max: cfg.scoring.clamp_max };
        if clamp.min.is_some() || clamp.max.is_some() {
            info!(target: "interview", ?clamp, "Score clamp policy enabled");
        }

        let catalog = ScenarioCatalog::build(&cfg.scenarios);

        let openai = OpenAI::from_env();
        match &openai {
            Some(oa) => {
                info!(target: "mianshi_backend", base_url = %oa.base_url, fast_model = %oa.fast_model, strong_model = %oa.strong_model, "OpenAI enabled.");
            }
            None => {
                info!(target: "mianshi_backend", "OpenAI disabled (no OPENAI_API_KEY). Turns will fail with an error notification.");
            }
        }

        Self { catalog, prompts, clamp, openai }
    }
}
