use std::sync::Arc;

use crate::config::Config;
use crate::documents::DocumentParser;
use crate::llm_client::LlmClient;
use crate::scoring::CandidateScorer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    pub config: Config,
    /// Pluggable document parser. Default: HrflowParser.
    pub parser: Arc<dyn DocumentParser>,
    /// Pluggable candidate scorer. Default: ReviewedHybridScorer.
    pub scorer: Arc<dyn CandidateScorer>,
}

#[cfg(test)]
impl AppState {
    /// State with the given backends and an LLM client that is never reached.
    pub fn for_tests(parser: Arc<dyn DocumentParser>, scorer: Arc<dyn CandidateScorer>) -> Self {
        let config = Config {
            openai_api_key: "sk-test".to_string(),
            openai_base_url: "http://127.0.0.1:9".to_string(),
            hrflow: Default::default(),
            port: 0,
            rust_log: "debug".to_string(),
        };
        Self {
            llm: LlmClient::new(config.openai_api_key.clone(), config.openai_base_url.clone()),
            config,
            parser,
            scorer,
        }
    }
}
