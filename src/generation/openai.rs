//! OpenAI chat-completion generator.

use super::TextGenerator;
use crate::config::{GenerationSettings, Prompts};
use crate::error::{PodsiftError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// Generator backed by an OpenAI chat model.
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    prompts: Prompts,
}

impl OpenAIGenerator {
    pub fn new(settings: &GenerationSettings, prompts: Prompts) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(Duration::from_secs(settings.timeout_seconds))?,
            model: settings.model.clone(),
            prompts,
        })
    }

    async fn complete(&self, system: &str, user: String) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system.to_string())
                .build()
                .map_err(|e| PodsiftError::Generation(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| PodsiftError::Generation(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .build()
            .map_err(|e| PodsiftError::Generation(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PodsiftError::OpenAI(format!("Failed to generate response: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PodsiftError::Generation("Empty response from LLM".to_string()))?;

        Ok(content)
    }
}

#[async_trait]
impl TextGenerator for OpenAIGenerator {
    #[instrument(skip(self, passages), fields(passages = passages.len()))]
    async fn explain_relevance(&self, passages: &[String], query: &str) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), passages.join(" "));
        vars.insert("query".to_string(), query.to_string());

        let user = self
            .prompts
            .render_with_custom(&self.prompts.summary.user, &vars);
        self.complete(&self.prompts.summary.system, user).await
    }

    #[instrument(skip(self))]
    async fn enhance_query(&self, query: &str) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());

        let user = self.prompts.render_with_custom(&self.prompts.query.user, &vars);
        let enhanced = self.complete(&self.prompts.query.system, user).await?;
        debug!("Enhanced query: {}", enhanced);
        Ok(enhanced)
    }
}
