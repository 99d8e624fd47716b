use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use common::{
    error::AppError, storage::types::search_params::SearchParams, utils::config::AppConfig,
};
use tracing::debug;

use crate::utils::llm_instructions::{build_search_message, RESOURCE_SEARCH_SYSTEM_MESSAGE};

/// The slow external call behind a job. Returns the model's raw text; shaping
/// it into results is the worker's job.
#[async_trait]
pub trait ResourceSearcher: Send + Sync {
    async fn search(&self, params: &SearchParams) -> Result<String, AppError>;
}

pub struct OpenAiResourceSearcher {
    openai_client: Arc<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAiResourceSearcher {
    pub fn new(openai_client: Arc<Client<OpenAIConfig>>, model: impl Into<String>) -> Self {
        Self {
            openai_client,
            model: model.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let openai_client = Arc::new(Client::with_config(
            OpenAIConfig::new()
                .with_api_key(&config.openai_api_key)
                .with_api_base(&config.openai_base_url),
        ));
        Self::new(openai_client, config.search_model.clone())
    }

    fn prepare_request(
        &self,
        params: &SearchParams,
    ) -> Result<CreateChatCompletionRequest, AppError> {
        let user_message = build_search_message(params);
        debug!("Prepared resource search message: {}", user_message);

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessage::from(RESOURCE_SEARCH_SYSTEM_MESSAGE).into(),
                ChatCompletionRequestUserMessage::from(user_message).into(),
            ])
            .build()?;

        Ok(request)
    }
}

#[async_trait]
impl ResourceSearcher for OpenAiResourceSearcher {
    async fn search(&self, params: &SearchParams) -> Result<String, AppError> {
        let request = self.prepare_request(params)?;
        let response = self.openai_client.chat().create(request).await?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::Processing("No content found in LLM response".into()))
    }
}
