use crate::error::DispatchError;
use crate::telegram::api::{self, SendMessageRequest, SendPhotoRequest};
use crate::traits::MessageTransport;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use watch_notify_config::TelegramConfig;

#[derive(Clone)]
pub struct TelegramClient {
    client: Arc<Client>,
    bot_token: String,
    base_url: String,
}

impl TelegramClient {
    pub fn new(client: Arc<Client>, config: &TelegramConfig) -> Self {
        Self {
            client,
            bot_token: config.bot_token.clone(),
            base_url: config.base_url.clone(),
        }
    }
}

#[async_trait]
impl MessageTransport for TelegramClient {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), DispatchError> {
        let request = SendMessageRequest::html(chat_id, text);
        api::post_method(&self.client, &self.base_url, &self.bot_token, api::SEND_MESSAGE, &request).await
    }

    async fn send_photo(&self, chat_id: &str, photo_url: &str, caption: &str) -> Result<(), DispatchError> {
        let request = SendPhotoRequest::html(chat_id, photo_url, caption);
        api::post_method(&self.client, &self.base_url, &self.bot_token, api::SEND_PHOTO, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::create_http_client;
    use std::time::Duration;

    #[tokio::test]
    async fn test_transport_error_hides_bot_token() {
        let config = TelegramConfig {
            bot_token: "123456:SECRETTOKEN".to_string(),
            chat_id: "42".to_string(),
            display_name: "Alice".to_string(),
            handle: None,
            base_url: "http://127.0.0.1:1".to_string(),
        };
        let client = TelegramClient::new(Arc::new(create_http_client(Duration::from_secs(5))), &config);

        let err = client.send_text("42", "hello").await.unwrap_err();
        assert!(matches!(err, DispatchError::Transport { .. }));
        assert!(!err.to_string().contains("SECRETTOKEN"));
        assert!(!format!("{:?}", err).contains("SECRETTOKEN"));
    }
}
