use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use crate::error::DispatchError;

pub const SEND_MESSAGE: &str = "sendMessage";
pub const SEND_PHOTO: &str = "sendPhoto";

const PARSE_MODE_HTML: &str = "HTML";

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
    pub parse_mode: &'static str,
    pub disable_web_page_preview: bool,
}

impl<'a> SendMessageRequest<'a> {
    pub fn html(chat_id: &'a str, text: &'a str) -> Self {
        Self {
            chat_id,
            text,
            parse_mode: PARSE_MODE_HTML,
            disable_web_page_preview: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendPhotoRequest<'a> {
    pub chat_id: &'a str,
    pub photo: &'a str,
    pub caption: &'a str,
    pub parse_mode: &'static str,
}

impl<'a> SendPhotoRequest<'a> {
    pub fn html(chat_id: &'a str, photo: &'a str, caption: &'a str) -> Self {
        Self {
            chat_id,
            photo,
            caption,
            parse_mode: PARSE_MODE_HTML,
        }
    }
}

/// POST a Bot API method. Anything other than 200 is a rejection.
pub async fn post_method<T: Serialize + ?Sized>(
    client: &Client,
    base_url: &str,
    bot_token: &str,
    method: &'static str,
    payload: &T,
) -> Result<(), DispatchError> {
    // The token is part of the path; only the method name is logged
    let url = format!("{}/bot{}/{}", base_url.trim_end_matches('/'), bot_token, method);
    debug!(method, "Calling Telegram Bot API");

    let response = client
        .post(&url)
        .json(payload)
        .send()
        .await
        .map_err(|source| DispatchError::transport(method, source))?;

    let status = response.status();
    if status.as_u16() != 200 {
        let body = response.text().await.unwrap_or_default();
        return Err(DispatchError::Rejected {
            method,
            status: status.as_u16(),
            body,
        });
    }

    Ok(())
}
