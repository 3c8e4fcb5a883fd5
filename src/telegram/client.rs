use async_trait::async_trait;
use reqwest::Client;
use teloxide::payloads::{AnswerCallbackQuery, EditMessageReplyMarkup, SendMessage, SendPhoto};
use teloxide::prelude::*;
use teloxide::requests::{JsonRequest, MultipartRequest};
use teloxide::types::{CallbackQueryId, InlineKeyboardMarkup, InputFile, MessageId, Recipient};
use teloxide::RequestError;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BotError {
    /// Telegram answered the call with `ok: false`; holds its description.
    #[error("Telegram rejected the request: {0}")]
    Rejected(String),
    #[error("Telegram request failed: {0}")]
    Request(RequestError),
}

impl From<RequestError> for BotError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Api(api) => BotError::Rejected(api.to_string()),
            other => BotError::Request(other),
        }
    }
}

impl BotError {
    /// Text to echo back to the caller when a delivery fails.
    pub fn details(&self) -> String {
        match self {
            BotError::Rejected(description) => description.clone(),
            BotError::Request(err) => err.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhotoMessage {
    pub chat_id: Recipient,
    pub photo: Vec<u8>,
    pub caption: String,
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

/// Outbound calls to the Telegram Bot API.
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn send_photo(&self, message: PhotoMessage) -> Result<(), BotError>;

    async fn answer_callback_query(&self, callback_query_id: &str, text: &str)
        -> Result<(), BotError>;

    /// Replaces the inline keyboard of a sent message with an empty one.
    async fn clear_reply_markup(&self, chat_id: &Recipient, message_id: MessageId)
        -> Result<(), BotError>;

    async fn send_message(&self, chat_id: &Recipient, text: &str) -> Result<(), BotError>;
}

/// `BotApi` over a teloxide [`Bot`] sharing the service's HTTP client.
#[derive(Clone)]
pub struct TelegramBotClient {
    bot: Bot,
}

fn photo_file(photo: Vec<u8>) -> InputFile {
    let extension = infer::get(&photo)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.extension())
        .unwrap_or("jpg");
    InputFile::memory(photo).file_name(format!("screenshot.{extension}"))
}

impl TelegramBotClient {
    pub fn new(client: Client, api_url: &str, token: &str) -> Result<Self, url::ParseError> {
        let api_url = url::Url::parse(api_url)?;
        Ok(TelegramBotClient {
            bot: Bot::with_client(token, client).set_api_url(api_url),
        })
    }

    fn photo_request(&self, message: PhotoMessage) -> MultipartRequest<SendPhoto> {
        let request = self
            .bot
            .send_photo(message.chat_id, photo_file(message.photo))
            .caption(message.caption);
        match message.reply_markup {
            Some(markup) => request.reply_markup(markup),
            None => request,
        }
    }

    fn answer_request(
        &self,
        callback_query_id: &str,
        text: &str,
    ) -> JsonRequest<AnswerCallbackQuery> {
        self.bot
            .answer_callback_query(CallbackQueryId(callback_query_id.to_string()))
            .text(text)
    }

    fn clear_markup_request(
        &self,
        chat_id: &Recipient,
        message_id: MessageId,
    ) -> JsonRequest<EditMessageReplyMarkup> {
        self.bot
            .edit_message_reply_markup(chat_id.clone(), message_id)
            .reply_markup(InlineKeyboardMarkup::default())
    }

    fn message_request(&self, chat_id: &Recipient, text: &str) -> JsonRequest<SendMessage> {
        self.bot.send_message(chat_id.clone(), text)
    }
}

#[async_trait]
impl BotApi for TelegramBotClient {
    async fn send_photo(&self, message: PhotoMessage) -> Result<(), BotError> {
        let sent = self.photo_request(message).await?;
        debug!(message_id = sent.id.0, "sendPhoto succeeded");
        Ok(())
    }

    async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: &str,
    ) -> Result<(), BotError> {
        self.answer_request(callback_query_id, text).await?;
        Ok(())
    }

    async fn clear_reply_markup(
        &self,
        chat_id: &Recipient,
        message_id: MessageId,
    ) -> Result<(), BotError> {
        self.clear_markup_request(chat_id, message_id).await?;
        Ok(())
    }

    async fn send_message(&self, chat_id: &Recipient, text: &str) -> Result<(), BotError> {
        self.message_request(chat_id, text).await?;
        Ok(())
    }
}
