//! In-memory stand-ins for the Bot API and the transaction store.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use teloxide::types::{MessageId, Recipient};

use crate::db::models::{StatusUpdate, TransactionStatus};
use crate::db::store::TransactionStore;
use crate::telegram::client::{BotApi, BotError, PhotoMessage};

#[derive(Debug, Clone, PartialEq)]
pub enum BotCall {
    SendPhoto {
        chat_id: String,
        caption: String,
        photo: Vec<u8>,
        reply_markup: Option<Value>,
    },
    AnswerCallback {
        callback_query_id: String,
        text: String,
    },
    ClearMarkup {
        chat_id: String,
        message_id: i32,
    },
    SendMessage {
        chat_id: String,
        text: String,
    },
}

#[derive(Default)]
pub struct RecordingBot {
    calls: Mutex<Vec<BotCall>>,
    failure: Option<String>,
}

impl RecordingBot {
    /// Every call is recorded and then rejected with `description`.
    pub fn failing(description: &str) -> Self {
        RecordingBot {
            calls: Mutex::new(Vec::new()),
            failure: Some(description.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<BotCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: BotCall) -> Result<(), BotError> {
        self.calls.lock().unwrap().push(call);
        match &self.failure {
            Some(description) => Err(BotError::Rejected(description.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BotApi for RecordingBot {
    async fn send_photo(&self, message: PhotoMessage) -> Result<(), BotError> {
        let reply_markup = message
            .reply_markup
            .map(|markup| serde_json::to_value(markup).unwrap());
        self.record(BotCall::SendPhoto {
            chat_id: message.chat_id.to_string(),
            caption: message.caption,
            photo: message.photo,
            reply_markup,
        })
    }

    async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: &str,
    ) -> Result<(), BotError> {
        self.record(BotCall::AnswerCallback {
            callback_query_id: callback_query_id.to_string(),
            text: text.to_string(),
        })
    }

    async fn clear_reply_markup(
        &self,
        chat_id: &Recipient,
        message_id: MessageId,
    ) -> Result<(), BotError> {
        self.record(BotCall::ClearMarkup {
            chat_id: chat_id.to_string(),
            message_id: message_id.0,
        })
    }

    async fn send_message(&self, chat_id: &Recipient, text: &str) -> Result<(), BotError> {
        self.record(BotCall::SendMessage {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreCall {
    Overwrite(i64, TransactionStatus),
    ResolvePending(i64, TransactionStatus),
}

pub struct RecordingStore {
    calls: Mutex<Vec<StoreCall>>,
    outcome: StatusUpdate,
}

impl RecordingStore {
    pub fn answering(outcome: StatusUpdate) -> Self {
        RecordingStore {
            calls: Mutex::new(Vec::new()),
            outcome,
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for RecordingStore {
    fn default() -> Self {
        RecordingStore::answering(StatusUpdate::Applied)
    }
}

#[async_trait]
impl TransactionStore for RecordingStore {
    async fn update_status(
        &self,
        transaction_id: i64,
        status: TransactionStatus,
    ) -> Result<StatusUpdate> {
        self.calls
            .lock()
            .unwrap()
            .push(StoreCall::Overwrite(transaction_id, status));
        Ok(self.outcome)
    }

    async fn resolve_pending(
        &self,
        transaction_id: i64,
        status: TransactionStatus,
    ) -> Result<StatusUpdate> {
        self.calls
            .lock()
            .unwrap()
            .push(StoreCall::ResolvePending(transaction_id, status));
        Ok(self.outcome)
    }
}
