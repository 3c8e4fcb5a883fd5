//! Telegram webhook: operator presses on the approve/reject buttons.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use teloxide::types::{ChatId, MessageId, Recipient};
use tracing::{debug, info, warn};

use crate::db::models::StatusUpdate;
use crate::db::store::TransactionStore;
use crate::error::AppError;
use crate::handlers::parse_json_body;
use crate::payments::token::ActionToken;
use crate::state::AppState;
use crate::telegram::client::{BotApi, BotError};
use crate::utils::http::request_id;
use crate::utils::timing::RequestTimer;

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<CallbackMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackMessage {
    pub chat: CallbackChat,
    pub message_id: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackChat {
    pub id: i64,
}

fn report_step(step: &str, transaction_id: i64, result: Result<(), BotError>) {
    match result {
        Ok(()) => debug!(step, transaction_id, "Telegram step completed"),
        Err(err) => warn!(step, transaction_id, "Telegram step failed: {}", err),
    }
}

/// Applies an operator decision and reflects it back into the chat.
///
/// The status write happens first. The three Telegram calls that follow are
/// best effort: each failure is logged and none of them undoes the write.
pub async fn process_callback(
    store: &dyn TransactionStore,
    bot: &dyn BotApi,
    strict_transitions: bool,
    query: &CallbackQuery,
) -> Result<StatusUpdate, AppError> {
    let data = query
        .data
        .as_deref()
        .ok_or_else(|| AppError::Validation("callback_query.data is required".to_string()))?;
    let message = query.message.as_ref().ok_or_else(|| {
        AppError::Validation("callback_query.message is required".to_string())
    })?;
    let token = ActionToken::decode(data)?;
    let decision = token.decision();
    let status = decision.target_status();
    let transaction_id = token.transaction_id;

    let update = if strict_transitions {
        store.resolve_pending(transaction_id, status).await?
    } else {
        store.update_status(transaction_id, status).await?
    };

    let chat_id = Recipient::Id(ChatId(message.chat.id));
    let message_id = MessageId(message.message_id);
    let notice = match update {
        StatusUpdate::Applied => None,
        // Lenient mode answers like a plain overwrite even when no row matched.
        StatusUpdate::NotFound if !strict_transitions => {
            warn!(transaction_id, %status, "Overwrite matched no transaction");
            None
        }
        StatusUpdate::AlreadyDecided(current) => {
            warn!(transaction_id, %current, requested = %status, "Ignoring decision for settled transaction");
            Some(format!("Transaction {transaction_id} is already {current}"))
        }
        StatusUpdate::NotFound => {
            warn!(transaction_id, "Decision for unknown transaction");
            Some(format!("Transaction {transaction_id} not found"))
        }
    };

    let answer = notice.as_deref().unwrap_or(decision.result_text());
    report_step(
        "answerCallbackQuery",
        transaction_id,
        bot.answer_callback_query(&query.id, answer).await,
    );
    report_step(
        "editMessageReplyMarkup",
        transaction_id,
        bot.clear_reply_markup(&chat_id, message_id).await,
    );
    if notice.is_some() {
        return Ok(update);
    }

    info!(transaction_id, %status, action = %token.action, "Operator decision applied");
    let text = format!(
        "{}\n\nTransaction ID: {}",
        decision.result_text(),
        transaction_id
    );
    report_step(
        "sendMessage",
        transaction_id,
        bot.send_message(&chat_id, &text).await,
    );
    Ok(update)
}

async fn dispatch_update(state: &AppState, body: &[u8]) -> Result<(), AppError> {
    let update: Value = parse_json_body(body)?;
    let Some(raw_query) = update.get("callback_query") else {
        debug!("Webhook update without callback_query acknowledged");
        return Ok(());
    };
    let query: CallbackQuery = serde_json::from_value(raw_query.clone())
        .map_err(|err| AppError::Validation(format!("Invalid callback_query: {err}")))?;

    process_callback(
        &state.db,
        state.bot.as_ref(),
        state.config.strict_status_transitions,
        &query,
    )
    .await?;
    Ok(())
}

pub async fn telegram_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let request_id = request_id(&headers);
    let mut timer = RequestTimer::start("telegram-webhook", &request_id);

    let result = dispatch_update(&state, &body).await;
    match &result {
        Ok(()) => timer.complete(200, None),
        Err(err) => timer.complete(err.status_code().as_u16(), Some(&err.to_string())),
    }
    result?;

    Ok(Json(json!({ "ok": true })))
}
