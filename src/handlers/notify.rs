//! Relays payment screenshots and QR-code top-up requests to the operators' chat.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::handlers::{parse_json_body, scalar_text};
use crate::payments::token::{self, Action};
use crate::state::AppState;
use crate::telegram::client::{BotApi, PhotoMessage};
use crate::telegram::{recipient_from_text, recipient_from_value};
use crate::utils::http::request_id;
use crate::utils::timing::RequestTimer;

pub const PAYMENT_PROOF_TYPE: &str = "payment_proof";
pub const DEFAULT_IMAGE_TYPE: &str = "qr_code";
pub const DEFAULT_CURRENCY: &str = "CNY";
pub const NO_TRANSACTION: &str = "N/A";

/// Request body cap for the relay: a 10 MB photo after base64 plus the JSON around it.
pub const MAX_NOTIFY_BODY_BYTES: usize = 15 * 1024 * 1024;

/// Standard alphabet, tolerating missing padding and non-zero trailing bits.
const IMAGE_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Default, Deserialize)]
pub struct NotifyRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub chat_id: Option<Value>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, rename = "type")]
    pub image_type: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<Value>,
}

/// Strips a `data:<mime>;base64,` style prefix and decodes the remainder,
/// ignoring line breaks and other ASCII whitespace.
pub fn decode_image(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let encoded = match payload.split_once(',') {
        Some((_, rest)) => rest,
        None => payload,
    };
    let compact: Vec<u8> = encoded
        .bytes()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();
    IMAGE_BASE64.decode(compact)
}

pub fn build_caption(
    image_type: &str,
    amount: &str,
    currency: &str,
    transaction_id: &str,
    request_id: &str,
) -> String {
    let headline = if image_type == PAYMENT_PROOF_TYPE {
        "✅ Payment screenshot"
    } else {
        "💰 New top-up request (QR code)"
    };
    format!(
        "{headline}\n\nAmount: {amount} {currency}\nTransaction ID: {transaction_id}\nRequest ID: {request_id}"
    )
}

pub fn decision_keyboard(transaction_id: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(
            Action::Approve.button_label(),
            token::encode(Action::Approve, transaction_id),
        ),
        InlineKeyboardButton::callback(
            Action::Reject.button_label(),
            token::encode(Action::Reject, transaction_id),
        ),
    ]])
}

pub fn wants_decision_controls(image_type: &str, transaction_id: &str) -> bool {
    image_type == PAYMENT_PROOF_TYPE && transaction_id != NO_TRANSACTION
}

pub async fn relay_image(
    bot: &dyn BotApi,
    config: &Config,
    request: NotifyRequest,
    request_id: &str,
) -> Result<(), AppError> {
    let image = request.image.unwrap_or_default();
    if image.trim().is_empty() {
        return Err(AppError::Validation("Image is required".to_string()));
    }

    if !config.has_bot_token() {
        return Err(AppError::Configuration(
            "Bot token not configured".to_string(),
        ));
    }

    let photo = decode_image(&image)?;

    let chat_id = match request.chat_id.as_ref().filter(|value| !value.is_null()) {
        Some(value) => recipient_from_value(value).ok_or_else(|| {
            AppError::Validation("chat_id must be a string or integer".to_string())
        })?,
        None => recipient_from_text(&config.default_chat_id).ok_or_else(|| {
            AppError::Configuration("Default chat is not configured".to_string())
        })?,
    };
    let amount = scalar_text(request.amount.as_ref()).unwrap_or_default();
    let currency = request
        .currency
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    let image_type = request
        .image_type
        .unwrap_or_else(|| DEFAULT_IMAGE_TYPE.to_string());
    let transaction_id = scalar_text(request.transaction_id.as_ref())
        .unwrap_or_else(|| NO_TRANSACTION.to_string());

    let reply_markup = if wants_decision_controls(&image_type, &transaction_id) {
        if transaction_id.parse::<i64>().is_err() {
            warn!(
                transaction_id = %transaction_id,
                "Attaching decision buttons to a non-numeric transaction id; presses will be rejected"
            );
        }
        Some(decision_keyboard(&transaction_id))
    } else {
        None
    };

    let caption = build_caption(&image_type, &amount, &currency, &transaction_id, request_id);
    let with_controls = reply_markup.is_some();
    bot.send_photo(PhotoMessage {
        chat_id,
        photo,
        caption,
        reply_markup,
    })
    .await
    .map_err(AppError::Delivery)?;

    info!(
        request_id,
        transaction_id = %transaction_id,
        image_type = %image_type,
        with_controls,
        "Screenshot relayed to Telegram"
    );
    Ok(())
}

pub async fn telegram_notify(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let request_id = request_id(&headers);
    let mut timer = RequestTimer::start("telegram-notify", &request_id);

    let result = match parse_json_body::<NotifyRequest>(&body) {
        Ok(request) => {
            relay_image(state.bot.as_ref(), &state.config, request, &request_id).await
        }
        Err(err) => Err(err),
    };

    match &result {
        Ok(()) => timer.complete(200, None),
        Err(err) => timer.complete(err.status_code().as_u16(), Some(&err.to_string())),
    }
    result?;

    Ok(Json(json!({
        "success": true,
        "message": "Screenshot sent to Telegram",
    })))
}
