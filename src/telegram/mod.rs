pub mod client;

use serde_json::Value;
use teloxide::types::{ChatId, Recipient};

/// Chat ids arrive either as JSON numbers or as text; numeric text is treated as an id.
pub fn recipient_from_value(value: &Value) -> Option<Recipient> {
    match value {
        Value::Number(number) => number.as_i64().map(|id| Recipient::Id(ChatId(id))),
        Value::String(text) => recipient_from_text(text),
        _ => None,
    }
}

pub fn recipient_from_text(text: &str) -> Option<Recipient> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<i64>() {
        Ok(id) => Some(Recipient::Id(ChatId(id))),
        Err(_) => Some(Recipient::ChannelUsername(trimmed.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_values_become_chat_ids() {
        assert_eq!(
            recipient_from_value(&json!(-1003174200950_i64)),
            Some(Recipient::Id(ChatId(-1003174200950)))
        );
        assert_eq!(
            recipient_from_value(&json!("555")),
            Some(Recipient::Id(ChatId(555)))
        );
    }

    #[test]
    fn usernames_are_kept_verbatim() {
        let recipient = recipient_from_value(&json!("@topup_ops")).unwrap();
        assert_eq!(recipient.to_string(), "@topup_ops");
    }

    #[test]
    fn blank_and_structured_values_are_ignored() {
        assert_eq!(recipient_from_value(&json!("  ")), None);
        assert_eq!(recipient_from_value(&json!({"id": 1})), None);
    }
}
