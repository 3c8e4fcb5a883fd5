//! Callback payloads carried by the approve/reject buttons.
//!
//! A token is `<action>_<transaction_id>`. Anything that is not exactly two
//! segments, or whose second segment is not an integer, is rejected before the
//! store is touched.

use thiserror::Error;

use crate::db::models::TransactionStatus;

pub const TOKEN_SEPARATOR: char = '_';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Approve,
    Reject,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Approve => "approve",
            Action::Reject => "reject",
        }
    }

    pub fn button_label(self) -> &'static str {
        Decision::from_action(self.as_str()).result_text()
    }
}

pub fn encode(action: Action, transaction_id: &str) -> String {
    format!("{}{}{}", action.as_str(), TOKEN_SEPARATOR, transaction_id)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("expected `<action>_<transaction_id>`, got {0:?}")]
    Shape(String),
    #[error("transaction id {0:?} is not an integer")]
    TransactionId(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionToken {
    pub action: String,
    pub transaction_id: i64,
}

impl ActionToken {
    pub fn decode(data: &str) -> Result<Self, TokenError> {
        let parts = data.split(TOKEN_SEPARATOR).collect::<Vec<_>>();
        let [action, transaction_id] = parts.as_slice() else {
            return Err(TokenError::Shape(data.to_string()));
        };
        let transaction_id = transaction_id
            .parse::<i64>()
            .map_err(|_| TokenError::TransactionId(transaction_id.to_string()))?;
        Ok(ActionToken {
            action: action.to_string(),
            transaction_id,
        })
    }

    pub fn decision(&self) -> Decision {
        Decision::from_action(&self.action)
    }
}

/// Operator verdict. Every action other than `approve` counts as a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Declined,
}

impl Decision {
    pub fn from_action(action: &str) -> Self {
        if action == Action::Approve.as_str() {
            Decision::Approved
        } else {
            Decision::Declined
        }
    }

    pub fn target_status(self) -> TransactionStatus {
        match self {
            Decision::Approved => TransactionStatus::Completed,
            Decision::Declined => TransactionStatus::Failed,
        }
    }

    pub fn result_text(self) -> &'static str {
        match self {
            Decision::Approved => "✅ Payment received",
            Decision::Declined => "❌ Payment declined",
        }
    }
}
