use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    domain::{AccountId, TransactionId, TransactionKind},
    error::Rejection,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    /// Everything else the server sends (balance, owner, ...), kept as is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub name: String,
    pub sum: f64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub name: String,
    pub sum: f64,
    pub account_id: AccountId,
}

/// Query options of the transactions page; doubles as the transaction list filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOptions {
    pub account_id: AccountId,
}

impl PageOptions {
    pub fn for_account(account_id: impl Into<AccountId>) -> Self {
        Self {
            account_id: account_id.into(),
        }
    }
}

/// `{success, data, error}` wrapper returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(Value::String(error.into())),
        }
    }

    /// Splits the envelope on `success`. A successful envelope yields its
    /// (possibly absent) data; an unsuccessful one never exposes `data`.
    pub fn into_result(self) -> Result<Option<T>, Rejection> {
        if self.success {
            Ok(self.data)
        } else {
            Err(Rejection::from_error_value(self.error))
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
