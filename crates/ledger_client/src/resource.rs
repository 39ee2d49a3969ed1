//! CRUD clients over the `{success, data}` endpoints.
//!
//! Every entity client implements [`Resource`] and gets `list`, `create` and
//! `remove` for free; entity-specific reads such as [`AccountClient::get`]
//! live on the concrete client.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::{
    domain::AccountId,
    error::Rejection,
    protocol::{Account, Envelope, Transaction},
};

use crate::{
    error::RequestError,
    request::{param_value, Params, RequestExecutor, RequestOptions},
    transport::HttpMethod,
};

/// Result of a call that reached the server and got an envelope back.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    Success(T),
    Rejected(Rejection),
}

impl<T> ApiOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }
}

#[async_trait]
pub trait Resource: Send + Sync {
    const ENDPOINT: &'static str;
    type Entity: DeserializeOwned + Send;

    fn executor(&self) -> &RequestExecutor;

    async fn list<F>(&self, filter: &F) -> Result<ApiOutcome<Vec<Self::Entity>>, RequestError>
    where
        F: Serialize + Sync + ?Sized,
    {
        let options =
            RequestOptions::new(HttpMethod::Get, Self::ENDPOINT).with_data(Params::from_serialize(filter)?);
        let body = self.executor().execute(options).await?;
        Ok(match split_envelope(Self::ENDPOINT, body)? {
            ApiOutcome::Success(Some(data)) => ApiOutcome::Success(decode_data(Self::ENDPOINT, data)?),
            ApiOutcome::Success(None) => ApiOutcome::Success(Vec::new()),
            ApiOutcome::Rejected(rejection) => ApiOutcome::Rejected(rejection),
        })
    }

    async fn create<P>(&self, payload: &P) -> Result<ApiOutcome<Self::Entity>, RequestError>
    where
        P: Serialize + Sync + ?Sized,
    {
        let options =
            RequestOptions::new(HttpMethod::Put, Self::ENDPOINT).with_data(Params::from_serialize(payload)?);
        let body = self.executor().execute(options).await?;
        require_data(Self::ENDPOINT, body)
    }

    /// Deletes by key. The key always travels as the multipart field `id`:
    /// a string or number as its text, anything structured as compact JSON.
    async fn remove<K>(&self, key: &K) -> Result<ApiOutcome<()>, RequestError>
    where
        K: Serialize + Sync + ?Sized,
    {
        let id = param_value(serde_json::to_value(key).map_err(RequestError::Encode)?);
        let options =
            RequestOptions::new(HttpMethod::Delete, Self::ENDPOINT).with_data(Params::new().with("id", id));
        let body = self.executor().execute(options).await?;
        Ok(match split_envelope(Self::ENDPOINT, body)? {
            ApiOutcome::Success(_) => ApiOutcome::Success(()),
            ApiOutcome::Rejected(rejection) => ApiOutcome::Rejected(rejection),
        })
    }
}

/// Reads `success` before anything else so that a rejected envelope with a
/// malformed `data` still comes back as a rejection.
fn split_envelope(url: &str, body: Value) -> Result<ApiOutcome<Option<Value>>, RequestError> {
    let envelope: Envelope<Value> = decode_data(url, body)?;
    Ok(match envelope.into_result() {
        Ok(data) => ApiOutcome::Success(data.filter(|value| !value.is_null())),
        Err(rejection) => ApiOutcome::Rejected(rejection),
    })
}

fn require_data<T: DeserializeOwned>(url: &str, body: Value) -> Result<ApiOutcome<T>, RequestError> {
    match split_envelope(url, body)? {
        ApiOutcome::Success(Some(data)) => Ok(ApiOutcome::Success(decode_data(url, data)?)),
        ApiOutcome::Success(None) => Err(RequestError::MissingData {
            url: url.to_string(),
        }),
        ApiOutcome::Rejected(rejection) => Ok(ApiOutcome::Rejected(rejection)),
    }
}

fn decode_data<T: DeserializeOwned>(url: &str, data: Value) -> Result<T, RequestError> {
    serde_json::from_value(data).map_err(|source| RequestError::Decode {
        url: url.to_string(),
        source,
    })
}

#[derive(Clone)]
pub struct AccountClient {
    executor: RequestExecutor,
}

impl AccountClient {
    pub fn new(executor: RequestExecutor) -> Self {
        Self { executor }
    }

    pub async fn get(&self, id: &AccountId) -> Result<ApiOutcome<Account>, RequestError> {
        let url = format!("{}/{}", Self::ENDPOINT, id);
        let body = self
            .executor
            .execute(RequestOptions::new(HttpMethod::Get, url.clone()))
            .await?;
        require_data(&url, body)
    }
}

impl Resource for AccountClient {
    const ENDPOINT: &'static str = "/account";
    type Entity = Account;

    fn executor(&self) -> &RequestExecutor {
        &self.executor
    }
}

#[derive(Clone)]
pub struct TransactionClient {
    executor: RequestExecutor,
}

impl TransactionClient {
    pub fn new(executor: RequestExecutor) -> Self {
        Self { executor }
    }
}

impl Resource for TransactionClient {
    const ENDPOINT: &'static str = "/transaction";
    type Entity = Transaction;

    fn executor(&self) -> &RequestExecutor {
        &self.executor
    }
}

#[cfg(test)]
#[path = "tests/resource_tests.rs"]
mod tests;
