use std::sync::Arc;

use serde::{ser::Error as _, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    config::ClientSettings,
    error::RequestError,
    transport::{HttpMethod, HttpRequest, HttpTransport, ReqwestTransport},
};

/// Insertion-ordered request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    /// Flattens a serializable struct or map into parameters. `null` means no
    /// parameters at all; any other non-object value is rejected.
    pub fn from_serialize<T>(value: &T) -> Result<Self, RequestError>
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_value(value).map_err(RequestError::Encode)? {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => Ok(Self(
                map.into_iter()
                    .map(|(key, value)| (key, param_value(value)))
                    .collect(),
            )),
            other => Err(RequestError::Encode(serde_json::Error::custom(format!(
                "request parameters must be an object, got {other}"
            )))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `key=value` pairs joined with `&`. Values go in verbatim.
    pub fn to_query(&self) -> String {
        self.iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn into_inner(self) -> Vec<(String, String)> {
        self.0
    }
}

/// Text form of one parameter value as it goes on the wire.
pub(crate) fn param_value(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseType {
    #[default]
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub url: String,
    pub data: Option<Params>,
    pub response_type: ResponseType,
}

impl RequestOptions {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            data: None,
            response_type: ResponseType::Json,
        }
    }

    pub fn with_data(mut self, data: Params) -> Self {
        self.data = Some(data);
        self
    }
}

#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
}

impl RequestExecutor {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            transport,
            base_url,
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, RequestError> {
        let transport = ReqwestTransport::new(settings.with_credentials)?;
        Ok(Self::new(settings.server_url.clone(), Arc::new(transport)))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET carries its data in the query string and never has a body; every
    /// other method carries a multipart form and leaves the url alone.
    pub fn prepare(&self, options: RequestOptions) -> HttpRequest {
        let mut url = format!("{}{}", self.base_url, options.url);
        let data = options.data.unwrap_or_default();
        match options.method {
            HttpMethod::Get => {
                if !data.is_empty() {
                    url.push('?');
                    url.push_str(&data.to_query());
                }
                HttpRequest {
                    method: HttpMethod::Get,
                    url,
                    form: None,
                }
            }
            method => HttpRequest {
                method,
                url,
                form: Some(data.into_inner()),
            },
        }
    }

    /// Issues one call and parses its JSON body. Only a 200 counts as a
    /// response; every other status is returned as `UnexpectedStatus`.
    pub async fn execute(&self, options: RequestOptions) -> Result<Value, RequestError> {
        let ResponseType::Json = options.response_type;
        let request = self.prepare(options);
        let method = request.method;
        let url = request.url.clone();
        debug!(%method, %url, "dispatching request");

        let response = self.transport.send(request).await?;
        if response.status != 200 {
            warn!(%method, %url, status = response.status, "request completed with non-200 status");
            return Err(RequestError::UnexpectedStatus {
                method,
                url,
                status: response.status,
            });
        }

        serde_json::from_str(&response.body).map_err(|source| RequestError::Decode { url, source })
    }
}

#[cfg(test)]
#[path = "tests/request_tests.rs"]
mod tests;
