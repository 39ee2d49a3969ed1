//! HTTP seam under the request executor.

use std::fmt;

use async_trait::async_trait;
use reqwest::{multipart::Form, Client, Method, Url};

use crate::error::RequestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for Method {
    fn from(value: HttpMethod) -> Self {
        match value {
            HttpMethod::Get => Method::GET,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// A fully prepared call: absolute url, and a multipart form for every
/// non-GET method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub form: Option<Vec<(String, String)>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RequestError>;
}

pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// `with_credentials` keeps a cookie store so session cookies set by the
    /// server ride along on every later request.
    pub fn new(with_credentials: bool) -> Result<Self, RequestError> {
        let http = Client::builder()
            .cookie_store(with_credentials)
            .build()
            .map_err(RequestError::ClientBuild)?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        let url = Url::parse(&request.url).map_err(|source| RequestError::InvalidUrl {
            url: request.url.clone(),
            source,
        })?;

        let mut builder = self.http.request(request.method.into(), url);
        if let Some(fields) = request.form {
            let form = fields
                .into_iter()
                .fold(Form::new(), |form, (key, value)| form.text(key, value));
            builder = builder.multipart(form);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}
