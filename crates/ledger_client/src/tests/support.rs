use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::{
    error::RequestError,
    page::{ClickHandler, ClickPath, ConfirmPrompt, PageRegion},
    request::RequestExecutor,
    transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport},
};

pub const FAKE_BASE_URL: &str = "http://ledger.test";

struct Reply {
    status: u16,
    body: String,
    gate: Option<oneshot::Receiver<()>>,
}

/// In-memory transport: canned replies per `(method, path?query)`, consumed
/// in order, optionally held back until the test releases them.
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<HashMap<(HttpMethod, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn executor(self: &Arc<Self>) -> RequestExecutor {
        RequestExecutor::new(FAKE_BASE_URL, self.clone())
    }

    pub fn reply(&self, method: HttpMethod, path: &str, status: u16, body: Value) {
        self.push(method, path, status, body.to_string(), None);
    }

    pub fn reply_raw(&self, method: HttpMethod, path: &str, status: u16, body: &str) {
        self.push(method, path, status, body.to_string(), None);
    }

    /// Returns the sender that releases the reply.
    pub fn reply_gated(
        &self,
        method: HttpMethod,
        path: &str,
        status: u16,
        body: Value,
    ) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(method, path, status, body.to_string(), Some(rx));
        tx
    }

    fn push(
        &self,
        method: HttpMethod,
        path: &str,
        status: u16,
        body: String,
        gate: Option<oneshot::Receiver<()>>,
    ) {
        self.replies
            .lock()
            .expect("replies lock")
            .entry((method, path.to_string()))
            .or_default()
            .push_back(Reply {
                status,
                body,
                gate,
            });
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());

        let path = request
            .url
            .strip_prefix(FAKE_BASE_URL)
            .unwrap_or(&request.url)
            .to_string();
        let reply = self
            .replies
            .lock()
            .expect("replies lock")
            .get_mut(&(request.method, path.clone()))
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| RequestError::Unavailable(format!("no reply for {} {path}", request.method)))?;

        if let Some(gate) = reply.gate {
            let _ = gate.await;
        }
        Ok(HttpResponse {
            status: reply.status,
            body: reply.body,
        })
    }
}

#[derive(Default)]
pub struct RecordingRegion {
    pub title: Mutex<Option<String>>,
    pub content: Mutex<Option<String>>,
    handler: Mutex<Option<ClickHandler>>,
}

impl RecordingRegion {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn title(&self) -> Option<String> {
        self.title.lock().expect("title lock").clone()
    }

    pub fn content(&self) -> Option<String> {
        self.content.lock().expect("content lock").clone()
    }

    pub fn has_handler(&self) -> bool {
        self.handler.lock().expect("handler lock").is_some()
    }

    pub fn click(&self, path: ClickPath) {
        let handler = self.handler.lock().expect("handler lock").clone();
        if let Some(handler) = handler {
            handler(&path);
        }
    }
}

impl PageRegion for RecordingRegion {
    fn set_title(&self, title: &str) {
        *self.title.lock().expect("title lock") = Some(title.to_string());
    }

    fn set_content(&self, html: String) {
        *self.content.lock().expect("content lock") = Some(html);
    }

    fn subscribe(&self, handler: ClickHandler) {
        *self.handler.lock().expect("handler lock") = Some(handler);
    }
}

pub struct StubConfirm {
    answer: bool,
    pub asked: Mutex<Vec<String>>,
}

impl StubConfirm {
    pub fn answering(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            asked: Mutex::new(Vec::new()),
        })
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().expect("asked lock").clone()
    }
}

#[async_trait]
impl ConfirmPrompt for StubConfirm {
    async fn confirm(&self, message: &str) -> bool {
        self.asked
            .lock()
            .expect("asked lock")
            .push(message.to_string());
        self.answer
    }
}

#[derive(Default)]
pub struct RefreshCounter(AtomicUsize);

impl RefreshCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// One request as the in-process server saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body_len: usize,
    pub fields: Vec<(String, String)>,
}

pub mod server {
    use std::sync::Arc;

    use axum::{
        body::Bytes,
        extract::{Multipart, OriginalUri, Path, RawQuery, State},
        http::Method,
        routing::get,
        Json, Router,
    };
    use serde_json::{json, Value};
    use shared::protocol::Envelope;
    use tokio::{net::TcpListener, sync::Mutex};

    use super::CapturedRequest;

    #[derive(Clone, Default)]
    pub struct ServerState {
        pub captured: Arc<Mutex<Vec<CapturedRequest>>>,
    }

    impl ServerState {
        pub async fn captured(&self) -> Vec<CapturedRequest> {
            self.captured.lock().await.clone()
        }
    }

    async fn list_transactions(
        State(state): State<ServerState>,
        OriginalUri(uri): OriginalUri,
        RawQuery(query): RawQuery,
        body: Bytes,
    ) -> Json<Value> {
        state.captured.lock().await.push(CapturedRequest {
            method: "GET".into(),
            path: uri.path().to_string(),
            query,
            body_len: body.len(),
            fields: Vec::new(),
        });
        Json(json!({
            "success": true,
            "data": [{
                "id": "T1",
                "account_id": "A1",
                "type": "income",
                "name": "Salary",
                "sum": 1500,
                "created_at": "2019-03-10 03:20:41"
            }]
        }))
    }

    async fn get_account(
        State(state): State<ServerState>,
        Path(id): Path<String>,
        RawQuery(query): RawQuery,
    ) -> Json<Value> {
        state.captured.lock().await.push(CapturedRequest {
            method: "GET".into(),
            path: format!("/account/{id}"),
            query,
            body_len: 0,
            fields: Vec::new(),
        });
        if id == "gone" {
            return envelope(Envelope::<Value>::rejected("Счёт не найден"));
        }
        envelope(Envelope::ok(json!({"id": id, "name": "Wallet", "sum": 300})))
    }

    async fn form_endpoint(
        State(state): State<ServerState>,
        method: Method,
        OriginalUri(uri): OriginalUri,
        RawQuery(query): RawQuery,
        mut multipart: Multipart,
    ) -> Json<Value> {
        let mut fields = Vec::new();
        while let Some(field) = multipart.next_field().await.expect("multipart field") {
            let name = field.name().unwrap_or_default().to_string();
            let value = field.text().await.expect("field text");
            fields.push((name, value));
        }
        let data: serde_json::Map<String, Value> = std::iter::once(("id".to_string(), json!("new-1")))
            .chain(fields.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))))
            .collect();
        state.captured.lock().await.push(CapturedRequest {
            method: method.as_str().to_string(),
            path: uri.path().to_string(),
            query,
            body_len: 0,
            fields,
        });

        if method == Method::DELETE {
            Json(json!({"success": true}))
        } else {
            envelope(Envelope::ok(data))
        }
    }

    fn envelope<T: serde::Serialize>(body: Envelope<T>) -> Json<Value> {
        Json(serde_json::to_value(body).expect("encode envelope"))
    }

    pub async fn spawn_ledger_server() -> (String, ServerState) {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let state = ServerState::default();
        let app = Router::new()
            .route(
                "/transaction",
                get(list_transactions).put(form_endpoint).delete(form_endpoint),
            )
            .route("/account", axum::routing::put(form_endpoint).delete(form_endpoint))
            .route("/account/:id", get(get_account))
            .with_state(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{addr}"), state)
    }
}
