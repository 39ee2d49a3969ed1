//! Client side of the finance tracker: HTTP resource clients for accounts and
//! transactions, and the controller of the transactions page.

pub mod config;
pub mod error;
pub mod page;
pub mod request;
pub mod resource;
pub mod transport;

pub use config::{load_settings, ClientSettings};
pub use error::{PageError, RequestError};
pub use page::{
    AppRefresh, ClickPath, ConfirmPrompt, Element, PageDeps, PageRegion, PageState, RemovalOutcome,
    RenderTasks, TransactionsPage,
};
pub use request::{Params, RequestExecutor, RequestOptions, ResponseType};
pub use resource::{AccountClient, ApiOutcome, Resource, TransactionClient};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
