//! Transactions page of one account: title, transaction list and the two
//! confirmation-gated delete actions.

pub mod markup;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use shared::{
    domain::{AccountId, TransactionId},
    error::Rejection,
    protocol::{PageOptions, Transaction},
};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    error::{PageError, RequestError},
    resource::{AccountClient, ApiOutcome, Resource, TransactionClient},
};

pub const ACCOUNT_TITLE_PLACEHOLDER: &str = "Название счёта";
pub const REMOVE_ACCOUNT_PROMPT: &str = "Вы действительно хотите удалить счёт?";
pub const REMOVE_TRANSACTION_PROMPT: &str = "Вы действительно хотите удалить эту транзакцию?";
pub const REMOVE_ACCOUNT_CLASS: &str = "remove-account";
pub const REMOVE_TRANSACTION_CLASS: &str = "transaction__remove";

pub type ClickHandler = Arc<dyn Fn(&ClickPath) + Send + Sync>;

/// The page container as seen by the controller.
///
/// Writes happen while the page holds its view lock, so implementations must
/// not call back into the page (`state`, `last_options`, `render`, ...).
pub trait PageRegion: Send + Sync {
    fn set_title(&self, title: &str);
    fn set_content(&self, html: String);
    /// Registers the single delegated click handler for the whole region.
    fn subscribe(&self, handler: ClickHandler);
}

#[async_trait]
pub trait ConfirmPrompt: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

/// Application-wide refresh requested after a successful delete.
pub trait AppRefresh: Send + Sync {
    fn update(&self);
}

impl<F> AppRefresh for F
where
    F: Fn() + Send + Sync,
{
    fn update(&self) {
        self()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub classes: Vec<String>,
    pub data_id: Option<String>,
}

impl Element {
    pub fn with_class(class: impl Into<String>) -> Self {
        Self {
            classes: vec![class.into()],
            data_id: None,
        }
    }

    pub fn data_id(mut self, id: impl Into<String>) -> Self {
        self.data_id = Some(id.into());
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Clicked element first, then its ancestors up to the region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickPath(pub Vec<Element>);

impl ClickPath {
    pub fn closest(&self, class: &str) -> Option<&Element> {
        self.0.iter().find(|element| element.has_class(class))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageAction {
    RemoveAccount,
    RemoveTransaction(TransactionId),
}

/// Both targets are checked independently, as one click may sit inside both.
pub fn resolve_click(path: &ClickPath) -> Vec<PageAction> {
    let mut actions = Vec::new();
    if path.closest(REMOVE_ACCOUNT_CLASS).is_some() {
        actions.push(PageAction::RemoveAccount);
    }
    if let Some(button) = path.closest(REMOVE_TRANSACTION_CLASS) {
        match &button.data_id {
            Some(id) => actions.push(PageAction::RemoveTransaction(TransactionId::new(id.clone()))),
            None => warn!("transaction remove control has no data-id"),
        }
    }
    actions
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Uninitialized,
    Populated,
    Cleared,
}

#[derive(Debug)]
pub enum RemovalOutcome {
    Removed,
    Declined,
    /// Nothing has been rendered yet, so there is no account to remove.
    NoAccount,
    Rejected(Rejection),
    Failed(RequestError),
}

pub struct PageDeps {
    pub accounts: AccountClient,
    pub transactions: TransactionClient,
    pub confirm: Arc<dyn ConfirmPrompt>,
    pub refresh: Arc<dyn AppRefresh>,
}

/// Join handles of the two fetches issued by one `render`.
pub struct RenderTasks {
    pub title: JoinHandle<()>,
    pub transactions: JoinHandle<()>,
}

impl RenderTasks {
    pub async fn finished(self) {
        let (title, transactions) = tokio::join!(self.title, self.transactions);
        for result in [title, transactions] {
            if let Err(err) = result {
                warn!(error = %err, "page fetch task ended abnormally");
            }
        }
    }
}

struct ViewState {
    state: PageState,
    last_options: Option<PageOptions>,
    /// Bumped by every render; fetch results tagged with an older value are dropped.
    generation: u64,
}

struct PageInner {
    region: Arc<dyn PageRegion>,
    accounts: AccountClient,
    transactions: TransactionClient,
    confirm: Arc<dyn ConfirmPrompt>,
    refresh: Arc<dyn AppRefresh>,
    runtime: Handle,
    view: Mutex<ViewState>,
}

#[derive(Clone)]
pub struct TransactionsPage {
    inner: Arc<PageInner>,
}

impl TransactionsPage {
    pub fn new(region: Option<Arc<dyn PageRegion>>, deps: PageDeps) -> Result<Self, PageError> {
        let region = region.ok_or(PageError::MissingRegion)?;
        let runtime = Handle::try_current().map_err(|_| PageError::NoRuntime)?;
        let page = Self {
            inner: Arc::new(PageInner {
                region,
                accounts: deps.accounts,
                transactions: deps.transactions,
                confirm: deps.confirm,
                refresh: deps.refresh,
                runtime,
                view: Mutex::new(ViewState {
                    state: PageState::Uninitialized,
                    last_options: None,
                    generation: 0,
                }),
            }),
        };
        page.register_events();
        Ok(page)
    }

    fn register_events(&self) {
        let weak: Weak<PageInner> = Arc::downgrade(&self.inner);
        self.inner.region.subscribe(Arc::new(move |path: &ClickPath| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let page = TransactionsPage { inner };
            for action in resolve_click(path) {
                let task_page = page.clone();
                page.inner.runtime.spawn(async move {
                    match action {
                        PageAction::RemoveAccount => {
                            task_page.remove_account().await;
                        }
                        PageAction::RemoveTransaction(id) => {
                            task_page.remove_transaction(id).await;
                        }
                    }
                });
            }
        }));
    }

    fn view(&self) -> MutexGuard<'_, ViewState> {
        self.inner.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> PageState {
        self.view().state
    }

    pub fn last_options(&self) -> Option<PageOptions> {
        self.view().last_options.clone()
    }

    /// Starts both fetches for `options` and returns without waiting for
    /// them. `None` leaves the page exactly as it is.
    pub fn render(&self, options: Option<PageOptions>) -> Option<RenderTasks> {
        let options = options?;
        let generation = {
            let mut view = self.view();
            view.last_options = Some(options.clone());
            view.state = PageState::Populated;
            view.generation += 1;
            view.generation
        };
        debug!(account_id = %options.account_id, generation, "rendering transactions page");

        let page = self.clone();
        let account_id = options.account_id.clone();
        let title = self
            .inner
            .runtime
            .spawn(async move { page.load_title(generation, account_id).await });

        let page = self.clone();
        let transactions = self
            .inner
            .runtime
            .spawn(async move { page.load_transactions(generation, options).await });

        Some(RenderTasks {
            title,
            transactions,
        })
    }

    /// Re-renders with the last options, e.g. after a transaction was added elsewhere.
    pub fn update(&self) -> Option<RenderTasks> {
        self.render(self.last_options())
    }

    /// Empties the list and resets the title; last options are kept.
    /// Fetches still in flight from an earlier render are discarded.
    pub fn clear(&self) {
        let mut view = self.view();
        view.generation += 1;
        self.inner.region.set_content(String::new());
        self.inner.region.set_title(ACCOUNT_TITLE_PLACEHOLDER);
        view.state = PageState::Cleared;
    }

    pub fn render_title(&self, name: &str) {
        self.inner.region.set_title(name);
    }

    pub fn render_transactions(&self, items: &[Transaction]) {
        self.inner.region.set_content(markup::transactions_html(items));
    }

    async fn load_title(&self, generation: u64, account_id: AccountId) {
        match self.inner.accounts.get(&account_id).await {
            Ok(ApiOutcome::Success(account)) => {
                self.apply_if_current(generation, "title", || self.render_title(&account.name));
            }
            Ok(ApiOutcome::Rejected(rejection)) => {
                warn!(%account_id, %rejection, "account fetch rejected");
            }
            Err(err) => warn!(%account_id, error = %err, "account fetch failed"),
        }
    }

    async fn load_transactions(&self, generation: u64, options: PageOptions) {
        match self.inner.transactions.list(&options).await {
            Ok(ApiOutcome::Success(items)) => {
                self.apply_if_current(generation, "transactions", || {
                    self.render_transactions(&items)
                });
            }
            Ok(ApiOutcome::Rejected(rejection)) => {
                warn!(account_id = %options.account_id, %rejection, "transaction list rejected");
            }
            Err(err) => {
                warn!(account_id = %options.account_id, error = %err, "transaction list failed")
            }
        }
    }

    /// Holds the view lock while writing so a newer render cannot slip in
    /// between the generation check and the region update.
    fn apply_if_current(&self, generation: u64, fragment: &str, write: impl FnOnce()) {
        let view = self.view();
        if view.generation != generation {
            debug!(
                fragment,
                generation,
                current = view.generation,
                "dropping superseded page fetch"
            );
            return;
        }
        write();
    }

    pub async fn remove_account(&self) -> RemovalOutcome {
        if !self.inner.confirm.confirm(REMOVE_ACCOUNT_PROMPT).await {
            info!("account removal declined");
            return RemovalOutcome::Declined;
        }
        let Some(options) = self.last_options() else {
            warn!("account removal confirmed but no account is rendered");
            return RemovalOutcome::NoAccount;
        };

        match self.inner.accounts.remove(&options.account_id).await {
            Ok(ApiOutcome::Success(())) => {
                info!(account_id = %options.account_id, "account removed");
                self.clear();
                self.inner.refresh.update();
                RemovalOutcome::Removed
            }
            Ok(ApiOutcome::Rejected(rejection)) => {
                warn!(account_id = %options.account_id, %rejection, "account removal rejected");
                RemovalOutcome::Rejected(rejection)
            }
            Err(err) => {
                warn!(account_id = %options.account_id, error = %err, "account removal failed");
                RemovalOutcome::Failed(err)
            }
        }
    }

    pub async fn remove_transaction(&self, id: TransactionId) -> RemovalOutcome {
        if !self.inner.confirm.confirm(REMOVE_TRANSACTION_PROMPT).await {
            info!(transaction_id = %id, "transaction removal declined");
            return RemovalOutcome::Declined;
        }

        match self.inner.transactions.remove(&id).await {
            Ok(ApiOutcome::Success(())) => {
                info!(transaction_id = %id, "transaction removed");
                self.inner.refresh.update();
                RemovalOutcome::Removed
            }
            Ok(ApiOutcome::Rejected(rejection)) => {
                warn!(transaction_id = %id, %rejection, "transaction removal rejected");
                RemovalOutcome::Rejected(rejection)
            }
            Err(err) => {
                warn!(transaction_id = %id, error = %err, "transaction removal failed");
                RemovalOutcome::Failed(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/page_tests.rs"]
mod tests;
