use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use ledger_client::{
    load_settings, page::ClickHandler, AccountClient, ConfirmPrompt, PageDeps, PageRegion,
    RemovalOutcome, RequestExecutor, TransactionClient, TransactionsPage,
};
use shared::{domain::TransactionId, protocol::PageOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Overrides `server_url` from client.toml / environment.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    account_id: String,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the account's transactions page (default).
    Show,
    RemoveAccount,
    RemoveTransaction { transaction_id: String },
}

/// Prints each fragment as it is written.
struct TerminalRegion;

impl PageRegion for TerminalRegion {
    fn set_title(&self, title: &str) {
        println!("== {title} ==");
    }

    fn set_content(&self, html: String) {
        if html.is_empty() {
            println!("(no transactions)");
        } else {
            println!("{html}");
        }
    }

    fn subscribe(&self, _handler: ClickHandler) {
        tracing::debug!("terminal region has no clickable controls");
    }
}

struct StdinConfirm;

#[async_trait]
impl ConfirmPrompt for StdinConfirm {
    async fn confirm(&self, message: &str) -> bool {
        let mut stdout = tokio::io::stdout();
        if stdout
            .write_all(format!("{message} [y/N] ").as_bytes())
            .await
            .and(stdout.flush().await)
            .is_err()
        {
            return false;
        }
        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        if stdin.read_line(&mut line).await.is_err() {
            return false;
        }
        matches!(line.trim().to_lowercase().as_str(), "y" | "yes" | "д" | "да")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    let executor = RequestExecutor::from_settings(&settings)?;

    let refresh_requested = Arc::new(AtomicBool::new(false));
    let flag = refresh_requested.clone();
    let page = TransactionsPage::new(
        Some(Arc::new(TerminalRegion)),
        PageDeps {
            accounts: AccountClient::new(executor.clone()),
            transactions: TransactionClient::new(executor),
            confirm: Arc::new(StdinConfirm),
            refresh: Arc::new(move || flag.store(true, Ordering::SeqCst)),
        },
    )?;

    if let Some(tasks) = page.render(Some(PageOptions::for_account(args.account_id.as_str()))) {
        tasks.finished().await;
    }

    let outcome = match args.command.unwrap_or(Command::Show) {
        Command::Show => return Ok(()),
        Command::RemoveAccount => page.remove_account().await,
        Command::RemoveTransaction { transaction_id } => {
            page.remove_transaction(TransactionId::new(transaction_id))
                .await
        }
    };

    match outcome {
        RemovalOutcome::Removed => println!("Removed."),
        RemovalOutcome::Declined => println!("Cancelled."),
        RemovalOutcome::NoAccount => bail!("no account is shown"),
        RemovalOutcome::Rejected(rejection) => bail!(rejection.to_string()),
        RemovalOutcome::Failed(err) => return Err(err.into()),
    }

    if refresh_requested.load(Ordering::SeqCst) {
        if let Some(tasks) = page.update() {
            tasks.finished().await;
        }
    }

    Ok(())
}
