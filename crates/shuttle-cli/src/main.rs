use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use shuttle_core::impls::InMemoryAccountProvider;
use shuttle_core::{AccountOperations, Dispatcher, DispatcherConfig, Operation};

/// Demo settings, read from the JSON file named by `SHUTTLE_CONFIG`.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct DemoConfig {
    dispatcher: DispatcherConfig,
    /// Number of distinct accounts to create.
    accounts: usize,
    latency_ms: u64,
    jitter_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            dispatcher: DispatcherConfig::default(),
            accounts: 5,
            latency_ms: 50,
            jitter_ms: 20,
        }
    }
}

fn load_config() -> Result<DemoConfig, Box<dyn std::error::Error>> {
    match std::env::var_os("SHUTTLE_CONFIG") {
        Some(path) => {
            let bytes = std::fs::read(&path)?;
            Ok(serde_json::from_slice(&bytes)?)
        }
        None => Ok(DemoConfig::default()),
    }
}

// current_thread: the thread running main is the caller thread
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SHUTTLE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    tracing::info!(?config, "starting demo");

    // (A) provider と dispatcher を用意
    let accounts = Arc::new(AccountOperations::new(InMemoryAccountProvider::new().with_latency(
        Duration::from_millis(config.latency_ms),
        Duration::from_millis(config.jitter_ms),
    )));
    let dispatcher = Dispatcher::new(accounts.clone(), config.dispatcher.clone())?;

    // (B) まとめて投入。最初の 1 件だけがワーカーを起動し、残りはキューに積まれる
    for i in 1..=config.accounts {
        let user = format!("user{i}");
        let label = user.clone();
        dispatcher.submit_operation(
            Operation::CreateAccount.name(),
            vec![user, format!("pw{i}")],
            move |outcome| match outcome {
                Ok(handle) => tracing::info!(user = %label, %handle, "account created"),
                Err(failure) => tracing::warn!(user = %label, %failure, "account creation failed"),
            },
        )?;
    }

    // 重複は provider が失敗コードで返す
    dispatcher.submit(
        Operation::CreateAccount,
        vec!["user1".to_string(), "again".to_string()],
        |outcome| tracing::info!(?outcome, "duplicate account attempt finished"),
    )?;

    // 引数不足はその場で拒否され、キューには入らない
    if let Err(err) = dispatcher.submit_operation("create_account", vec!["lonely".to_string()], |_| {}) {
        tracing::info!(error = %err, "malformed request rejected");
    }

    tracing::info!(pending = dispatcher.pending(), active = dispatcher.is_active(), "submitted");

    // (C) 結果が全部戻るまで呼び出し側スレッドで配送を回す
    dispatcher.run_until_idle().await?;

    println!("{}", serde_json::to_string_pretty(&dispatcher.stats())?);
    tracing::info!(accounts = accounts.accounts().account_count(), "done");
    Ok(())
}
