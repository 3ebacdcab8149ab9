//! Console front end for Intelligent To-Do
//!
//! Reads commands from stdin and re-renders the list whenever the session
//! changes.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use todo_app::command::{Command, HELP};
use todo_app::config::{ClientConfig, IdentityConfig};
use todo_app::{
    GithubIdentityProvider, HttpCategorizer, IdentityProvider, StaticIdentityProvider, TodoSession,
    User,
};
use todo_core::task::FileTaskStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't interleave with the rendered list
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo_app=info,todo_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::from_env();
    tracing::info!("Using data directory: {:?}", config.data_dir);

    let identity: Arc<dyn IdentityProvider> = match &config.identity {
        IdentityConfig::Github { api_url, token } => {
            Arc::new(GithubIdentityProvider::new(api_url.clone(), token.clone()))
        }
        IdentityConfig::Local { uid } => {
            Arc::new(StaticIdentityProvider::new(User::new(uid.clone())))
        }
    };
    let store = Arc::new(FileTaskStore::new(config.tasks_path()).await?);
    let categorizer = Arc::new(HttpCategorizer::new(
        &config.categorizer_url,
        config.categorizer_timeout,
    )?);

    let session = TodoSession::new(identity, store, categorizer);
    session.start().await;

    let renderer = {
        let session = session.clone();
        let mut changes = session.changes();
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                print!("\n{}", session.view().await);
            }
        })
    };

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        let view = session.view().await;
        let task_id = |index: usize| view.tasks().get(index).map(|t| t.id);

        match command {
            Command::Login => session.sign_in().await,
            Command::Logout => session.sign_out().await,
            Command::Add(text) => {
                session.add_task(&text).await;
            }
            Command::Toggle(index) => match task_id(index) {
                Some(id) => session.toggle_complete(id).await,
                None => println!("no task {}", index + 1),
            },
            Command::Category(index, category) => match task_id(index) {
                Some(id) => session.update_category(id, category).await,
                None => println!("no task {}", index + 1),
            },
            Command::Remove(index) => match task_id(index) {
                Some(id) => session.delete_task(id).await,
                None => println!("no task {}", index + 1),
            },
            Command::Clear => session.dismiss_error().await,
            Command::List => print!("{}", view),
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
        }
    }

    renderer.abort();
    session.shutdown().await;
    Ok(())
}
