use std::io;

use anyhow::Context;
use archilog::{
    cli::{self, Cli, Command},
    front,
    settings::Settings,
    store::EntryStore,
};
use clap::Parser;
use env_logger::Env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("loading settings")?;
    if let Some(url) = args.database_url {
        settings.database_url = url;
    }

    env_logger::try_init_from_env(Env::default().default_filter_or(settings.log_filter()))?;

    let store = EntryStore::connect(&settings.database_url)
        .await
        .with_context(|| format!("opening {}", settings.database_url))?;

    let res = match args.command {
        Command::Serve => {
            store.init().await?;
            front::start_web_server(store.clone(), &settings).await
        }
        command => cli::execute(command, &store, &mut io::stdout().lock()).await,
    };

    store.close().await;
    res
}
