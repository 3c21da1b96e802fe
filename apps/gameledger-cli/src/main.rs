//! Gameledger CLI - import purchase history, search, and sync playtime

use clap::Parser;
use gameledger_cli::{
    logging, print_entries, print_import_summary, print_matches, print_stats,
    print_sync_summary, Cli, Commands, ConsolePrompt,
};
use gameledger_core::import::{parse_purchases, ImportSession};
use gameledger_core::pricing::SteamPriceClient;
use gameledger_core::scoring::rank_candidates;
use gameledger_core::sync::{sync_playtime, SteamSyncClient};
use gameledger_core::{GameledgerConfig, LibraryStore, MatchResolver, SqliteLibrary};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = if let Some(db_path) = &cli.library {
        GameledgerConfig::new(db_path, cli.fallback_to_default)
    } else {
        GameledgerConfig::from_env()
    };

    tracing::debug!(
        path = %config.effective_database_path().display(),
        "opening library database"
    );
    let mut library = SqliteLibrary::with_config(&config)?;
    let mut stdout = std::io::stdout();

    match cli.command {
        Commands::Import { file } => {
            let purchases = parse_purchases(&file)?;
            let prices = SteamPriceClient::new();
            let prompt = ConsolePrompt;
            let resolver = MatchResolver::new(config.policy.clone());
            let mut session =
                ImportSession::new(&mut library, &prices, &prompt).with_resolver(resolver);
            let summary = session.run(&purchases)?;
            print_import_summary(&summary, &mut stdout)?;
        }
        Commands::Search { query, limit } => {
            let candidates = library.candidates()?;
            let matches = rank_candidates(
                &query,
                &candidates,
                config.policy.admission,
                limit.unwrap_or(10),
            );
            print_matches(&matches, &mut stdout)?;
        }
        Commands::List { limit } => {
            let mut entries = library.list_entries()?;
            if let Some(limit) = limit {
                entries.truncate(limit);
            }
            print_entries(&entries, &mut stdout)?;
        }
        Commands::Stats => {
            let stats = library.stats()?;
            print_stats(&stats, &mut stdout)?;
        }
        Commands::Sync => {
            let (api_key, steam_id) = config.steam_credentials()?;
            let client = SteamSyncClient::new();
            let games = client.fetch_owned_games(api_key, steam_id)?;
            let summary = sync_playtime(&mut library, &games)?;
            print_sync_summary(&summary, &mut stdout)?;
        }
    }

    Ok(())
}
