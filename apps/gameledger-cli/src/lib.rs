//! Gameledger CLI library: argument parsing, console prompts, and printing

pub mod logging;

use clap::{Parser, Subcommand};
use gameledger_core::import::ImportSummary;
use gameledger_core::prompt::{parse_app_ids, IdReply, Prompt};
use gameledger_core::sync::SyncSummary;
use gameledger_core::{LibraryEntry, LibraryStats, MatchCandidate, Result};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gameledger")]
#[command(about = "Track purchase costs and playtime across a personal game library")]
#[command(version)]
pub struct Cli {
    /// Library database path (defaults to ~/.gameledger/library.sqlite)
    #[arg(long, short, env = "GAMELEDGER_DB_PATH")]
    pub library: Option<PathBuf>,

    /// Fall back to the default library path if the specified path doesn't exist
    #[arg(long)]
    pub fallback_to_default: bool,

    /// Verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Import a purchase-history CSV export
    Import {
        /// Path to the exported CSV file
        file: PathBuf,
    },
    /// Fuzzy-search the library by name
    Search {
        /// Search query
        query: String,
        /// Limit number of results
        #[arg(long, short)]
        limit: Option<usize>,
    },
    /// List library entries
    List {
        /// Limit number of results
        #[arg(long, short)]
        limit: Option<usize>,
    },
    /// Show library totals
    Stats,
    /// Sync playtime from the Steam owned-games endpoint
    Sync,
}

/// Print library entries to the given writer
///
/// # Errors
/// Returns an error if writing fails
pub fn print_entries<W: Write>(entries: &[LibraryEntry], writer: &mut W) -> Result<()> {
    if entries.is_empty() {
        writeln!(writer, "Library is empty")?;
        return Ok(());
    }

    writeln!(writer, "Found {} entries:", entries.len())?;
    for entry in entries {
        writeln!(
            writer,
            "  • {} [{}] ({:.1}h)",
            entry.name,
            entry.id,
            entry.hours_played
        )?;
        if let Some(cost) = entry.purchase_cost {
            let date = entry.purchase_date.as_deref().unwrap_or("unknown date");
            let method = entry.acquisition_method.as_deref().unwrap_or("unknown");
            writeln!(writer, "    Paid: {cost:.2} on {date} via {method}")?;
        }
        if let Some(parent) = &entry.parent_id {
            writeln!(writer, "    DLC of: {parent}")?;
        }
    }
    Ok(())
}

/// Print search matches to the given writer
///
/// # Errors
/// Returns an error if writing fails
pub fn print_matches<W: Write>(matches: &[MatchCandidate], writer: &mut W) -> Result<()> {
    if matches.is_empty() {
        writeln!(writer, "No matches found")?;
        return Ok(());
    }

    writeln!(writer, "Found {} matches:", matches.len())?;
    for candidate in matches {
        writeln!(
            writer,
            "  {:>7.1}  {} [{}]",
            candidate.score, candidate.name, candidate.id
        )?;
    }
    Ok(())
}

/// Print library stats to the given writer
///
/// # Errors
/// Returns an error if writing fails
pub fn print_stats<W: Write>(stats: &LibraryStats, writer: &mut W) -> Result<()> {
    writeln!(writer, "Games:         {}", stats.total_games)?;
    writeln!(writer, "Total hours:   {:.2}", stats.total_hours)?;
    writeln!(writer, "Average hours: {:.2}", stats.average_hours)?;
    Ok(())
}

/// Print an import summary to the given writer
///
/// # Errors
/// Returns an error if writing fails
pub fn print_import_summary<W: Write>(summary: &ImportSummary, writer: &mut W) -> Result<()> {
    writeln!(
        writer,
        "Processed {} titles: {} added, {} updated, {} skipped",
        summary.processed, summary.added, summary.updated, summary.skipped
    )?;
    Ok(())
}

/// Print a sync summary to the given writer
///
/// # Errors
/// Returns an error if writing fails
pub fn print_sync_summary<W: Write>(summary: &SyncSummary, writer: &mut W) -> Result<()> {
    writeln!(
        writer,
        "Fetched {} games: {} updated, {} created",
        summary.fetched, summary.updated, summary.created
    )?;
    Ok(())
}

/// Interactive prompt over stdin/stdout
#[derive(Debug, Default)]
pub struct ConsolePrompt;

impl ConsolePrompt {
    fn read_line(&self, prompt: &str) -> Option<String> {
        print!("{prompt}: ");
        std::io::stdout().flush().ok()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).ok()?;
        Some(line.trim().to_string())
    }
}

impl Prompt for ConsolePrompt {
    fn confirm(&self, question: &str) -> bool {
        self.read_line(&format!("{question} [y/N]"))
            .is_some_and(|answer| answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
    }

    fn choose_one(&self, prompt: &str, options: &[String]) -> Option<usize> {
        println!("{prompt}");
        for (index, option) in options.iter().enumerate() {
            println!("  {}. {option}", index + 1);
        }
        let answer = self.read_line("Choice (0 to cancel)")?;
        match answer.parse::<usize>() {
            Ok(n) if n >= 1 && n <= options.len() => Some(n - 1),
            _ => None,
        }
    }

    fn input_text(&self, prompt: &str) -> Option<String> {
        let answer = self.read_line(prompt)?;
        if answer.is_empty() {
            None
        } else {
            Some(answer)
        }
    }

    fn input_app_ids(&self, prompt: &str) -> IdReply {
        let Some(answer) = self.read_line(&format!("{prompt} ('s' to skip, 'c' to cancel)"))
        else {
            return IdReply::Cancelled;
        };
        match answer.to_lowercase().as_str() {
            "" | "c" | "cancel" => IdReply::Cancelled,
            "s" | "skip" => IdReply::Skip,
            _ => {
                let ids = parse_app_ids(&answer);
                if ids.is_empty() {
                    eprintln!("No valid app ids entered; skipping");
                    IdReply::Skip
                } else {
                    IdReply::Ids(ids)
                }
            }
        }
    }
}
