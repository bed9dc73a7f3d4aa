use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use keel_service::{AskRequest, ChatService};
use keel_storage::db::Db;

#[derive(Debug, Parser)]
#[command(version, rename_all = "kebab")]
struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	config: PathBuf,
	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Ask one question through the answer chain.
	Ask {
		#[arg(long, short = 'u')]
		user: String,
		question: String,
		/// Print the full response as JSON instead of the answer text.
		#[arg(long)]
		json: bool,
	},
	/// Delete every stored turn for a user.
	ClearHistory {
		#[arg(long, short = 'u')]
		user: String,
	},
	/// Conversation counters for a user.
	Stats {
		#[arg(long, short = 'u')]
		user: String,
	},
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();
	let cfg = keel_config::load(&args.config)?;

	init_tracing(&cfg);

	let db = Db::connect(&cfg.storage.postgres).await?;

	db.ensure_schema().await?;

	match args.command {
		Command::Ask { user, question, json } => {
			let service = ChatService::new(cfg, db)?;
			let response =
				service.ask(AskRequest { user_id: user, query: question }).await?;

			if json {
				println!("{}", serde_json::to_string_pretty(&response)?);
			} else {
				println!("{}", response.answer);
			}
		},
		Command::ClearHistory { user } => {
			let deleted = keel_storage::history::clear(&db, &user).await?;

			println!("Deleted {deleted} stored turns for {user}.");
		},
		Command::Stats { user } => {
			let stats = keel_storage::history::stats(&db, &user).await?;

			println!(
				"{user}: {} turns, {} successful ({:.1}% success rate).",
				stats.total,
				stats.succeeded,
				stats.success_rate()
			);
		},
	}

	Ok(())
}

fn init_tracing(cfg: &keel_config::Config) {
	let filter =
		EnvFilter::try_new(&cfg.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}
