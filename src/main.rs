use clap::Parser;
use color_eyre::{Result, eyre::eyre};
use moodle_relay::{
	config::{AppConfig, SettingsFlags},
	runner::{self, RunOptions},
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "moodle_relay")]
#[command(about = "Relay today's Moodle lesson through WhatsApp Web", long_about = None)]
struct Args {
	/// Build and print the message without opening WhatsApp
	#[arg(long)]
	dry_run: bool,

	#[command(flatten)]
	settings: SettingsFlags,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("moodle_relay=info")))
		.with_writer(std::io::stderr)
		.init();

	let args = Args::parse();
	let config = AppConfig::try_build(args.settings).map_err(|e| eyre!("Failed to load config: {e}"))?;

	let options = RunOptions {
		dry_run: args.dry_run,
		dump_html_on_error: true,
	};
	let outcome = runner::run(&config, options).await?;
	if !outcome.sent {
		println!("{}", outcome.message);
	}
	Ok(())
}
