use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process;
use std::sync::Arc;
use toggl_wiki::logging::init_logging;
use toggl_wiki::{Config, Credentials, ReqwestTransport, Tag, TogglExtension};

#[derive(Parser)]
#[command(name = "toggl-wiki")]
#[command(about = "Render Toggl Track listings and summary reports as wiki markup")]
#[command(version)]
struct Cli {
    /// Toggl API token (overrides TOGGL_API_TOKEN and the config file)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one tag, e.g. `render toggl-report-summary-hours user_id=42`
    Render {
        /// Tag name
        tag: String,
        /// Tag arguments as name=value tokens
        tokens: Vec<String>,
        /// Print the output flags along with the text
        #[arg(long)]
        verbose: bool,
    },
    /// List the available tags
    Tags,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Tags => {
            for tag in Tag::ALL {
                println!("{}", tag.magic_word());
            }
            Ok(())
        }
        Commands::Render {
            tag,
            tokens,
            verbose,
        } => {
            let config = Config::load().context("Failed to load configuration")?;
            let _guard = init_logging(&config);

            let tag = Tag::from_magic_word(&tag).with_context(|| {
                format!("Unknown tag {tag:?}, run `toggl-wiki tags` for the list")
            })?;

            let transport = ReqwestTransport::new()?;
            let extension = TogglExtension::from_config(&config, Arc::new(transport));
            let token = cli.token.or_else(|| config.toggl.api_token.clone());
            let session = extension.session(Credentials::new(token));

            let output = session.render(tag, &tokens).await;
            if verbose {
                eprintln!(
                    "{} is_html={} no_parse={} cache_expiry={}",
                    tag.magic_word().cyan(),
                    output.is_html,
                    output.no_parse,
                    output.cache_expiry
                );
            }
            println!("{}", output.text);
            Ok(())
        }
    }
}
