//! lathermail - command-line access to a lathermail server
//!
//! Lists inboxes, searches and deletes captured messages, and saves
//! attachments. Settings come from `--config`, then `LATHERMAIL_*`
//! environment variables, then flags.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use lathermail_client::{ClientConfig, FilterTime, LathermailClient, MessageFilter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "lathermail", version, about = "Query and clean up lathermail inboxes")]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server base URL
    #[arg(long, global = true, env = "LATHERMAIL_URL")]
    url: Option<String>,

    #[arg(long, global = true, env = "LATHERMAIL_API_VERSION")]
    api_version: Option<u32>,

    /// Inbox identifier
    #[arg(long, global = true, env = "LATHERMAIL_INBOX")]
    inbox: Option<String>,

    /// Inbox password
    #[arg(long, global = true, env = "LATHERMAIL_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Zone for dates without an offset: `local`, IANA name or `+HH:MM`
    #[arg(long, global = true, env = "LATHERMAIL_TIMEZONE")]
    timezone: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "LATHERMAIL_TIMEOUT_SECS")]
    timeout: Option<u64>,

    /// Log requests and responses
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List inboxes sharing the password
    Inboxes,
    /// Search messages in the inbox
    Messages(FilterArgs),
    /// Show a single message
    Message { id: String },
    /// Save an attachment (to stdout without --output)
    Attachment {
        id: String,
        index: usize,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a single message
    Delete { id: String },
    /// Delete messages matching a filter
    DeleteMessages {
        #[command(flatten)]
        filter: FilterArgs,
        /// Required to delete with an empty filter (the whole inbox)
        #[arg(long)]
        all: bool,
    },
}

#[derive(Args, Debug)]
struct FilterArgs {
    #[arg(long)]
    recipients_address: Option<String>,
    #[arg(long)]
    recipients_address_contains: Option<String>,
    #[arg(long)]
    recipients_name: Option<String>,
    #[arg(long)]
    recipients_name_contains: Option<String>,
    #[arg(long)]
    sender_address: Option<String>,
    #[arg(long)]
    sender_address_contains: Option<String>,
    #[arg(long)]
    sender_name: Option<String>,
    #[arg(long)]
    sender_name_contains: Option<String>,
    #[arg(long)]
    subject: Option<String>,
    #[arg(long)]
    subject_contains: Option<String>,
    #[arg(long)]
    read: Option<bool>,
    /// Created after (RFC 3339, or naive `YYYY-MM-DDTHH:MM:SS`)
    #[arg(long, visible_alias = "after")]
    created_at_gt: Option<FilterTime>,
    /// Created before (RFC 3339, or naive `YYYY-MM-DDTHH:MM:SS`)
    #[arg(long, visible_alias = "before")]
    created_at_lt: Option<FilterTime>,
}

impl From<FilterArgs> for MessageFilter {
    fn from(args: FilterArgs) -> Self {
        MessageFilter {
            recipients_address: args.recipients_address,
            recipients_address_contains: args.recipients_address_contains,
            recipients_name: args.recipients_name,
            recipients_name_contains: args.recipients_name_contains,
            sender_address: args.sender_address,
            sender_address_contains: args.sender_address_contains,
            sender_name: args.sender_name,
            sender_name_contains: args.sender_name_contains,
            subject: args.subject,
            subject_contains: args.subject_contains,
            read: args.read,
            created_at_gt: args.created_at_gt,
            created_at_lt: args.created_at_lt,
        }
    }
}

impl Cli {
    /// Config file (or defaults) with flags and env values layered on top
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };

        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(version) = self.api_version {
            config.api_version = version;
        }
        if let Some(inbox) = &self.inbox {
            config.user = Some(inbox.clone());
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
        if let Some(timezone) = &self.timezone {
            config.timezone = Some(timezone.clone());
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = Some(timeout);
        }

        // Listing inboxes is not scoped to one inbox
        if matches!(self.command, Command::Inboxes) && config.user.is_none() {
            config.user = Some(String::new());
        }

        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose { "lathermail=debug" } else { "lathermail=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render JSON")?;
    println!("{}", rendered);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.client_config()?;
    let client = LathermailClient::from_config(&config).context("Failed to create client")?;

    match cli.command {
        Command::Inboxes => {
            let inboxes = client.get_inboxes(None).await.context("Failed to list inboxes")?;
            print_json(&inboxes)?;
        }
        Command::Messages(args) => {
            let filter = MessageFilter::from(args);
            let messages = client
                .get_messages(&filter)
                .await
                .context("Failed to search messages")?;
            tracing::info!("Found {} messages", messages.len());
            print_json(&messages)?;
        }
        Command::Message { id } => {
            let message = client
                .get_single_message(&id)
                .await
                .with_context(|| format!("Failed to fetch message {}", id))?;
            print_json(&message)?;
        }
        Command::Attachment { id, index, output } => {
            let content = client
                .get_attachment(&id, index)
                .await
                .with_context(|| format!("Failed to fetch attachment {} of {}", index, id))?;
            match output {
                Some(path) => std::fs::write(&path, &content)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => std::io::stdout()
                    .write_all(&content)
                    .context("Failed to write attachment to stdout")?,
            }
        }
        Command::Delete { id } => {
            client
                .delete_single_message(&id)
                .await
                .with_context(|| format!("Failed to delete message {}", id))?;
            tracing::info!("Deleted message {}", id);
        }
        Command::DeleteMessages { filter, all } => {
            let filter = MessageFilter::from(filter);
            if filter.is_empty() && !all {
                bail!("Refusing to delete every message without --all");
            }
            client
                .delete_messages(&filter)
                .await
                .context("Failed to delete messages")?;
            tracing::info!("Deleted messages matching {} criteria", filter.len());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli).await
}
