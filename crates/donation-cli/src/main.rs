use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "donation-cli")]
#[command(about = "CLI client for the donation ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a donation (sealed immediately into its own block)
    Donate {
        /// Donor identity
        #[arg(long)]
        donor: String,
        /// Charity identity
        #[arg(long)]
        charity: String,
        /// Amount in minor currency units
        #[arg(long)]
        amount: u64,
        /// Optional message
        #[arg(long, default_value = "")]
        message: String,
    },
    /// Queue a donation into the pending buffer without sealing a block
    Queue {
        #[arg(long)]
        donor: String,
        #[arg(long)]
        charity: String,
        #[arg(long)]
        amount: u64,
        #[arg(long, default_value = "")]
        message: String,
    },
    /// Seal the pending buffer into a block
    Mine,
    /// Fetch the full ledger snapshot (chain + pending)
    Snapshot,
    /// Run the integrity audit
    Verify,
    /// Signed balance for an identity
    Balance { identity: String },
    /// Donation history for an identity
    History { identity: String },
}

#[derive(Serialize)]
struct DonationBody {
    donor: String,
    charity: String,
    amount: u64,
    message: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let node = cli.node;

    let res = match cli.cmd {
        Command::Donate {
            donor,
            charity,
            amount,
            message,
        } => {
            let body = DonationBody {
                donor,
                charity,
                amount,
                message,
            };
            client
                .post(format!("{node}/donations"))
                .json(&body)
                .send()
                .await?
        }
        Command::Queue {
            donor,
            charity,
            amount,
            message,
        } => {
            let body = DonationBody {
                donor,
                charity,
                amount,
                message,
            };
            client
                .post(format!("{node}/transactions"))
                .json(&body)
                .send()
                .await?
        }
        Command::Mine => client.post(format!("{node}/mine")).send().await?,
        Command::Snapshot => client.get(format!("{node}/ledger")).send().await?,
        Command::Verify => client.get(format!("{node}/verify")).send().await?,
        Command::Balance { identity } => {
            client.get(format!("{node}/balance/{identity}")).send().await?
        }
        Command::History { identity } => {
            client
                .get(format!("{node}/donations/{identity}"))
                .send()
                .await?
        }
    };

    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    println!("{body}");
    Ok(())
}
