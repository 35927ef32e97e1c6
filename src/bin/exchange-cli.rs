use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "exchange-cli")]
#[command(about = "Command line client for the token exchange daemon", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8090")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    /// External token to internal token
    ToInternal,
    /// Internal token to external token
    ToExternal,
}

impl DirectionArg {
    fn as_wire(&self) -> &'static str {
        match self {
            DirectionArg::ToInternal => "external_to_internal",
            DirectionArg::ToExternal => "internal_to_external",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show session, balances, intent and last transaction
    Status,
    /// Connect the wallet
    Connect,
    /// Disconnect the wallet
    Disconnect,
    /// Set the amount to exchange and show the quote
    Quote {
        #[arg(short, long, value_enum, default_value = "to-internal")]
        direction: DirectionArg,
        #[arg(short, long)]
        amount: String,
    },
    /// Use the full balance of the input token
    Max,
    /// Flip the exchange direction
    Toggle,
    /// Approve and exchange the current amount
    Execute,
    /// Look up an exchange by id
    Tx { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Status => client.get(format!("{}/status", base)).send().await?,
        Commands::Connect => client.post(format!("{}/connect", base)).send().await?,
        Commands::Disconnect => client.post(format!("{}/disconnect", base)).send().await?,
        Commands::Quote { direction, amount } => {
            client
                .post(format!("{}/intent", base))
                .json(&json!({ "direction": direction.as_wire(), "amount": amount }))
                .send()
                .await?
        }
        Commands::Max => client.post(format!("{}/intent/max", base)).send().await?,
        Commands::Toggle => client.post(format!("{}/intent/toggle", base)).send().await?,
        Commands::Execute => client.post(format!("{}/execute", base)).send().await?,
        Commands::Tx { id } => client.get(format!("{}/transactions/{}", base, id)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        match serde_json::from_str::<Value>(&text) {
            Ok(body) => eprintln!("{}", serde_json::to_string_pretty(&body)?),
            Err(_) if !text.is_empty() => eprintln!("Response: {}", text),
            Err(_) => {}
        }
        std::process::exit(1);
    }

    if text.is_empty() {
        println!("OK");
        return Ok(());
    }
    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
