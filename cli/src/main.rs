use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod closer;
mod commands;
mod util;

use commands::close::CloseArgs;

#[derive(Parser)]
#[command(name = "adieu", version, about = "Permanently close your account, after typing it back to confirm")]
struct Cli {
    /// API base URL
    #[arg(long, env = "ADIEU_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Domain suffix used for phone-number logins (e.g. "@sms.example.net")
    #[arg(long, env = "ADIEU_SMS_DOMAIN")]
    sms_domain: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Close your account. Interactive unless --confirm-contact is given.
    Close(CloseArgs),
    /// Show the contact you would have to type back to close the account
    Whoami,
}

fn init_tracing() {
    // stdout is reserved for JSON results
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adieu=warn,adieu_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Close(args) => commands::close::run(&cli.api_url, cli.sms_domain, args).await,
        Commands::Whoami => commands::whoami::run(cli.sms_domain),
    };

    std::process::exit(code);
}
