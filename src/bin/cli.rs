use clap::{Parser, Subcommand};
use dotenvy::dotenv;

use spay::cli::promote_user;
use spay::spay_config::DatabaseConfig;
use spay::spay_db::{init_db_pool, run_migrations};
use spay::spay_models::GlobalRole;

#[derive(Parser)]
#[command(name = "spay-cli")]
#[command(about = "SPAY CLI - Administrative tools for the SPAY API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Change the global role of a user
    Promote {
        /// Auth id or email of the user
        #[arg(short = 'u', long)]
        user: String,

        /// merchant, manager or admin
        #[arg(short = 'r', long, value_parser = parse_role)]
        role: GlobalRole,
    },
}

fn parse_role(value: &str) -> Result<GlobalRole, String> {
    GlobalRole::from_name(value)
        .ok_or_else(|| format!("unknown role `{value}`, expected merchant, manager or admin"))
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command).await {
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> anyhow::Result<()> {
    let pool = init_db_pool(&DatabaseConfig::from_env()?).await?;

    match command {
        Commands::Migrate => {
            run_migrations(&pool).await?;
            println!("✅ Migrations applied");
        }
        Commands::Promote { user, role } => {
            let promoted = promote_user(&pool, &user, role).await?;
            println!("✅ {} is now {}", promoted.email, role);
        }
    }

    Ok(())
}
