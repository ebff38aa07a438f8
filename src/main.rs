use anyhow::Context;
use bank_frontend::{
    commands::commands_from_path, fixedpoint::fixed_point_to_string, CommandError, LoginMode,
    Session, SessionConfig,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
struct Args {
    /// Current accounts file, 37 columns per line
    accounts_filepath: PathBuf,
    /// CSV script: command,account,target,amount,plan,payee,holder
    commands_filepath: PathBuf,
    /// Log in as this account holder; without it the session is an admin login
    #[clap(long)]
    holder: Option<String>,
    /// TOML session configuration
    #[clap(long)]
    config: Option<PathBuf>,
    /// Directory for the transaction file, overrides the configuration
    #[clap(long)]
    out_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::default(),
    };
    if let Some(out_dir) = args.out_dir {
        config.output_dir = out_dir;
    }

    let mode = match args.holder {
        Some(holder) => LoginMode::Standard { holder },
        None => LoginMode::Admin,
    };

    let mut session = Session::new(config);
    info!(
        out_dir = %session.config().output_dir.display(),
        "transaction file destination"
    );
    session
        .login(&args.accounts_filepath, mode)
        .context("login failed")?;

    let commands = commands_from_path(&args.commands_filepath)
        .with_context(|| format!("cannot open {}", args.commands_filepath.display()))?;
    for command in commands {
        match session.execute(&command) {
            Ok(transaction) => info!(
                sequence = transaction.sequence,
                kind = %transaction.r#type,
                account = transaction.source,
                amount = %fixed_point_to_string(transaction.amount),
                "accepted"
            ),
            // Already logged by the session.
            Err(CommandError::Rejected(_)) => {}
            Err(err @ CommandError::Defect(_)) => {
                error!(%err, "ledger refused an approved command")
            }
            Err(CommandError::NotLoggedIn) => warn!("command issued outside a session"),
        }
    }

    let written = session.logout_today().context("logout failed")?;
    println!("{}", written.display());
    Ok(())
}
