//! Bikeshare forecast - Main Entry Point

use bikeshare_forecast::cli::{build_train_config, cmd_predict, cmd_train, Cli, Commands};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so predictions can be piped from stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bikeshare_forecast=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            config,
            data_dir,
            artifacts_dir,
            seed,
            holdout_fraction,
            lags,
        } => {
            let config = build_train_config(
                config.as_deref(),
                data_dir,
                artifacts_dir,
                seed,
                holdout_fraction,
                lags.as_deref(),
            )?;
            cmd_train(config)?;
        }
        Commands::Predict {
            model_path,
            date,
            data_dir,
            out,
        } => {
            cmd_predict(&model_path, date, &data_dir, out.as_deref())?;
        }
    }

    Ok(())
}
