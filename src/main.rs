//! Menu forecast - Main Entry Point

use clap::Parser;
use menu_forecast::cli::{cmd_list, cmd_predict, cmd_serve, cmd_train, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "menu_forecast=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { restaurant, item, data, storage, uploads, trees, seed } => {
            cmd_train(&restaurant, &item, &data, &storage, &uploads, trees, seed)?;
        }
        Commands::Predict {
            restaurant,
            item,
            meal_period,
            weather,
            day_of_week,
            date,
            holiday,
            temperature,
            avg,
            storage,
            uploads,
            json,
        } => {
            cmd_predict(
                &restaurant,
                &item,
                &meal_period,
                &weather,
                day_of_week.as_deref(),
                date.as_deref(),
                holiday,
                temperature,
                avg,
                &storage,
                &uploads,
                json,
            )?;
        }
        Commands::List { restaurant, storage } => {
            cmd_list(&restaurant, &storage)?;
        }
        Commands::Serve { port, host } => {
            cmd_serve(&host, port).await?;
        }
    }

    Ok(())
}
