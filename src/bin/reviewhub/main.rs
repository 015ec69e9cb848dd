use actix_web::middleware::Logger;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use reviewhub::app_config;
use reviewhub::db::{get_db_pool, init_db};
use reviewhub::reference::REFERENCE_INDEX;
use reviewhub::{schema, verifier};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "reviewhub")]
#[command(about = "Review platform deletion and consistency service")]
struct Cli {
    /// Create missing tables and indexes before starting
    #[arg(long)]
    init_schema: bool,

    /// Run one orphan sweep, print the report as JSON and exit
    #[arg(long)]
    sweep: bool,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_lib_mods();
    init_our_mods();

    let database_url = app_config::database()
        .resolve_url()
        .context("DATABASE_URL or database.url must be set")?;
    init_db(database_url)
        .await
        .context("Failed to connect to database")?;
    let db = get_db_pool();

    if cli.init_schema {
        schema::create_tables(db)
            .await
            .context("Failed to create tables")?;
        log::info!("Schema initialized");
    }

    // A descriptor that names a missing table or column would make cascades
    // silently skip records, so refuse to start.
    REFERENCE_INDEX
        .validate(db)
        .await
        .context("Reference index does not match the database schema")?;

    let sweep_config = app_config::sweep();

    if cli.sweep {
        let report = verifier::sweep_orphans(db).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if sweep_config.on_startup {
        verifier::sweep_orphans(db).await?;
    }

    if sweep_config.enabled && sweep_config.interval_seconds > 0 {
        actix_web::rt::spawn(async move {
            let mut interval =
                actix_web::rt::time::interval(Duration::from_secs(sweep_config.interval_seconds));
            // First tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = verifier::sweep_orphans(get_db_pool()).await {
                    log::warn!("Scheduled orphan sweep failed: {}", e);
                }
            }
        });
    }

    let bind_address = app_config::server().bind_address;
    log::info!("Listening on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(get_db_pool().clone()))
            .wrap(Logger::new("%a %r %s %Dms"))
            .configure(reviewhub::web::configure)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}

/// Initialize third party crates we rely on but don't have control over.
pub fn init_lib_mods() {
    // Load .env first so RUST_LOG from it reaches the logger.
    let dotenv_result = dotenv::dotenv();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(e) = dotenv_result {
        log::debug!("No .env loaded: {}", e);
    }
}

/// Initialize all local mods.
pub fn init_our_mods() {
    app_config::init();
    once_cell::sync::Lazy::force(&REFERENCE_INDEX);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from(["reviewhub"]).unwrap();
        assert!(!cli.init_schema);
        assert!(!cli.sweep);

        let cli = Cli::try_parse_from(["reviewhub", "--init-schema", "--sweep"]).unwrap();
        assert!(cli.init_schema);
        assert!(cli.sweep);
    }

    #[test]
    fn test_cli_rejects_unknown_flags() {
        assert!(Cli::try_parse_from(["reviewhub", "--sweeep"]).is_err());
        assert!(Cli::try_parse_from(["reviewhub", "sweep"]).is_err());
    }
}
