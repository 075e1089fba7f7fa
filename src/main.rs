use clap::Parser;
use prismic_nodes::utils::error::{ErrorSeverity, PrismicError};
use prismic_nodes::utils::{logger, validation::Validate};
use prismic_nodes::{
    parse_documents, CliConfig, HttpImageDownloader, ImagePolicy, LocalStorage, SourceEngine,
    SourceSummary, TomlConfig,
};
use std::path::Path;

async fn run(config: &CliConfig) -> Result<SourceSummary, PrismicError> {
    let toml_config = TomlConfig::from_file(&config.config)?;
    toml_config.validate()?;
    let base_dir = Path::new(&config.config)
        .parent()
        .unwrap_or_else(|| Path::new("."));
    let options = toml_config.into_plugin_options(base_dir)?;
    tracing::debug!("Plugin options: {:?}", options);

    let documents = parse_documents(&tokio::fs::read(&config.documents).await?)?;

    let storage = LocalStorage::new(config.output_path.clone());
    let download = !matches!(options.should_download_image, ImagePolicy::Always(false));
    let mut engine = SourceEngine::new(storage.clone(), options);
    if download {
        tracing::info!("Image download enabled");
        engine = engine.with_image_downloader(HttpImageDownloader::new(storage));
    }

    engine.run(documents).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting prismic-nodes");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        eprintln!("{}", e.user_friendly_message());
        std::process::exit(1);
    }

    match run(&config).await {
        Ok(summary) => {
            let output = Path::new(&config.output_path);
            tracing::info!(
                "Created {} nodes from {} documents",
                summary.node_count,
                summary.document_ids.len()
            );
            println!("Nodes written to {}", output.join("nodes.json").display());
            println!(
                "Type paths written to {}",
                output.join(&summary.type_paths_file).display()
            );
        }
        Err(e) => {
            tracing::error!(
                "Sourcing failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("{}", e.user_friendly_message());
            eprintln!("Suggestion: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
