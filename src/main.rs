use clap::Parser;
use mail_merge::adapters::{
    list_csv_files, list_template_files, probe_connection, ConnectionStatus, CsvRecordSource,
    EnvCredentialProvider, FileDraftComposer, FileTemplateInspector, HttpEmailLookup,
};
use mail_merge::domain::ports::CredentialProvider;
use mail_merge::utils::logger;
use mail_merge::{CliConfig, MergeEngine, MergeRequest, MergeSession};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting mail-merge CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate_config() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    // A directory instead of a file: show what it holds and bail.
    let csv_path = Path::new(&config.csv);
    if csv_path.is_dir() {
        eprintln!("❌ --csv expects a file; CSV files in {}:", config.csv);
        for (name, _) in list_csv_files(csv_path) {
            eprintln!("   {}", name);
        }
        std::process::exit(1);
    }
    let template_path = Path::new(&config.template);
    if template_path.is_dir() {
        eprintln!(
            "❌ --template expects a file; template files in {}:",
            config.template
        );
        for (name, _) in list_template_files(template_path) {
            eprintln!("   {}", name);
        }
        std::process::exit(1);
    }

    let credentials = EnvCredentialProvider::new();

    let build_lookup = || match HttpEmailLookup::new(&config.lookup_endpoint, config.connect_timeout_secs)
    {
        Ok(lookup) => lookup,
        Err(e) => {
            eprintln!("❌ Cannot build lookup client: {}", e);
            std::process::exit(1);
        }
    };

    if config.test_connection {
        let creds = match credentials.credentials() {
            Ok(creds) => creds,
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        };
        let status = probe_connection(
            Arc::new(build_lookup()),
            creds,
            Duration::from_secs(config.connect_timeout_secs),
        )
        .await;
        match status {
            ConnectionStatus::Connected => {
                tracing::info!("✅ Lookup endpoint reachable");
                println!("✅ Connection successful");
            }
            ConnectionStatus::Failed(reason) => {
                eprintln!("❌ Connection failed: {}", reason);
                std::process::exit(2);
            }
            ConnectionStatus::TimedOut => {
                eprintln!(
                    "❌ Connection timed out after {}s",
                    config.connect_timeout_secs
                );
                std::process::exit(2);
            }
        }
    }

    let transforms = match config.parsed_transforms() {
        Ok(transforms) => transforms,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let engine = MergeEngine::new(
        CsvRecordSource::new(),
        FileTemplateInspector::new(),
        build_lookup(),
        FileDraftComposer::new(&config.output_path),
        credentials,
    )
    .with_max_drafts(config.max_records);

    let request = MergeRequest {
        csv_path: PathBuf::from(&config.csv),
        template_path: PathBuf::from(&config.template),
        mode: config.merge_mode(),
        identifier_override: config.id_field.clone(),
        transforms,
    };

    let mut session = MergeSession::new();
    match engine.run(&mut session, &request).await {
        Ok(summary) => {
            tracing::info!("✅ Merge completed");
            println!("✅ Merge completed");
            println!("📄 Records processed: {}", summary.total_records);
            println!("📧 Addresses found: {}", summary.emails_found);
            println!("📁 Drafts created: {}", summary.drafts_created);
            if summary.truncated {
                println!("⚠ Record set exceeded the per-run cap; tail not processed");
            }
            if summary.skipped_no_email > 0 {
                println!("⚠ Skipped (no address): {}", summary.skipped_no_email);
            }
            if summary.failed > 0 {
                println!("❌ Failed: {}", summary.failed);
                std::process::exit(2);
            }
        }
        Err(e) => {
            tracing::error!("❌ Merge failed: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
