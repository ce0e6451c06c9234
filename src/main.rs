use clap::Parser;
use cnpj_enricher::core::ConfigProvider;
use cnpj_enricher::utils::error::ErrorSeverity;
use cnpj_enricher::utils::{logger, validation::Validate};
use cnpj_enricher::{
    read_upload, CliConfig, EnrichError, EnrichmentEngine, EnrichmentPipeline, FieldCatalog,
    LocalStorage, LookupClient, TomlConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting cnpj-enricher");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let client = LookupClient::from_config(config.as_ref())?;
    tracing::info!("🔍 Discovering fields from {}", client.endpoint());
    let mut catalog = FieldCatalog::discover(&client, config.sample_identifier()).await;
    apply_selection(&mut catalog, config.selected_fields());

    if cli.list_fields {
        print_fields(&catalog, cli.filter.as_deref().unwrap_or(""));
        return Ok(());
    }

    if catalog.selection().is_empty() {
        tracing::warn!("No fields selected; the output will match the input");
    }

    let Some(input) = cli.input.as_deref() else {
        eprintln!("❌ Informe o arquivo CSV de entrada.");
        std::process::exit(1);
    };
    let input_storage = LocalStorage::new(".".to_string());
    let upload = match read_upload(&input_storage, input).await {
        Ok(upload) => upload,
        Err(e) => exit_with(&e),
    };

    let monitor_enabled = cli.monitor || config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = EnrichmentPipeline::new(client);
    let mut engine = EnrichmentEngine::new_with_monitoring(storage, pipeline, monitor_enabled);

    let report = match engine.run(upload, catalog.selection()).await {
        Ok(report) => report,
        Err(e) => exit_with(&e),
    };

    if report.is_success() {
        if let Some(message) = &report.message {
            println!("✅ {}", message);
        }
        if let Some(path) = &report.output_path {
            println!("📁 Output saved to: {}", path);
        }
        if let Some(summary) = &report.summary {
            tracing::info!("Run summary: {}", serde_json::to_string(summary)?);
        }
        return Ok(());
    }

    eprintln!("❌ {}", report.message.as_deref().unwrap_or("Falha no processamento."));
    std::process::exit(exit_code(report.severity.unwrap_or(ErrorSeverity::High)));
}

fn load_config(cli: &CliConfig) -> Result<Box<dyn ConfigProvider>, EnrichError> {
    match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            let config = TomlConfig::from_file(path)?;
            config.validate()?;
            Ok(Box::new(config))
        }
        None => {
            cli.validate()?;
            Ok(Box::new(cli.clone()))
        }
    }
}

/// An explicit field list replaces the default of "everything discovered".
fn apply_selection(catalog: &mut FieldCatalog, fields: &[String]) {
    if fields.is_empty() {
        return;
    }
    for field in fields {
        if !catalog.fields().contains(field) {
            tracing::warn!("Field '{}' was not offered by the service sample", field);
        }
    }
    let selection = catalog.selection_mut();
    selection.clear_all();
    for field in fields {
        selection.add(field.trim());
    }
}

fn print_fields(catalog: &FieldCatalog, filter: &str) {
    let visible = catalog.filter(filter);
    if visible.is_empty() {
        println!("Nenhum campo encontrado.");
        return;
    }
    for key in visible {
        let descriptor = FieldCatalog::descriptor(key);
        let mark = if catalog.selection().contains(key) { "x" } else { " " };
        println!("[{}] {:<40} {}", mark, key, descriptor.label);
    }
    println!(
        "{} de {} campos selecionados",
        catalog.selection().len(),
        catalog.fields().len()
    );
}

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn exit_with(e: &EnrichError) -> ! {
    tracing::error!(
        "❌ Enrichment failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Sugestão: {}", e.recovery_suggestion());
    std::process::exit(exit_code(e.severity()))
}
