//! officekit-export CLI
//!
//! Usage:
//!   officekit-export [--config FILE] export <excel|word|pdf> --request FILE --out FILE
//!   officekit-export [--config FILE] export-batch <KIND> --requests DIR --out DIR [--workers N]
//!   officekit-export [--config FILE] templates list [--pattern GLOB]
//!   officekit-export [--config FILE] templates init [--dir DIR]
//!   officekit-export [--config FILE] health
//!
//! Failures print a `{code, message}` JSON payload to stderr and exit 1.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::warn;
use serde_json::json;

use officekit_export::conf::C_CONFIG_PATH_DEFAULT;
use officekit_export::{
    EnumDocumentKind, ExportRequest, ExportService, ServiceError, SpecServiceConfig,
    export_batch, init_templates,
};
use officekit_io_xlsx::{ExportError, SpecCancelToken};

#[derive(Parser)]
#[command(name = "officekit-export")]
#[command(about = "Template-driven spreadsheet and PDF export")]
struct Cli {
    /// Service configuration (TOML); defaults apply when the file is missing
    #[arg(short, long, global = true, default_value = C_CONFIG_PATH_DEFAULT)]
    config: PathBuf,

    #[command(subcommand)]
    command: EnumCommand,
}

#[derive(Subcommand)]
enum EnumCommand {
    /// Export one request file
    Export {
        /// Document kind: excel, word or pdf
        #[arg(value_parser = parse_kind)]
        kind: EnumDocumentKind,
        /// Request JSON: {template_id, data_type, data}
        #[arg(long)]
        request: PathBuf,
        /// Output document path
        #[arg(long)]
        out: PathBuf,
    },
    /// Export every *.json request in a directory
    ExportBatch {
        #[arg(value_parser = parse_kind)]
        kind: EnumDocumentKind,
        #[arg(long)]
        requests: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Worker limit; defaults to `batch.num_workers_max`
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Template store commands
    Templates {
        #[command(subcommand)]
        command: EnumTemplatesCommand,
    },
    /// Print service status
    Health,
}

#[derive(Subcommand)]
enum EnumTemplatesCommand {
    /// List templates as JSON
    List {
        /// Glob matched against file names, e.g. `*.xlsx`
        #[arg(long)]
        pattern: Option<String>,
    },
    /// Write the standard spreadsheet templates
    Init {
        /// Template root; defaults to `template.path`
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn parse_kind(value: &str) -> Result<EnumDocumentKind, String> {
    EnumDocumentKind::parse(value).map_err(|e| e.to_string())
}

fn main() {
    let cli = Cli::parse();

    let cfg = match SpecServiceConfig::read(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => exit_with(&e),
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        cfg.as_ref()
            .map_or("info", |c| c.log.level.as_str()),
    ))
    .init();
    let cfg = cfg.unwrap_or_else(|| {
        warn!("config file {} not found; using defaults", cli.config.display());
        SpecServiceConfig::default()
    });

    if let Err(e) = run(cli.command, &cfg) {
        exit_with(&e);
    }
}

fn exit_with(err: &ServiceError) -> ! {
    eprintln!("{}", err.to_response().to_json());
    std::process::exit(1);
}

fn run(command: EnumCommand, cfg: &SpecServiceConfig) -> Result<(), ServiceError> {
    match command {
        EnumCommand::Export { kind, request, out } => run_export(cfg, kind, &request, &out),
        EnumCommand::ExportBatch {
            kind,
            requests,
            out,
            workers,
        } => {
            let service = ExportService::from_config(cfg)?;
            let report = export_batch(
                &service,
                kind,
                &requests,
                &out,
                workers.or(cfg.batch.num_workers_max),
                &SpecCancelToken::new(),
            )?;
            println!("{report}");
            for error in &report.errors {
                eprintln!("{}: {}", error.path.display(), error.exception);
            }
            if report.error_count() > 0 {
                return Err(ExportError::OperationFailed(format!(
                    "{} of {} requests failed",
                    report.error_count(),
                    report.cnt_scanned
                ))
                .into());
            }
            Ok(())
        }
        EnumCommand::Templates { command } => match command {
            EnumTemplatesCommand::List { pattern } => {
                let service = ExportService::from_config(cfg)?;
                let l_infos = service.store().list_all(pattern.as_deref())?;
                print_json(&l_infos)
            }
            EnumTemplatesCommand::Init { dir } => {
                let path_dir = dir.unwrap_or_else(|| cfg.template.path.clone());
                let l_paths = init_templates(&path_dir)?;
                for path in l_paths {
                    println!("{}", path.display());
                }
                Ok(())
            }
        },
        EnumCommand::Health => print_json(&json!({
            "status": "ok",
            "address": cfg.address(),
            "template_root": cfg.template.path,
        })),
    }
}

fn run_export(
    cfg: &SpecServiceConfig,
    kind: EnumDocumentKind,
    path_request: &Path,
    path_out: &Path,
) -> Result<(), ServiceError> {
    let text = fs::read_to_string(path_request)
        .map_err(|e| ServiceError::Io(format!("{}: {e}", path_request.display())))?;
    let request: ExportRequest = serde_json::from_str(&text)
        .map_err(|e| ExportError::Validation(format!("malformed request json: {e}")))?;

    let service = ExportService::from_config(cfg)?;
    let output = service.export_as(kind, &request, &SpecCancelToken::new())?;
    fs::write(path_out, &output.bytes)
        .map_err(|e| ServiceError::Io(format!("{}: {e}", path_out.display())))?;

    print_json(&json!({
        "path": path_out,
        "filename": output.filename,
        "content_type": output.content_type,
        "bytes": output.bytes.len(),
        "warnings": output.report.warnings(),
    }))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), ServiceError> {
    let text =
        serde_json::to_string_pretty(value).map_err(|e| ServiceError::Io(e.to_string()))?;
    println!("{text}");
    Ok(())
}
