//! Generate command implementation.
//!
//! Generates queue workers for every server reached from the scanned sources.
//! This command:
//! 1. Loads the declarations and resolves generator settings
//! 2. Scans each source file for function declaration sites
//! 3. Runs one assembly pass per source file over a shared run context
//! 4. Writes the worker files (extended in place with `--append`) and the
//!    import manifest

use super::common::{ConfigArgs, load_declarations};
use crate::sites::{SiteScanner, collect_sources};
use anyhow::{Context, Result};
use clap::Args;
use distributor_codegen::{
    Diagnostic, ImportManifest, MANIFEST_FILE_NAME, RunContext, WorkerAssembler,
};
use distributor_core::cli::{ExitCode, OutputFormat};
use distributor_core::{DeclarationModel, GeneratorConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Arguments of the `generate` command.
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Declaration file (JSON, or TOML with a `.toml` extension)
    #[arg(short, long, env = "DISTRIBUTOR_DECLARATIONS")]
    pub declarations: PathBuf,

    /// Source files or directories to scan for declaration sites
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// Extend existing workers instead of overwriting them
    ///
    /// Existing worker files count as initialized, so imports they already
    /// contain are not written again. Their imports are kept and their start
    /// routine is regenerated once with every queue function of the server.
    #[arg(long)]
    pub append: bool,

    /// Neither read nor write the import manifest
    #[arg(long)]
    pub no_manifest: bool,

    /// Exit with a non-zero code when any diagnostic was reported
    #[arg(long)]
    pub strict: bool,

    /// Generator settings
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// A worker file written by the command.
#[derive(Debug, Serialize)]
struct WrittenWorker {
    /// Server id
    server: String,
    /// Worker path
    path: String,
    /// Bytes written
    bytes: usize,
    /// Whether an existing worker was extended
    appended: bool,
}

/// Result of a generation run.
#[derive(Debug, Serialize)]
struct GenerationResult {
    /// Declaration file used
    declarations: String,
    /// Source files scanned
    sources: usize,
    /// Declaration sites visited
    sites: usize,
    /// Workers written
    workers: Vec<WrittenWorker>,
    /// Manifest path, if written
    manifest: Option<String>,
    /// Problems reported during generation
    diagnostics: Vec<Diagnostic>,
}

/// Runs the generate command.
///
/// # Errors
///
/// Returns an error if:
/// - The declarations or config file cannot be loaded
/// - A source cannot be found or read
/// - The output directory or a worker file cannot be written
///
/// Diagnostics (unknown functions, unreadable workers, ...) are not errors;
/// they are reported and only affect the exit code in `--strict` mode.
pub async fn run(args: GenerateArgs, output_format: OutputFormat) -> Result<ExitCode> {
    let model = load_declarations(&args.declarations)?;
    let config = args.config.resolve()?;

    info!(
        "Generating workers into {} ({} functions, {} servers)",
        config.output_dir.display(),
        model.functions().len(),
        model.servers().len()
    );

    fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| format!("failed to create {}", config.output_dir.display()))?;

    let mut ctx = prepare_context(&model, &config, &args).await?;

    let sources = collect_sources(&args.sources, std::slice::from_ref(&config.output_dir))?;
    let scanner = SiteScanner::new()?;
    let assembler = WorkerAssembler::new(&model, config.clone())
        .context("failed to initialize worker generator")?;

    let mut sites = 0;
    for source in &sources {
        let text = fs::read_to_string(source)
            .await
            .with_context(|| format!("failed to read source {}", source.display()))?;
        let pass = assembler.generate(scanner.scan(source, &text), &mut ctx);
        info!(
            "Scanned {}: {} sites, {} workers generated",
            source.display(),
            pass.sites,
            pass.generated.len()
        );
        sites += pass.sites;
    }

    let workers = write_workers(&ctx, &config).await?;

    let manifest = if args.no_manifest || workers.is_empty() {
        None
    } else {
        let path = config.output_dir.join(MANIFEST_FILE_NAME);
        let json = ctx.manifest_update().to_json()?;
        fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write manifest {}", path.display()))?;
        Some(path.display().to_string())
    };

    let has_diagnostics = ctx.has_diagnostics();
    let result = GenerationResult {
        declarations: args.declarations.display().to_string(),
        sources: sources.len(),
        sites,
        workers,
        manifest,
        diagnostics: ctx.diagnostics().to_vec(),
    };

    let formatted = crate::formatters::format_output(&result, output_format)?;
    println!("{formatted}");

    info!(
        "Generated {} workers with {} diagnostics",
        result.workers.len(),
        result.diagnostics.len()
    );

    if args.strict && has_diagnostics {
        return Ok(ExitCode::PARTIAL_OUTPUT);
    }
    Ok(ExitCode::SUCCESS)
}

/// Builds the run context.
///
/// In append mode existing workers are marked initialized and their text
/// seeds the server output, and the manifest of the previous run is loaded.
async fn prepare_context(
    model: &DeclarationModel,
    config: &GeneratorConfig,
    args: &GenerateArgs,
) -> Result<RunContext> {
    let mut ctx = RunContext::new();
    if !args.append {
        return Ok(ctx);
    }

    for server in model.servers() {
        let path = config.output_path(&server.id);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            continue;
        }
        match fs::read_to_string(&path).await {
            Ok(text) => ctx.seed_output(&server.id, &text),
            Err(e) => warn!("Cannot extend {}: {e}", path.display()),
        }
        ctx.mark_initialized(path);
    }

    if !args.no_manifest
        && let Some(manifest) = read_manifest(&config.output_dir.join(MANIFEST_FILE_NAME)).await
    {
        ctx = ctx.with_manifest(manifest);
    }

    Ok(ctx)
}

/// Reads a manifest left by a previous run.
///
/// A missing or unusable manifest is not fatal: deduplication falls back to
/// scanning the worker files.
async fn read_manifest(path: &Path) -> Option<ImportManifest> {
    let json = fs::read_to_string(path).await.ok()?;
    match ImportManifest::from_json(&json) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            warn!("Ignoring manifest {}: {e}", path.display());
            None
        }
    }
}

/// Writes the worker of every server generated this run.
///
/// Seeded text of servers that were not regenerated is left untouched.
async fn write_workers(ctx: &RunContext, config: &GeneratorConfig) -> Result<Vec<WrittenWorker>> {
    let mut written = Vec::with_capacity(ctx.outputs().len());

    for (server, code) in ctx.outputs().iter().filter(|(s, _)| ctx.is_generated(s)) {
        let path = config.output_path(server);
        let appended = ctx.is_initialized(&path);

        fs::write(&path, code)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        info!("Wrote worker for {server} to {}", path.display());
        written.push(WrittenWorker {
            server: server.to_string(),
            path: path.display().to_string(),
            bytes: code.len(),
            appended,
        });
    }

    Ok(written)
}
