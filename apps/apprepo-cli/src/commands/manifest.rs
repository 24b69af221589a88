use anyhow::{bail, Context, Result};
use apprepo_core::{InstallArgs, InstallHost, InstallOutcome, PromptRequest, Registry};
use apprepo_manifest::{load_manifest_with_report, ValidationReport, WebAppManifest};
use async_trait::async_trait;
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::Value;

#[derive(Subcommand)]
pub enum ManifestCmd {
    /// Validate a web application manifest file
    Validate(ManifestValidateArgs),
    /// Install a manifest into a scratch registry and print the dashboard view
    View(ManifestViewArgs),
}

#[derive(Args, Clone)]
pub struct ManifestValidateArgs {
    /// Path to the manifest (JSON)
    pub path: String,
    /// Emit JSON instead of a human summary
    #[arg(long)]
    pub json: bool,
    /// Pretty-print JSON (only with --json)
    #[arg(long, requires = "json")]
    pub pretty: bool,
    /// Treat warnings as errors (non-zero exit)
    #[arg(long)]
    pub strict_warnings: bool,
}

#[derive(Args, Clone)]
pub struct ManifestViewArgs {
    /// Path to the manifest (JSON)
    pub path: String,
    /// Origin recorded as the installer
    #[arg(long, default_value = "null")]
    pub origin: String,
    /// Print only the entry with this id (launch URL)
    #[arg(long)]
    pub id: Option<String>,
}

pub fn execute(cmd: ManifestCmd) -> Result<()> {
    match cmd {
        ManifestCmd::Validate(args) => cmd_validate(args),
        ManifestCmd::View(args) => cmd_view(args),
    }
}

#[derive(Serialize)]
struct ManifestReportOut {
    manifest: WebAppManifest,
    report: ValidationReport,
}

fn cmd_validate(args: ManifestValidateArgs) -> Result<()> {
    let path = args.path;
    let (manifest, report) = load_manifest_with_report(&path)
        .with_context(|| format!("loading manifest at {}", path))?;

    if args.json {
        let out = ManifestReportOut {
            manifest,
            report: report.clone(),
        };
        if args.pretty {
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            println!("{}", serde_json::to_string(&out)?);
        }
    } else {
        print_human(&manifest, &report);
    }

    if !report.errors.is_empty() {
        bail!(
            "manifest has {} error(s); fix and retry",
            report.errors.len()
        );
    }
    if args.strict_warnings && !report.warnings.is_empty() {
        bail!(
            "manifest has {} warning(s) (strict); address or drop --strict-warnings",
            report.warnings.len()
        );
    }
    Ok(())
}

fn print_human(manifest: &WebAppManifest, report: &ValidationReport) {
    let name = if manifest.name.is_empty() {
        "<unnamed>"
    } else {
        manifest.name.as_str()
    };
    println!("App: {}", name);
    if !manifest.base_url.is_empty() {
        println!("- launch: {}", manifest.launch_url());
    }
    if let Some(widget) = manifest.widget_url() {
        println!("- widget: {}", widget);
    }
    if let Some(icons) = manifest.icons.as_ref().filter(|icons| !icons.is_empty()) {
        let sizes = icons.keys().cloned().collect::<Vec<_>>().join(", ");
        println!("- icons: {}", sizes);
    }
    print_issues("Errors", &report.errors);
    print_issues("Warnings", &report.warnings);
}

fn print_issues(label: &str, issues: &[apprepo_manifest::ValidationIssue]) {
    if issues.is_empty() {
        println!("{}: none", label);
        return;
    }
    println!("{} ({}):", label, issues.len());
    for issue in issues {
        println!("  - {}: {}", issue.field, issue.message);
    }
}

/// Confirms every prompt and has no network.
struct ConfirmingHost;

#[async_trait]
impl InstallHost for ConfirmingHost {
    async fn fetch_manifest(&self, _url: &str) -> Option<String> {
        None
    }

    async fn prompt(&self, request: PromptRequest) -> bool {
        tracing::debug!(
            origin = %request.install_origin,
            app = %request.manifest.name,
            "auto-confirming install"
        );
        true
    }
}

fn cmd_view(args: ManifestViewArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.path)
        .with_context(|| format!("reading manifest at {}", args.path))?;
    let raw: Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing manifest at {}", args.path))?;

    let config = apprepo_core::resolve_config()?;
    let registry = Registry::from_config(&config);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .context("starting runtime")?;
    let outcome = runtime.block_on(registry.install(
        &args.origin,
        &InstallArgs::from_manifest(raw),
        &ConfirmingHost,
    ))?;
    if outcome == InstallOutcome::Denied {
        bail!("installation was not confirmed");
    }

    let mut views = registry.list()?;
    if let Some(id) = args.id.as_deref() {
        views.retain(|view| view.id == id);
        if views.is_empty() {
            bail!("no application exists with the id: {}", id);
        }
    }
    println!("{}", serde_json::to_string_pretty(&views)?);
    Ok(())
}
