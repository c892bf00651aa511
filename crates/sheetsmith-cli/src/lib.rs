//! Sheetsmith command-line front end
//!
//! - `generate`: run a profile through the provider chain
//! - `validate`: check an application file against the output validator
//! - `providers`: print the resolved provider chain

#![warn(unreachable_pub)]
#![allow(missing_docs)]

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use sheetsmith_core::{
    GenerationResult, OrchestratorConfig, ProviderOrchestrator, ProviderRegistry,
};
use sheetsmith_model::{
    DependencyManifest, GeneratedCode, GenerationRequest, ModelSelection, Profile,
};
use sheetsmith_validator::{OutputValidator, Verdict};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command definition
#[must_use]
pub fn cli() -> Command {
    Command::new("sheetsmith")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Turn spreadsheet profiles into validated Streamlit applications")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("generate")
                .about("Generate an application from a profile")
                .arg(
                    Arg::new("profile")
                        .long("profile")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Profile JSON file"),
                )
                .arg(
                    Arg::new("instructions")
                        .long("instructions")
                        .help("Custom instructions for the generator"),
                )
                .arg(
                    Arg::new("analysis-model")
                        .long("analysis-model")
                        .help("Model for the analysis stage"),
                )
                .arg(
                    Arg::new("generation-model")
                        .long("generation-model")
                        .help("Model for the generation stage"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the result JSON here instead of stdout"),
                )
                .arg(
                    Arg::new("emit-dir")
                        .long("emit-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write app.py and requirements.txt into this directory"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate an application file")
                .arg(
                    Arg::new("app")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Python source file"),
                )
                .arg(
                    Arg::new("requirements")
                        .long("requirements")
                        .value_parser(value_parser!(PathBuf))
                        .help("requirements.txt declaring the dependencies"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the verdict as JSON"),
                ),
        )
        .subcommand(Command::new("providers").about("Print the resolved provider chain"))
}

/// Install the tracing subscriber on stderr
///
/// `RUST_LOG` controls the filter; the default is `info`.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load configuration, then apply environment overrides
///
/// # Errors
/// Unreadable or invalid configuration
pub fn load_config(path: Option<&Path>) -> Result<OrchestratorConfig> {
    let config = match path {
        Some(path) => OrchestratorConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => OrchestratorConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

/// Build an orchestrator with HTTP-backed remote providers
///
/// # Errors
/// Invalid configuration
pub fn build_orchestrator(config: OrchestratorConfig) -> Result<ProviderOrchestrator> {
    let registry = ProviderRegistry::from_config(&config, |var| std::env::var(var).ok())?;
    Ok(ProviderOrchestrator::new(config, &registry)?)
}

/// Options for `generate`
#[derive(Debug, Clone, Default)]
pub struct GenerateArgs {
    pub profile: PathBuf,
    pub instructions: Option<String>,
    pub analysis_model: Option<String>,
    pub generation_model: Option<String>,
}

impl GenerateArgs {
    fn from_matches(args: &ArgMatches) -> Result<Self> {
        let Some(profile) = args.get_one::<PathBuf>("profile") else {
            bail!("--profile is required");
        };
        Ok(Self {
            profile: profile.clone(),
            instructions: args.get_one::<String>("instructions").cloned(),
            analysis_model: args.get_one::<String>("analysis-model").cloned(),
            generation_model: args.get_one::<String>("generation-model").cloned(),
        })
    }

    /// Read the profile and build the request
    ///
    /// # Errors
    /// Unreadable profile file or undecodable JSON
    pub fn request(&self) -> Result<GenerationRequest> {
        let text = std::fs::read_to_string(&self.profile)
            .with_context(|| format!("reading {}", self.profile.display()))?;
        let profile = Profile::from_json(&text)
            .with_context(|| format!("decoding {}", self.profile.display()))?;
        Ok(GenerationRequest::new(profile)
            .with_instructions(self.instructions.clone().unwrap_or_default())
            .with_models(ModelSelection {
                analysis: self.analysis_model.clone(),
                generation: self.generation_model.clone(),
            }))
    }
}

/// Run one generation
///
/// # Errors
/// Unreadable profile or a terminal fallback that could not be built
pub async fn generate(orchestrator: &ProviderOrchestrator, args: &GenerateArgs) -> Result<GenerationResult> {
    let request = args.request()?;
    Ok(orchestrator.generate(&request).await?)
}

/// Write `app.py` and `requirements.txt`
///
/// # Errors
/// I/O failure
pub fn emit_project(result: &GenerationResult, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut app = result.code.clone();
    if !app.ends_with('\n') {
        app.push('\n');
    }
    std::fs::write(dir.join("app.py"), app)?;
    std::fs::write(dir.join("requirements.txt"), result.requirements())?;
    Ok(())
}

/// Validate an application file
///
/// Without a requirements file the declared manifest is empty.
///
/// # Errors
/// Unreadable input files
pub fn validate_file(config: &OrchestratorConfig, app: &Path, requirements: Option<&Path>) -> Result<Verdict> {
    let source = std::fs::read_to_string(app).with_context(|| format!("reading {}", app.display()))?;
    let declared = match requirements {
        Some(path) => DependencyManifest::from_requirements(
            &std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
        ),
        None => DependencyManifest::new(),
    };
    let validator = OutputValidator::new(config.validator.clone());
    Ok(validator.validate(&GeneratedCode::new(source, declared)))
}

/// Human-readable verdict
#[must_use]
pub fn render_verdict(verdict: &Verdict) -> String {
    let mut out = String::new();
    let status = if verdict.is_pass() { "PASS" } else { "FAIL" };
    let _ = writeln!(out, "{status}");
    for violation in verdict.violations() {
        let _ = writeln!(out, "  {violation}");
    }
    for advisory in verdict.advisories() {
        match advisory.line {
            Some(line) => {
                let _ = writeln!(out, "  advisory: {} at line {line}", advisory.kind.as_str());
            }
            None => {
                let _ = writeln!(out, "  advisory: {}", advisory.kind.as_str());
            }
        }
    }
    let imports: Vec<&str> = verdict.imports().names().collect();
    let _ = writeln!(out, "  imports: {}", imports.join(", "));
    out
}

/// Human-readable provider chain
#[must_use]
pub fn describe_chain(orchestrator: &ProviderOrchestrator) -> String {
    let mut out = String::new();
    for (position, link) in orchestrator.chain().iter().enumerate() {
        let budget = if link.timeout.is_zero() {
            "unbounded".to_string()
        } else {
            format!("{}ms", link.timeout.as_millis())
        };
        let _ = writeln!(out, "{}. {} ({}, {budget})", position + 1, link.id, link.tier);
    }
    out
}

/// Dispatch a parsed command line
///
/// # Errors
/// Any failure the subcommand reports
pub async fn run(matches: &ArgMatches) -> Result<ExitCode> {
    let config = load_config(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;

    match matches.subcommand() {
        Some(("generate", args)) => {
            let options = GenerateArgs::from_matches(args)?;
            let orchestrator = build_orchestrator(config)?;
            let result = generate(&orchestrator, &options).await?;
            info!(
                provider = %result.provider,
                state = %result.state,
                confidence = result.confidence,
                "generation finished"
            );

            if let Some(dir) = args.get_one::<PathBuf>("emit-dir") {
                emit_project(&result, dir)?;
            }
            let json = result.to_json_pretty()?;
            match args.get_one::<PathBuf>("output") {
                Some(path) => std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?,
                None => println!("{json}"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(("validate", args)) => {
            let Some(app) = args.get_one::<PathBuf>("app") else {
                bail!("missing application file");
            };
            let requirements = args.get_one::<PathBuf>("requirements").map(PathBuf::as_path);
            let verdict = validate_file(&config, app, requirements)?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&verdict)?);
            } else {
                print!("{}", render_verdict(&verdict));
            }
            Ok(if verdict.is_pass() { ExitCode::SUCCESS } else { ExitCode::from(1) })
        }
        Some(("providers", _)) => {
            let orchestrator = build_orchestrator(config)?;
            print!("{}", describe_chain(&orchestrator));
            Ok(ExitCode::SUCCESS)
        }
        _ => bail!("unknown command"),
    }
}
