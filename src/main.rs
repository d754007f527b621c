mod cli;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use cf_av::{FfmpegEngine, ToolRegistry};
use cf_core::config::Config;
use cf_core::events::EventPayload;
use cf_registry::{CommandNode, CommandRegistry, Selection};
use cf_session::{Artifact, Session};
use cf_workflow::StepConfigs;
use clap::Parser;
use cli::{Cli, Commands};
use tokio::sync::broadcast::error::RecvError;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "clipforge=trace,cf_session=trace,cf_av=trace,cf_registry=debug,cf_workflow=debug,cf_feature=debug,cf_core=debug".to_string()
        } else {
            "clipforge=info,cf_session=info,cf_av=info,cf_registry=warn,cf_workflow=warn,cf_feature=warn,cf_core=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::List { json } => {
            let config = Config::load_or_default(cli.config.as_deref());
            list_commands(&config, json)
        }
        Commands::Compile { path, steps, child } => {
            let config = Config::load_or_default(cli.config.as_deref());
            compile_command(&config, &path, steps.as_deref(), child)
        }
        Commands::Run {
            path,
            inputs,
            steps,
            child,
            output,
        } => {
            let config = Config::load_or_default(cli.config.as_deref());
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_command(
                config,
                &path,
                &inputs,
                steps.as_deref(),
                child,
                output,
            ))
        }
        Commands::CheckTools => {
            let config = Config::load_or_default(cli.config.as_deref());
            check_tools(&config)
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
    }
}

fn load_steps(path: Option<&Path>) -> Result<StepConfigs> {
    let Some(path) = path else {
        return Ok(StepConfigs::new());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read step configurations from {}", path.display()))?;
    Ok(StepConfigs::from_json(&contents)?)
}

fn selection(path: &str, child: Vec<usize>) -> Selection {
    child
        .into_iter()
        .fold(Selection::new(path), Selection::with_child)
}

fn list_commands(config: &Config, json: bool) -> Result<()> {
    let registry = CommandRegistry::builtin(&config.catalog)?;

    if json {
        println!("{}", serde_json::to_string_pretty(registry.roots())?);
        return Ok(());
    }

    fn print_node(node: &CommandNode, depth: usize) {
        let indent = "  ".repeat(depth);
        print!("{indent}{} ({})", node.command, node.kind);
        if !node.description.is_empty() {
            print!(" - {}", node.description);
        }
        println!();
        for child in &node.child {
            print_node(child, depth + 1);
        }
    }

    for root in registry.roots() {
        print_node(root, 0);
    }
    Ok(())
}

fn compile_command(
    config: &Config,
    path: &str,
    steps: Option<&Path>,
    child: Vec<usize>,
) -> Result<()> {
    let registry = CommandRegistry::builtin(&config.catalog)?;
    let configs = load_steps(steps)?;
    let pipeline = registry.compile(&selection(path, child), &configs)?;

    println!("{} ({} steps)", pipeline.name, pipeline.len());
    for step in &pipeline.steps {
        println!("  [{}] {}: {}", step.index, step.name(), step.command());
    }
    Ok(())
}

async fn run_command(
    config: Config,
    path: &str,
    inputs: &[PathBuf],
    steps: Option<&Path>,
    child: Vec<usize>,
    output: Option<PathBuf>,
) -> Result<()> {
    for input in inputs {
        if !input.exists() {
            anyhow::bail!("Input file does not exist: {:?}", input);
        }
    }

    let registry = Arc::new(CommandRegistry::builtin(&config.catalog)?);
    let tools = ToolRegistry::discover(&config.engine);
    let engine = Arc::new(FfmpegEngine::new(&tools, &config.engine)?);
    let mut session = Session::new(registry, engine.clone(), &config.session);

    session.select(vec![selection(path, child)])?;
    for (index, step_config) in load_steps(steps)?.iter() {
        session.configure(index, step_config.clone())?;
    }
    let pending = session.pending_configuration()?;
    if !pending.is_empty() {
        for step in &pending {
            println!(
                "Step {} ({}) needs a configuration; pass one with --steps",
                step.index,
                step.entry.name()
            );
        }
        anyhow::bail!("{} step(s) are not configured", pending.len());
    }

    let pipeline = session.submit()?;
    println!("Running {} ({} steps)", pipeline.name, pipeline.len());

    let abort = session.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted; abandoning run");
            abort.abort();
        }
    });

    let mut rx = session.events().subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match event.payload {
                    EventPayload::StepStarted { index, label, .. } => {
                        println!("  [{index}] {label}");
                    }
                    EventPayload::StepFailed { index, error, .. } => {
                        println!("  [{index}] failed: {error}");
                    }
                    _ => {}
                },
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let artifacts: Vec<Artifact> = inputs.iter().map(Artifact::from_path).collect();
    let report = session.run(artifacts).await?;

    let dest = match output {
        Some(dest) => dest,
        None => default_output(&inputs[0], &report.output.path),
    };
    let written = engine
        .workspace()
        .export(&report.output.path, &dest, None)?;

    println!("\nProcessing complete!");
    for step in &report.steps {
        println!(
            "  [{}] {} in {:.2}s",
            step.index,
            step.feature,
            step.elapsed.as_secs_f64()
        );
    }
    println!("Total encode time: {:.2}s", report.total_elapsed().as_secs_f64());
    println!("Output: {}", written.display());
    Ok(())
}

/// `<dir>/<stem>-clipforge.<ext>` next to the input, with the extension of
/// the produced artifact.
fn default_output(input: &Path, produced: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let mut name = format!("{stem}-clipforge");
    if let Some(ext) = produced.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    input.with_file_name(name)
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.engine).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to run pipelines.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)
                .with_context(|| format!("failed to read {}", p.display()))?;
            let config = Config::from_json(&contents)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Engine threads: {}", config.engine.effective_threads());
    println!("  Step timeout: {}s", config.engine.step_timeout_secs);
    println!("  Overwrite outputs: {}", config.engine.overwrite);
    println!("  Hidden features: {}", config.catalog.hidden_features.len());
    println!("  Disabled workflows: {}", config.catalog.disabled_workflows.len());

    let registry = CommandRegistry::builtin(&config.catalog)?;
    println!("  Commands: {}", registry.paths().len());

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &warnings {
            println!("  - {warning}");
        }
    }

    Ok(())
}
