// Command-line interface for the token generator
//
// Generates feature-customized Solidity contracts from marker-annotated
// templates and drives hardhat to compile and verify them.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use generator_core::config::{ConfigManager, Environment, GeneratorConfig, LogConfig};
use generator_core::contract::{
    ContractName, ContractType, DisabledFeatures, GenerateContractRequest, GeneratedContract,
    TokenArguments, VerifyContractRequest,
};
use generator_core::editor::{clean, ContentEditor, EditMode, MarkerMatching};
use generator_hardhat::ProcessRunner;
use generator_service::{ContractService, JobQueue, JobStatus, CONTRACT_QUEUE};

#[derive(Parser)]
#[command(name = "token-generator")]
#[command(about = "Generate, compile and verify customized token contracts")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "token-generator.toml")]
    config: PathBuf,

    /// Environment to run in
    #[arg(short, long, global = true, default_value = "development")]
    env: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply one marker edit to a file and print the result
    Edit {
        /// Input file, `-` for stdin
        file: PathBuf,

        /// Edit mode (LINE, RANGE or REPLACE)
        #[arg(short, long)]
        mode: String,

        /// Marker pattern, e.g. `supplyCap`
        #[arg(short, long)]
        pattern: String,

        /// Replacement for REPLACE edits
        #[arg(short, long)]
        replacement: Option<String>,

        /// Marker matching rule, overrides the configuration
        #[arg(long)]
        matching: Option<MarkerMatching>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Strip marker comments from a file
    Clean {
        /// Input file, `-` for stdin
        file: PathBuf,

        /// Patterns to strip, defaults to the configured marker patterns
        #[arg(long, value_delimiter = ',')]
        patterns: Vec<String>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate a contract from its template
    Generate {
        #[command(flatten)]
        target: TargetArgs,

        /// Features to disable (supplyCap, mint, burn, adminBurn, pause, adminTransfer)
        #[arg(short, long, value_delimiter = ',')]
        disable: Vec<String>,
    },
    /// Compile generated contracts with hardhat
    Compile,
    /// Verify a deployed contract
    Verify(VerifyArgs),
    /// Remove a generated contract
    Remove {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Print the ABI, bytecode and source name of a compiled contract
    Abi {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Run a compile or verify job through the job queue and follow its status
    Submit {
        #[command(subcommand)]
        job: SubmitJob,
    },
    /// List verification networks
    Chains,
    /// Write a default configuration file
    InitConfig {
        /// Output path, the extension selects the format
        #[arg(short, long, default_value = "token-generator.toml")]
        output: PathBuf,
    },
    /// Validate the configuration
    ValidateConfig,
}

#[derive(Subcommand)]
enum SubmitJob {
    /// Queue a compile job
    Compile {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Queue a verify job
    Verify(VerifyArgs),
}

#[derive(Args)]
struct TargetArgs {
    /// Contract type (erc20, erc721, erc1155)
    #[arg(short = 't', long = "type")]
    contract_type: ContractType,

    /// Contract name
    #[arg(short, long)]
    name: String,
}

impl TargetArgs {
    fn target(&self) -> Result<GeneratedContract> {
        Ok(GeneratedContract::new(
            self.contract_type,
            ContractName::new(self.name.as_str())?,
        ))
    }
}

#[derive(Args)]
struct VerifyArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Chain symbol, e.g. JFIN
    #[arg(long)]
    chain: String,

    /// Deployed contract address
    #[arg(long)]
    address: String,

    /// JSON file with the constructor arguments
    #[arg(long)]
    args: PathBuf,
}

impl VerifyArgs {
    async fn request(&self) -> Result<VerifyContractRequest> {
        let raw = tokio::fs::read_to_string(&self.args)
            .await
            .with_context(|| format!("Failed to read constructor arguments: {}", self.args.display()))?;
        let body: TokenArguments = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid constructor arguments in {}", self.args.display()))?;

        Ok(VerifyContractRequest {
            contract_type: self.target.contract_type,
            contract_name: ContractName::new(self.target.name.as_str())?,
            chain_name: self.chain.clone(),
            address: self.address.clone(),
            source_name: None,
            body,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let environment: Environment = cli.env.parse()?;
    let manager = ConfigManager::load_for_environment(&cli.config, environment)?;
    init_tracing(&manager.config().logging)?;
    debug!(config = %manager.config_path().display(), %environment, "configuration loaded");

    match cli.command {
        Commands::InitConfig { output } => {
            ConfigManager::generate_default_config(&output, environment)?;
            println!("Wrote {} configuration to {}", environment, output.display());
            return Ok(());
        }
        Commands::ValidateConfig => {
            return validate_config(&manager);
        }
        command => {
            if let Err(errors) = manager.validate() {
                for error in &errors {
                    eprintln!("{}", error);
                }
                anyhow::bail!("Invalid configuration: {} error(s)", errors.len());
            }
            run(command, manager.config()).await?;
        }
    }

    Ok(())
}

fn init_tracing(log: &LogConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&log.level)
            .with_context(|| format!("Invalid log level: {}", log.level))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match log.format.as_str() {
        "json" => builder.json().init(),
        "compact" => builder.compact().init(),
        _ => builder.pretty().init(),
    }

    Ok(())
}

fn validate_config(manager: &ConfigManager) -> Result<()> {
    match manager.validate() {
        Ok(()) => {
            println!("Configuration is valid: {}", manager.config_path().display());
            Ok(())
        }
        Err(errors) => {
            for error in &errors {
                eprintln!("{}", error);
            }
            anyhow::bail!("Invalid configuration: {} error(s)", errors.len())
        }
    }
}

async fn run(command: Commands, config: &GeneratorConfig) -> Result<()> {
    let service = ContractService::new(config, Arc::new(ProcessRunner::new()));

    match command {
        Commands::Edit {
            file,
            mode,
            pattern,
            replacement,
            matching,
            output,
        } => {
            let mode: EditMode = mode.parse()?;
            let editor = ContentEditor::new(matching.unwrap_or(config.editor.matching));
            let content = read_input(&file).await?;
            let edited = editor.edit(&content, mode, &pattern, replacement.as_deref())?;
            write_output(output.as_deref(), &edited).await?;
        }
        Commands::Clean {
            file,
            patterns,
            output,
        } => {
            let patterns = if patterns.is_empty() {
                config.editor.marker_patterns.clone()
            } else {
                patterns
            };
            let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();
            let content = read_input(&file).await?;
            let cleaned = clean(&content, &patterns)?;
            write_output(output.as_deref(), &cleaned).await?;
        }
        Commands::Generate { target, disable } => {
            let request = GenerateContractRequest {
                contract_type: target.contract_type,
                contract_name: ContractName::new(target.name.as_str())?,
                disable: DisabledFeatures::from_names(&disable)?,
            };
            let path = service.generate_contract(&request).await?;
            println!("{}", path);
        }
        Commands::Compile => {
            let output = service.compile_contract().await?;
            println!("{}", output);
        }
        Commands::Verify(args) => {
            let output = service.verify_contract(&args.request().await?).await?;
            println!("{}", output);
        }
        Commands::Remove { target } => {
            let target = target.target()?;
            service.remove_contract(&target).await?;
            println!("Removed {}", target.relative_path());
        }
        Commands::Abi { target } => {
            let abi = service.read_abi(&target.target()?).await?;
            println!("{}", serde_json::to_string_pretty(&abi)?);
        }
        Commands::Submit { job } => {
            let status = submit(job, config, service).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Chains => {
            for chain in service.chains().chains() {
                println!(
                    "{:<8} {:>6}  {}  {}",
                    chain.symbol, chain.chain_id, chain.rpc_url, chain.explorer_url
                );
            }
        }
        Commands::InitConfig { .. } | Commands::ValidateConfig => {}
    }

    Ok(())
}

/// Queue one job, wait for it to finish and return its final status
async fn submit(
    job: SubmitJob,
    config: &GeneratorConfig,
    service: ContractService<ProcessRunner>,
) -> Result<JobStatus> {
    let queue = JobQueue::new(CONTRACT_QUEUE, config.queue.clone());

    let id = match job {
        SubmitJob::Compile { target } => queue.add_compile_job(target.target()?).await?,
        SubmitJob::Verify(args) => queue.add_verify_job(args.request().await?).await?,
    };
    info!(job_id = id, "job submitted");

    queue.start(Arc::new(service)).await;

    let mut last_progress = None;
    let status = loop {
        let status = queue.job_status(id).await?;
        if last_progress != Some(status.progress) {
            info!(job_id = id, state = %status.state, progress = status.progress, "job status");
            last_progress = Some(status.progress);
        }
        if status.is_completed || status.is_failed {
            break status;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    };

    queue.shutdown().await;
    Ok(status)
}

async fn read_input(file: &Path) -> Result<String> {
    if file == Path::new("-") {
        let mut content = String::new();
        tokio::io::stdin().read_to_string(&mut content).await?;
        return Ok(content);
    }
    tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))
}

async fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            print!("{}", content);
            std::io::stdout().flush()?;
            Ok(())
        }
    }
}
