//! Campaign Publisher CLI
//!
//! Multi-platform content campaign orchestrator

use anyhow::Result;
use campaign_publisher::core::config::{CampaignConfig, SAMPLE_CONFIG, StoreConfig};
use campaign_publisher::core::config_loader::{CONFIG_FILENAME, ConfigLoadOptions, ConfigLoader};
use campaign_publisher::{
    Campaign, CampaignError, CampaignOrchestrator, JsonFileCampaignStore, NewCampaign,
    OperationResult, PlatformRegistry, ProgressTracker, SchedulerOptions, SecureTokenManager,
};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// One-shot commands never tick; the daemon's recovery sweep picks campaigns up
const ONE_SHOT_INITIAL_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Multi-platform content campaign orchestrator
#[derive(Parser)]
#[command(name = "campaign-publisher")]
#[command(version = "0.1.0")]
#[command(about = "Multi-platform content campaign orchestrator", long_about = None)]
struct Cli {
    /// Project path (defaults to current directory)
    #[arg(long, global = true, value_name = "PROJECT_PATH")]
    project: Option<PathBuf>,

    /// Explicit configuration file (replaces ./.campaign-config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the campaign store path
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sample .campaign-config.yaml
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Run the scheduler daemon until interrupted
    Run,

    /// Create a campaign
    Create {
        #[arg(long)]
        name: String,

        /// Keyword (repeatable)
        #[arg(short, long = "keyword", required = true)]
        keywords: Vec<String>,

        /// Anchor text (repeatable)
        #[arg(short, long = "anchor", required = true)]
        anchors: Vec<String>,

        #[arg(long)]
        target_url: String,

        #[arg(long)]
        owner: String,

        /// Start immediately
        #[arg(long)]
        start: bool,
    },

    /// Start a draft or paused campaign
    Start { id: Uuid },

    /// Pause an active campaign
    Pause { id: Uuid },

    /// Resume a paused campaign
    Resume { id: Uuid },

    /// Delete a campaign
    Delete {
        id: Uuid,

        #[arg(long)]
        owner: String,
    },

    /// Show one campaign
    Show {
        id: Uuid,

        /// Print the raw record as JSON
        #[arg(long)]
        json: bool,
    },

    /// List campaigns of an owner
    List {
        #[arg(long)]
        owner: String,
    },

    /// Display campaign statistics
    Stats { id: Uuid },

    /// Display platform pool and statistics
    Platforms {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("campaign_publisher={}", default_level))),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli).await;

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{}", e);
            if let Some(campaign_error) = e.downcast_ref::<CampaignError>() {
                for action in campaign_error.suggested_actions() {
                    eprintln!("  💡 {}", action);
                }
            }
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let project_path = cli.project.clone().unwrap_or_else(|| PathBuf::from("."));

    if let Commands::Init { force } = cli.command {
        return init_command(project_path, force).await;
    }

    let env: HashMap<String, String> = std::env::vars().collect();
    let cli_overrides = cli.store.clone().map(|path| {
        let mut overrides = CampaignConfig::empty();
        overrides.store = Some(StoreConfig { path: Some(path) });
        overrides
    });

    let config = ConfigLoader::load(ConfigLoadOptions {
        project_path: project_path.clone(),
        config_file: cli.config.clone(),
        include_global: true,
        cli_overrides,
        env: env.clone(),
    })
    .await?;

    let daemon = matches!(cli.command, Commands::Run);
    let orchestrator = build_orchestrator(&config, &env, daemon).await?;

    let exit_code = match cli.command {
        Commands::Init { force } => init_command(project_path.clone(), force).await?,
        Commands::Run => run_command(&orchestrator, &config).await?,
        Commands::Create {
            name,
            keywords,
            anchors,
            target_url,
            owner,
            start,
        } => {
            let input = NewCampaign {
                name,
                keywords,
                anchor_texts: anchors,
                target_url,
                owner_id: owner,
                auto_start: start,
            };
            let result = orchestrator.create_campaign(input).await;
            report(&result, |campaign| {
                println!("✅ Campaign created: {}", campaign.id);
                println!("   Status: {}", campaign.status);
                println!("   Platforms available: {}", campaign.available_sites);
            })
        }
        Commands::Start { id } => {
            let result = orchestrator.start_campaign(id).await;
            report(&result, |c| println!("▶️  Campaign {} is {}", c.id, c.status))
        }
        Commands::Pause { id } => {
            let result = orchestrator.pause_campaign(id).await;
            report(&result, |c| println!("⏸️  Campaign {} is {}", c.id, c.status))
        }
        Commands::Resume { id } => {
            let result = orchestrator.resume_campaign(id).await;
            report(&result, |c| println!("▶️  Campaign {} resumed", c.id))
        }
        Commands::Delete { id, owner } => {
            let result = orchestrator.delete_campaign(id, &owner).await;
            report(&result, |_| println!("🗑️  Campaign {} deleted", id))
        }
        Commands::Show { id, json } => {
            let campaign = orchestrator.get_campaign(id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&campaign)?);
            } else {
                println!("{}", ProgressTracker::generate_campaign_summary(&campaign));
            }
            0
        }
        Commands::List { owner } => list_command(&orchestrator, &owner).await?,
        Commands::Stats { id } => {
            let stats = orchestrator.get_campaign_stats_by_id(id).await;
            println!("\n📊 Campaign Statistics\n");
            println!("- Articles published: {}", stats.articles_published);
            println!("- Platforms used: {}", stats.platforms_used);
            println!("- Total words: {}", stats.total_word_count);
            println!("- Attempts: {}", stats.current_rotation);
            println!("- Success rate: {:.1}%", stats.success_rate * 100.0);
            0
        }
        Commands::Platforms { json } => {
            let stats = orchestrator.get_platform_stats().await;
            if json {
                println!("{}", ProgressTracker::generate_json_export(&stats)?);
            } else {
                println!("\n📊 Platform Statistics\n");
                println!("{}", ProgressTracker::generate_platform_table(&stats));
            }
            0
        }
    };

    orchestrator.shutdown().await;
    Ok(exit_code)
}

async fn build_orchestrator(
    config: &CampaignConfig,
    env: &HashMap<String, String>,
    daemon: bool,
) -> Result<CampaignOrchestrator> {
    let tokens = SecureTokenManager::from_env(env);
    let registry = Arc::new(PlatformRegistry::from_config(config, &tokens).await?);
    let store = Arc::new(JsonFileCampaignStore::new(config.store_path()));

    let mut options = SchedulerOptions::from(config);
    if !daemon {
        options.initial_delay = ONE_SHOT_INITIAL_DELAY;
    }

    Ok(CampaignOrchestrator::new(
        store,
        registry,
        options,
        config.random_seed,
    ))
}

/// Print a mutation outcome and map it to an exit code
fn report<T>(result: &Result<T, CampaignError>, on_success: impl FnOnce(&T)) -> i32 {
    let outcome = OperationResult::from(result);
    match result {
        Ok(value) => {
            on_success(value);
            0
        }
        Err(e) => {
            eprintln!(
                "❌ {} ({})",
                outcome.error.unwrap_or_default(),
                outcome.code.unwrap_or_default()
            );
            for action in e.suggested_actions() {
                eprintln!("  💡 {}", action);
            }
            1
        }
    }
}

async fn run_command(orchestrator: &CampaignOrchestrator, config: &CampaignConfig) -> Result<i32> {
    println!("\n🚀 Campaign scheduler running (Ctrl+C to stop)\n");

    let recovered = orchestrator.recover().await?;
    info!(recovered, "initial recovery sweep done");

    let mut sweep = tokio::time::interval(config.recovery_interval().max(Duration::from_secs(1)));
    sweep.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = sweep.tick() => {
                if let Err(e) = orchestrator.recover().await {
                    warn!(error = %e, "recovery sweep failed");
                }
            }
        }
    }

    println!("\n⏹️  Stopping, waiting for in-flight attempts...");
    Ok(0)
}

async fn list_command(orchestrator: &CampaignOrchestrator, owner: &str) -> Result<i32> {
    let campaigns: Vec<Campaign> = orchestrator.get_user_campaigns(owner).await?;

    if campaigns.is_empty() {
        println!("No campaigns for {}", owner);
        return Ok(0);
    }

    println!("| ID | Name | Status | Links | Progress |");
    println!("|----|------|--------|-------|----------|");
    for campaign in &campaigns {
        let stats = orchestrator.get_campaign_stats(campaign);
        println!(
            "| {} | {} | {} | {} | {}/{} |",
            campaign.id,
            campaign.name,
            campaign.status,
            campaign.links_built(),
            stats.completed_platforms,
            stats.total_platforms
        );
    }

    Ok(0)
}

async fn init_command(project_path: PathBuf, force: bool) -> Result<i32> {
    println!("\n🎯 Initialize campaign-publisher\n");

    let config_path = project_path.join(CONFIG_FILENAME);
    if fs::metadata(&config_path).await.is_ok() && !force {
        eprintln!(
            "⚠️  {} already exists (use --force to overwrite)",
            config_path.display()
        );
        return Ok(1);
    }

    fs::write(&config_path, SAMPLE_CONFIG).await?;
    println!("✅ Wrote {}", config_path.display());
    println!("   Set CAMPAIGN_WEBHOOK_URL and CAMPAIGN_WEBHOOK_TOKEN before `campaign-publisher run`.");
    Ok(0)
}
