// Hook entry point for one cairn node

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use cairn_agent::handlers::ContextFile;
use cairn_agent::{dispatch, production_collaborators, ClusterAgent, Hook, HookArgs};
use cairn_core::{RelationId, ResourceId, ServiceConfig};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cairn")]
#[command(
    about = "Cairn - membership and role coordination for replicated database clusters",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Service configuration file (TOML or JSON)
    #[arg(short, long, global = true, default_value = "/etc/cairn/cairn.toml")]
    config: PathBuf,

    /// Event context written by the orchestrator
    #[arg(long, global = true, default_value = "/run/cairn/context.json")]
    context: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the handler for a lifecycle hook
    Hook {
        /// Hook name, e.g. cluster-relation-changed
        name: String,

        /// Relation the hook fired on (kind:number)
        #[arg(short, long)]
        relation: Option<String>,

        /// Resource whose leadership changed
        #[arg(long)]
        resource: Option<String>,
    },

    /// Show node state, topology and leadership
    Status,

    /// Print the configuration the next pass would apply
    Render,
}

fn load_config(path: &Path) -> anyhow::Result<ServiceConfig> {
    let mut config = if path.exists() {
        ServiceConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?
    } else {
        tracing::debug!(path = %path.display(), "no configuration file, using defaults");
        ServiceConfig::default()
    };
    config.merge_with_env()?;
    config.validate()?;
    Ok(config)
}

async fn run_hook(
    agent: &mut ClusterAgent,
    name: &str,
    relation: Option<String>,
    resource: Option<String>,
) -> anyhow::Result<()> {
    let hook = match name.parse::<Hook>() {
        Ok(hook) => hook,
        Err(e) => {
            tracing::info!(hook = %name, "{e}, skipping");
            return Ok(());
        }
    };
    let args = HookArgs {
        relation: relation.as_deref().map(RelationId::parse).transpose()?,
        resource: resource.map(ResourceId::new),
    };
    tracing::info!(hook = %name, "running hook");
    dispatch(agent, hook, args).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli.config)?;
    let context = Arc::new(
        ContextFile::load(&cli.context)
            .await
            .with_context(|| format!("loading event context {}", cli.context.display()))?,
    );
    let collaborators = production_collaborators(&config, context.clone())?;
    let mut agent = ClusterAgent::new(config, context.local_node(), collaborators)?;

    match cli.command {
        Commands::Hook {
            name,
            relation,
            resource,
        } => {
            let result = run_hook(&mut agent, &name, relation, resource).await;
            // Answers already published must reach the orchestrator even on failure
            context.save().await?;
            result?;
        }
        Commands::Status => {
            let topology = agent.topology().await?;
            println!("node:     {}", agent.node().address);
            println!("state:    {:?}", agent.node_state().await?);
            println!("members:  {}", topology.len());
            if let Some(oldest) = topology.oldest() {
                println!("oldest:   {oldest}");
            }
            println!("leader:   {}", agent.is_leader().await);
        }
        Commands::Render => {
            let rendered = agent.rendered_config().await?;
            print!("{}", String::from_utf8_lossy(rendered.content()));
        }
    }

    Ok(())
}
