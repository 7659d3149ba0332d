//! agentflow 命令行
//!
//! - `run <agent.json>`：执行一个 Agent，把执行记录以 JSON 输出到 stdout
//! - `batch <files...>`：把多个 Agent 放入优先级队列并发执行，失败的执行按配置重试

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agentflow::config::{load_config, AppConfig};
use agentflow::resilience::JobQueue;
use agentflow::{observability, AgentDescriptor, AgentExecutor, ExecutionStatus};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

/// agentflow - 按技能生成计划并执行 Agent
#[derive(Parser)]
#[command(name = "agentflow")]
#[command(version, about, long_about = None)]
struct Cli {
    /// 配置文件路径（默认查找 config/default.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 执行单个 Agent
    Run {
        /// Agent 描述文件（JSON）
        agent_file: PathBuf,
    },

    /// 批量执行多个 Agent
    Batch {
        /// Agent 描述文件（JSON）
        agent_files: Vec<PathBuf>,

        /// 各文件的优先级，按顺序对应，缺省为 0；数值越大越先执行
        #[arg(long, short, value_delimiter = ',')]
        priority: Vec<i32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    observability::init();
    let cli = Cli::parse();

    let cfg = load_config(cli.config.clone()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    let executor = Arc::new(AgentExecutor::from_config(&cfg));

    match cli.command {
        Commands::Run { agent_file } => {
            let agent = read_agent(&agent_file).await?;
            let record = executor.execute_agent(&agent).await;
            let json = serde_json::to_string_pretty(&record)
                .context("failed to serialize execution record")?;
            println!("{json}");
        }
        Commands::Batch { agent_files, priority } => {
            run_batch(executor, &cfg, agent_files, priority).await?;
        }
    }

    Ok(())
}

async fn read_agent(path: &Path) -> Result<AgentDescriptor> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read agent file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse agent file: {}", path.display()))
}

async fn run_batch(
    executor: Arc<AgentExecutor>,
    cfg: &AppConfig,
    agent_files: Vec<PathBuf>,
    priority: Vec<i32>,
) -> Result<()> {
    if agent_files.is_empty() {
        anyhow::bail!("no agent files given");
    }

    let queue = Arc::new(JobQueue::new(cfg.queue.max_attempts));
    for (index, path) in agent_files.iter().enumerate() {
        let agent = read_agent(path).await?;
        let job = queue.enqueue(agent, priority.get(index).copied().unwrap_or(0));
        tracing::info!(job = %job, file = %path.display(), "agent queued");
    }

    let metrics = queue
        .drain(cfg.queue.concurrency, move |agent: AgentDescriptor| {
            let executor = Arc::clone(&executor);
            async move {
                let record = executor.execute_agent(&agent).await;
                eprintln!("{} [{}] {:?}", agent.name, record.id, record.status);
                match record.status {
                    ExecutionStatus::Failed => {
                        Err(record.error.unwrap_or_else(|| "execution failed".to_string()))
                    }
                    _ => Ok(()),
                }
            }
        })
        .await;

    let json = serde_json::to_string_pretty(&metrics)
        .context("failed to serialize queue metrics")?;
    println!("{json}");
    Ok(())
}
