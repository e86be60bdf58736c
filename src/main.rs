use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use sentinel_rs::adk::model::gemini::GeminiModel;
use sentinel_rs::sentinel::{RunOutcome, SentinelConfig, SupportWorkflow};

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Triage a customer message through the support workflow
    Run {
        /// The customer's message
        #[arg(short, long)]
        message: String,

        /// Ticket identifier (generated when omitted)
        #[arg(short, long)]
        ticket_id: Option<String>,

        /// Approval decision to use if the run suspends (prompted otherwise)
        #[arg(short, long)]
        decision: Option<String>,
    },
    /// Show whether a refund amount needs human approval
    Policy {
        #[arg(short, long)]
        amount: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SentinelConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SentinelConfig::from_env()?,
    };

    match args.command {
        Commands::Policy { amount } => {
            let policy = config.refund_policy();
            println!(
                "Refund of {} {} approval (threshold {})",
                amount,
                if policy.evaluate(amount) {
                    "requires"
                } else {
                    "does not require"
                },
                policy.approval_threshold
            );
        }
        Commands::Run {
            message,
            ticket_id,
            decision,
        } => {
            let model = Arc::new(GeminiModel::new(config.model.model_name.clone())?);
            log::info!("Using model: {}", model.model_name());
            let workflow = SupportWorkflow::from_config(&config, model);

            let ticket_id = ticket_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let mut outcome = workflow.start(ticket_id, message).await?;

            loop {
                let suspended = match outcome {
                    RunOutcome::Suspended(suspended) => suspended,
                    RunOutcome::Completed(run) => {
                        for m in &run.state.messages {
                            println!("[{:?}] {}", m.role, m.content);
                        }
                        println!("Finished at: {}", run.terminal);
                        break;
                    }
                };

                println!(
                    "Approval required: {}",
                    serde_json::to_string_pretty(&suspended.request)?
                );
                let answer = match &decision {
                    Some(d) => d.clone(),
                    None => prompt("Decision (approve/deny): ")?,
                };
                outcome = workflow.resume(&suspended.token, answer).await?;
            }
        }
    }

    Ok(())
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end().to_string())
}
