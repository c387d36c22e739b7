use std::sync::Arc;

use clap::{Parser, Subcommand};

use ticket_triage::classifier::Classifier;
use ticket_triage::config::{EmailConfig, LlmConfig};
use ticket_triage::llm::create_provider;
use ticket_triage::mailer::{EmailRequest, EmailSender, SmtpMailer};
use ticket_triage::pipeline::TriagePipeline;

#[derive(Parser)]
#[command(
    name = "ticket-triage",
    about = "Classify support conversations and dispatch follow-up emails",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a conversation transcript into structured JSON
    Classify {
        /// The verbatim conversation text
        conversation: String,
    },
    /// Send an HTML email to the configured recipient
    SendEmail {
        /// Email subject line
        subject: String,
        /// Raw HTML body
        html_body: String,
    },
    /// Classify a conversation and dispatch a follow-up email if needed
    Triage {
        /// The verbatim conversation text
        conversation: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Missing or extra arguments exit 1 before any network call is made.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            e.print().ok();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    match cli.command {
        Command::Classify { conversation } => {
            let llm = create_provider(&LlmConfig::from_env()?);
            let classifier = Classifier::new(llm);
            let analysis = classifier.classify(&conversation).await?;
            println!("{}", serde_json::to_string(&analysis)?);
        }
        Command::SendEmail { subject, html_body } => {
            let mailer = SmtpMailer::new(EmailConfig::from_env()?);
            mailer.send(&EmailRequest::new(subject, html_body)).await?;
            println!("Email sent to {}", mailer.recipient());
        }
        Command::Triage { conversation } => {
            let llm = create_provider(&LlmConfig::from_env()?);
            let mailer = Arc::new(SmtpMailer::new(EmailConfig::from_env()?));
            let pipeline = TriagePipeline::new(llm, mailer);
            let report = pipeline.run(&conversation).await?;
            println!("{}", serde_json::to_string(&report)?);
        }
    }

    Ok(())
}
