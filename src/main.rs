use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info, warn};

use lead_relay::app::ports::{Clock, LeadLedgerPort, MailSenderPort};
use lead_relay::app::{DeliveryOrchestrator, LeadCapture, SubmissionGate};
use lead_relay::config::Config;
use lead_relay::error::RelayError;
use lead_relay::infra::{
    GoogleSheetsLedger, HttpMailSender, InMemoryLedger, RecordingMailer, SystemClock,
};
use lead_relay::server::{self, AppState};
use lead_relay::{logging, metrics};

#[derive(Parser)]
#[command(name = "lead_relay")]
#[command(about = "Emails the PDF guide to new leads and records them in the lead sheet")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Port to listen on (overrides PORT and the config file)
        #[arg(long)]
        port: Option<u16>,
        /// Log emails and ledger rows instead of calling the real providers
        #[arg(long)]
        dry_run: bool,
    },
    /// Load configuration, validate it and print a redacted summary
    CheckConfig,
}

fn build_adapters(
    config: &Config,
    dry_run: bool,
) -> Result<(Arc<dyn MailSenderPort>, Arc<dyn LeadLedgerPort>), RelayError> {
    if dry_run {
        warn!("Dry run: no emails will be sent and no rows written");
        return Ok((
            Arc::new(RecordingMailer::new()),
            Arc::new(InMemoryLedger::new()),
        ));
    }

    config.validate_for_delivery()?;
    let missing = |what: &str| RelayError::Config(format!("{what} not configured"));

    let api_key = config.mail.api_key.clone().ok_or_else(|| missing("MAIL_API_KEY"))?;
    let mailer = HttpMailSender::new(config.mail.api_url.clone(), api_key);

    let credentials = config
        .sheet
        .credentials
        .as_ref()
        .ok_or_else(|| missing("Google service account"))?;
    let spreadsheet_id = config
        .sheet
        .spreadsheet_id
        .clone()
        .ok_or_else(|| missing("SHEET_ID"))?;
    let ledger = GoogleSheetsLedger::new(credentials, spreadsheet_id, config.sheet.range.clone())?;

    Ok((Arc::new(mailer), Arc::new(ledger)))
}

async fn serve(config: Config, dry_run: bool) -> anyhow::Result<()> {
    if !config.mail.attachment_path.exists() {
        warn!(
            path = %config.mail.attachment_path.display(),
            "Attachment not found; email delivery will fail until it exists"
        );
    }

    let (mailer, ledger) = build_adapters(&config, dry_run)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

    let gate = Arc::new(SubmissionGate::new(config.cooldown, clock.clone()));
    let orchestrator = DeliveryOrchestrator::new(
        mailer,
        ledger,
        clock,
        config.message_template(),
        config.call_timeout,
    );
    let capture = Arc::new(LeadCapture::new(gate.clone(), orchestrator));

    let sweeper = server::spawn_sweeper(gate, config.sweep_interval);
    let state = AppState::new(capture).with_metrics(metrics::init_metrics());

    let result = server::start_server(state, config.port).await;
    sweeper.abort();
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command {
        Commands::Serve { port, dry_run } => {
            if let Some(port) = port {
                config.port = port;
            }
            info!(port = config.port, cooldown_secs = config.cooldown.as_secs(), "Starting lead relay");
            if let Err(e) = serve(config, dry_run).await {
                error!("Server failed: {e:#}");
                return Err(e);
            }
        }
        Commands::CheckConfig => {
            println!("{}", config.summary());
            match config.validate_for_delivery() {
                Ok(()) => println!("✅ Configuration is complete"),
                Err(e) => {
                    println!("❌ {e}");
                    std::process::exit(1);
                }
            }
        }
    }
    Ok(())
}
