use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use safe_alert::audio::{AudioCapture, CaptureConfig, SimulatedMicrophone};
use safe_alert::capability::{
    mailto_url, tel_url, AnswerDetector, ChannelAnswers, FixedLocationProvider, LogDialer,
    ScriptedAnswers, TerminalPrompt,
};
use safe_alert::session::{Capabilities, EmergencyController, TestRecording};
use safe_alert::{create_router, AppState, Config, ContactStore, JsonFileStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "safealert", version, about = "Personal emergency alert system")]
struct Cli {
    /// Configuration file (without extension)
    #[arg(short, long, default_value = "config/safealert")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage emergency contacts
    Contacts {
        #[command(subcommand)]
        action: ContactsAction,
    },
    /// Start an emergency session in the terminal
    Activate {
        /// Scripted answers (e.g. `no,yes`) instead of asking on the terminal
        #[arg(long, value_delimiter = ',')]
        answers: Option<Vec<String>>,
    },
    /// Probe location and microphone permissions
    Permissions,
    /// Take a location fix and print a map link
    Locate,
    /// Record a short microphone test
    TestMic,
    /// List emergency service numbers
    Services,
    /// Delete all stored data
    Reset {
        /// Skip the confirmation question
        #[arg(long)]
        yes: bool,
    },
    /// Run the HTTP control API
    Serve,
}

#[derive(Subcommand)]
enum ContactsAction {
    List,
    Add { name: String, phone: String },
    Remove { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    match cli.command {
        Command::Contacts { action } => contacts(&cfg, action),
        Command::Activate { answers } => {
            let detector: Arc<dyn AnswerDetector> = match answers {
                Some(script) => Arc::new(ScriptedAnswers::new(
                    script.iter().map(|a| matches!(a.trim(), "y" | "yes" | "true")),
                )),
                None => Arc::new(TerminalPrompt::stdin()),
            };
            activate(build_controller(&cfg, detector)?).await
        }
        Command::Permissions => {
            let controller = build_controller(&cfg, no_prompts())?;
            let status = controller.refresh_permissions().await;
            println!("Location:   {:?}", status.location);
            println!("Microphone: {:?}", status.microphone);
            Ok(())
        }
        Command::Locate => {
            let controller = build_controller(&cfg, no_prompts())?;
            let sample = controller.refresh_location().await?;
            println!("Location: {} (accuracy {:.0} m)", sample.coordinates(), sample.accuracy);
            if let Some(url) = controller.map_link().await {
                println!("Map: {}", url);
            }
            Ok(())
        }
        Command::TestMic => test_mic(build_controller(&cfg, no_prompts())?).await,
        Command::Services => {
            for service in &cfg.emergency.directory {
                println!(
                    "{:<5} {:<18} {}  ({})",
                    service.number,
                    service.name,
                    service.description,
                    tel_url(&service.number)
                );
            }
            println!("Support: {}", mailto_url(&cfg.links.support_email));
            Ok(())
        }
        Command::Reset { yes } => {
            let store = open_contacts(&cfg)?;
            if yes || confirm("Delete all contacts and settings?").await {
                store.reset()?;
                println!("All data cleared");
            }
            Ok(())
        }
        Command::Serve => serve(&cfg).await,
    }
}

fn open_contacts(cfg: &Config) -> Result<Arc<ContactStore>> {
    let kv = JsonFileStore::open(cfg.storage.resolved_path()?)?;
    Ok(Arc::new(ContactStore::new(Arc::new(kv))))
}

/// Detector for commands that never escalate
fn no_prompts() -> Arc<dyn AnswerDetector> {
    Arc::new(ScriptedAnswers::default())
}

fn build_controller(cfg: &Config, answers: Arc<dyn AnswerDetector>) -> Result<EmergencyController> {
    let audio: Arc<dyn AudioCapture> = if cfg.device.microphone {
        Arc::new(SimulatedMicrophone::new(CaptureConfig {
            sample_rate: cfg.device.sample_rate,
            ..CaptureConfig::default()
        }))
    } else {
        Arc::new(SimulatedMicrophone::unavailable())
    };

    let caps = Capabilities {
        location: Arc::new(FixedLocationProvider::new(cfg.device.location)),
        audio,
        dialer: Arc::new(LogDialer::new()),
        answers,
    };

    Ok(EmergencyController::new(cfg, open_contacts(cfg)?, caps))
}

fn contacts(cfg: &Config, action: ContactsAction) -> Result<()> {
    let store = open_contacts(cfg)?;

    match action {
        ContactsAction::List => {
            let contacts = store.list_contacts();
            if contacts.is_empty() {
                println!("No emergency contacts configured");
            }
            for (i, c) in contacts.iter().enumerate() {
                println!("{}. {} ({})  id={}", i + 1, c.name, c.phone, c.id);
            }
        }
        ContactsAction::Add { name, phone } => {
            let contact = store.add_contact(&name, &phone)?;
            println!("Added {} ({})  id={}", contact.name, contact.phone, contact.id);
        }
        ContactsAction::Remove { id } => {
            store.remove_contact(&id)?;
            println!("Removed {}", id);
        }
    }

    Ok(())
}

async fn activate(controller: EmergencyController) -> Result<()> {
    controller.refresh_permissions().await;
    controller.activate().await;

    let mut printed = 0;
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    let done = controller.wait_idle();
    tokio::pin!(done);

    loop {
        tokio::select! {
            _ = &mut done => {
                print_new_lines(&controller, &mut printed).await;
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                controller.deactivate().await;
                println!("Emergency cancelled");
                return Ok(());
            }
            _ = ticker.tick() => print_new_lines(&controller, &mut printed).await,
        }
    }

    controller.deactivate().await;
    Ok(())
}

async fn print_new_lines(controller: &EmergencyController, printed: &mut usize) {
    let snapshot = controller.snapshot().await;
    for entry in snapshot.log.iter().skip(*printed) {
        println!("{}", entry);
    }
    *printed = snapshot.log.len().max(*printed);
}

async fn test_mic(controller: EmergencyController) -> Result<()> {
    controller.request_microphone_permission().await;

    if let TestRecording::Started(handle) = controller.toggle_test_recording().await? {
        println!("Recording test audio for {}s...", handle.max_duration.as_secs());
        tokio::time::sleep(handle.max_duration).await;
    }

    if let TestRecording::Stopped(Some(artifact)) = controller.toggle_test_recording().await? {
        println!(
            "Captured {:.1}s of audio ({} bytes WAV)",
            artifact.duration_seconds(),
            artifact.wav.len()
        );
    }
    Ok(())
}

async fn confirm(question: &str) -> bool {
    TerminalPrompt::stdin().ask(question).await
}

async fn serve(cfg: &Config) -> Result<()> {
    let answers = Arc::new(ChannelAnswers::new());
    let controller = build_controller(cfg, answers.clone())?;
    controller.refresh_permissions().await;

    let app = create_router(AppState::new(cfg, controller, answers));
    let addr = format!("{}:{}", cfg.http.bind, cfg.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("SafeAlert API listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
