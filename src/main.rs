mod review;

use anyhow::{Context, Result};
use std::env;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use inbox_autopilot::ai::{AiDrafter, OpenRouterClient};
use inbox_autopilot::autopilot::{
    Autopilot, AutopilotSettings, CycleOutcome, EnableOutcome, MaxUrgency, PreferencesPatch, Tone,
    is_locked_category,
};
use inbox_autopilot::backend::RestClient;
use inbox_autopilot::config::{self, Config};
use inbox_autopilot::credentials::CredentialStore;
use inbox_autopilot::storage::KvStore;

use crate::review::{AppAutopilot, review_pending};

fn setup_logging() {
    use std::fs::OpenOptions;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,inbox_autopilot=debug"));

    let log_file = Config::config_dir()
        .ok()
        .map(|dir| dir.join("inbox-autopilot.log"))
        .and_then(|path| OpenOptions::new().create(true).append(true).open(&path).ok());

    if let Some(file) = log_file {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        // Fallback to stderr if file logging fails
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_usage() {
    eprintln!(
        r#"inbox-autopilot - Auto-drafted replies for low-risk email

Usage: inbox-autopilot <command>

Commands:
    setup                 Configure the backend and store the API token
    status                Show autopilot state and today's counts
    enable | disable      Turn autopilot on or off
    pause | resume        Suspend or resume drafting without disabling
    tone <tone>           professional, friendly, concise, firm or empathetic
    max-urgency <1-3>     Highest urgency score eligible for drafting
    exclude <category>    Never draft replies for a category
    include <category>    Allow a category again (legal, billing and personal stay excluded)
    auto-sync <on|off>    Draft automatically after mailbox syncs
    run                   Run one drafting cycle, then review pending drafts
    sync                  Like run, but only when auto-sync is on
    help                  Show this help message

Configuration file: ~/.config/inbox-autopilot/config.toml
"#
    );
}

fn prompt(label: &str) -> Result<String> {
    use std::io::{self, Write};

    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn run_setup() -> Result<()> {
    println!("inbox-autopilot setup");
    println!("=====================\n");

    let config_path = Config::config_path()?;
    if config_path.exists() {
        let answer = prompt("Configuration already exists. Overwrite? [y/N]: ")?;
        if !answer.eq_ignore_ascii_case("y") {
            println!("Setup cancelled.");
            return Ok(());
        }
    }

    let base_url = loop {
        let url = prompt("Backend URL (https://...): ")?;
        if (url.starts_with("https://") || url.starts_with("http://")) && url.len() > 8 {
            break url;
        }
        println!("Please enter a full URL, e.g. https://api.example.com");
    };

    let user_id = loop {
        let id = prompt("User ID: ")?;
        if !id.is_empty() {
            break id;
        }
        println!("User ID cannot be empty.");
    };

    let account_id = prompt("Sending account ID: ")?;
    let ai_key = prompt("OpenRouter API key (optional): ")?;

    print!("Backend API token: ");
    std::io::Write::flush(&mut std::io::stdout())?;
    let token = read_secret()?;
    println!();

    let config = Config {
        backend: config::BackendConfig {
            base_url,
            user_id: user_id.clone(),
            account_id,
        },
        ai: config::AiConfig {
            api_key: (!ai_key.is_empty()).then_some(ai_key),
            ..Default::default()
        },
        ..Default::default()
    };

    Config::ensure_dirs()?;
    config.save()?;
    println!("Configuration saved to {}", config_path.display());

    let creds = CredentialStore::new(&user_id);
    creds.set_api_token(&token)?;
    if !creds.has_credentials() {
        anyhow::bail!("Credential storage failed");
    }
    println!("API token stored.");

    println!("\nSetup complete! Run 'inbox-autopilot enable' to turn on autopilot.");
    Ok(())
}

fn read_secret() -> Result<String> {
    let _guard = DisableEcho::new()?;

    let mut secret = String::new();
    std::io::stdin().read_line(&mut secret)?;
    Ok(secret.trim().to_string())
}

struct DisableEcho {
    #[cfg(unix)]
    original: libc::termios,
}

impl DisableEcho {
    #[cfg(unix)]
    fn new() -> Result<Self> {
        use std::mem::MaybeUninit;
        use std::os::unix::io::AsRawFd;

        let fd = std::io::stdin().as_raw_fd();
        let mut termios = MaybeUninit::<libc::termios>::uninit();

        // SAFETY: termios is initialized by tcgetattr before use
        unsafe {
            if libc::tcgetattr(fd, termios.as_mut_ptr()) != 0 {
                anyhow::bail!("Failed to get terminal attributes");
            }
            let original = termios.assume_init();
            let mut quiet = original;
            quiet.c_lflag &= !libc::ECHO;
            if libc::tcsetattr(fd, libc::TCSANOW, &quiet) != 0 {
                anyhow::bail!("Failed to set terminal attributes");
            }
            Ok(Self { original })
        }
    }

    #[cfg(not(unix))]
    fn new() -> Result<Self> {
        Ok(Self {})
    }
}

#[cfg(unix)]
impl Drop for DisableEcho {
    fn drop(&mut self) {
        use std::os::unix::io::AsRawFd;
        let fd = std::io::stdin().as_raw_fd();
        // SAFETY: restores attributes captured in new()
        unsafe {
            libc::tcsetattr(fd, libc::TCSANOW, &self.original);
        }
    }
}

async fn open_autopilot(config: &Config) -> Result<AppAutopilot> {
    let creds = CredentialStore::new(&config.backend.user_id);
    let token = creds.get_api_token()?;
    let backend = RestClient::new(&config.backend.base_url, token);

    if !config.ai.is_configured() {
        tracing::warn!("No [ai] api_key configured; drafting cycles will fail");
    }
    let ai = OpenRouterClient::new(
        config.ai.api_key.clone().unwrap_or_default(),
        config.ai.model.clone(),
    );
    let drafter = AiDrafter::new(ai, config.ai.draft_max_tokens);

    let db_path = Config::database_path()?;
    let kv = KvStore::open(&db_path)
        .await
        .with_context(|| format!("Failed to open {}", db_path.display()))?;

    let settings = AutopilotSettings {
        batch_size: config.autopilot.batch_size,
        ..AutopilotSettings::new(&config.backend.user_id, &config.backend.account_id)
    };

    Ok(Autopilot::open(settings, kv, backend.clone(), drafter, backend).await)
}

fn print_status(autopilot: &AppAutopilot) {
    let status = autopilot.status();
    let prefs = autopilot.preferences();

    let state = match (status.enabled, status.paused) {
        (false, _) => "disabled",
        (true, true) => "paused",
        (true, false) => "active",
    };
    let settings = autopilot.settings();
    println!("Autopilot:      {}", state);
    println!("Account:        {} ({})", settings.account_id, settings.user_id);
    println!("Tone:           {}", prefs.default_tone);
    println!("Max urgency:    {}", prefs.max_urgency.value());
    println!(
        "Excluded:       {}",
        prefs
            .exclude_categories
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "Auto-sync:      {}",
        if prefs.auto_draft_on_sync { "on" } else { "off" }
    );
    println!("Sent today:     {}", status.stats.sent_today);
    println!("Rejected today: {}", status.stats.rejected_today);
}

async fn enable(autopilot: &AppAutopilot) -> Result<()> {
    if autopilot.request_enable().await == EnableOutcome::Enabled {
        println!("Autopilot enabled.");
        return Ok(());
    }

    println!(
        "Autopilot drafts replies for low-urgency emails that need a response and carry\n\
         no risk flags. Legal, billing and personal mail is never drafted. Nothing is\n\
         sent without your approval: every draft waits in a review queue.\n"
    );
    let answer = prompt("Turn on autopilot? [y/N]: ")?;
    if answer.eq_ignore_ascii_case("y") {
        autopilot.confirm_explainer().await;
        println!("Autopilot enabled.");
    } else {
        println!("Autopilot left off.");
    }
    Ok(())
}

/// Run a cycle (after_sync when `sync_only`) and report the outcome
async fn run_cycle(autopilot: &AppAutopilot, config: &Config, sync_only: bool) -> Result<()> {
    if !config.ai.is_configured() {
        anyhow::bail!("Drafting needs an OpenRouter key: set [ai] api_key in the config file");
    }

    let outcome = if sync_only {
        autopilot.after_sync().await
    } else {
        autopilot.trigger().await
    };

    match outcome {
        Ok(CycleOutcome::Completed(report)) => {
            println!(
                "Drafted {} replies ({} failed, {} left for the next run).",
                report.queued.len(),
                report.failed.len(),
                report.remaining().saturating_sub(report.failed.len())
            );
            #[cfg(feature = "notifications")]
            {
                let first = report
                    .queued
                    .first()
                    .and_then(|id| autopilot.draft(id))
                    .map(|d| d.draft_subject);
                inbox_autopilot::notification::notify_drafts_ready(
                    &config.notifications,
                    report.queued.len(),
                    first.as_deref(),
                );
            }
        }
        Ok(CycleOutcome::Inactive) => {
            println!("Autopilot is not active; no drafts generated.");
        }
        Ok(CycleOutcome::AlreadyRunning) => {
            println!("A drafting cycle is already running.");
        }
        Err(e) => {
            eprintln!("{}", e);
            #[cfg(feature = "notifications")]
            inbox_autopilot::notification::notify_fetch_failed(&config.notifications);
        }
    }
    Ok(())
}

fn parse_switch(value: Option<&str>) -> Result<bool> {
    match value {
        Some("on") | Some("true") | Some("yes") => Ok(true),
        Some("off") | Some("false") | Some("no") => Ok(false),
        _ => anyhow::bail!("Expected 'on' or 'off'"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(|s| s.as_str());
    let value = args.get(2).map(|s| s.as_str());

    match command {
        Some("help") | Some("--help") | Some("-h") => {
            print_usage();
            return Ok(());
        }
        Some("setup") => return run_setup(),
        _ => {}
    }

    Config::ensure_dirs()?;
    setup_logging();

    let config = Config::load()?;
    let autopilot = open_autopilot(&config).await?;

    match command.unwrap_or("status") {
        "status" => print_status(&autopilot),
        "enable" => enable(&autopilot).await?,
        "disable" => {
            autopilot.disable().await;
            println!("Autopilot disabled.");
        }
        "pause" => {
            autopilot.pause().await;
            println!("Autopilot paused.");
        }
        "resume" => {
            autopilot.resume().await;
            println!("Autopilot resumed.");
        }
        "tone" => {
            let tone: Tone = value
                .context("Usage: inbox-autopilot tone <tone>")?
                .parse()
                .map_err(anyhow::Error::msg)?;
            autopilot
                .update_preferences(PreferencesPatch {
                    default_tone: Some(tone),
                    ..Default::default()
                })
                .await;
            println!("Default tone set to {}.", tone);
        }
        "max-urgency" => {
            let level: u8 = value
                .context("Usage: inbox-autopilot max-urgency <1-3>")?
                .parse()
                .context("Max urgency must be a number")?;
            let max_urgency = MaxUrgency::try_from(level).map_err(anyhow::Error::msg)?;
            autopilot
                .update_preferences(PreferencesPatch {
                    max_urgency: Some(max_urgency),
                    ..Default::default()
                })
                .await;
            println!("Max urgency set to {}.", level);
        }
        "exclude" => {
            let category = value.context("Usage: inbox-autopilot exclude <category>")?;
            let patch = PreferencesPatch::with_excluded(&autopilot.preferences(), category);
            autopilot.update_preferences(patch).await;
            println!("Category '{}' excluded.", category);
        }
        "include" => {
            let category = value.context("Usage: inbox-autopilot include <category>")?;
            if is_locked_category(category) {
                anyhow::bail!("'{}' is always excluded from autopilot", category);
            }
            let patch = PreferencesPatch::without_excluded(&autopilot.preferences(), category);
            autopilot.update_preferences(patch).await;
            println!("Category '{}' allowed.", category);
        }
        "auto-sync" => {
            let on = parse_switch(value)?;
            autopilot
                .update_preferences(PreferencesPatch {
                    auto_draft_on_sync: Some(on),
                    ..Default::default()
                })
                .await;
            println!("Auto-draft on sync {}.", if on { "on" } else { "off" });
        }
        "run" | "sync" => {
            run_cycle(&autopilot, &config, command == Some("sync")).await?;
            review_pending(&autopilot, &config.notifications).await?;
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
