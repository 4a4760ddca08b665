use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use base64::Engine;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use carecompass_chat::{
    patient_context, ChatSession, ExchangeOutcome, FileAnalysis, OutgoingMessage,
    PatientWorkspace,
};
use carecompass_cli::{
    commands::{Command, HELP},
    config::{Config, TOKEN_VAR},
    input::{next_input, InputEvent},
    output::StreamPrinter,
};
use carecompass_client::{Anonymous, ApiClient, StaticToken, TokenProvider};
use carecompass_types::{
    is_image_mime, Doctor, Medication, PatientExport, Profile, ProfileDraft, ProfilePatch,
};

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config =
        Config::load().map_err(|e| anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!(base_url = %config.api.base_url, "Starting CareCompass");

    let tokens: Arc<dyn TokenProvider> = match StaticToken::from_env(TOKEN_VAR) {
        Some(token) => Arc::new(token),
        None => {
            tracing::warn!("{} not set, requests are sent anonymously", TOKEN_VAR);
            Arc::new(Anonymous)
        }
    };
    let client = Arc::new(
        ApiClient::with_token_provider(config.api.client_config(), tokens)
            .context("Failed to create API client")?,
    );

    let mut workspace = PatientWorkspace::load(client.clone(), client.clone())
        .await
        .context("Failed to load profiles")?;

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    if workspace.needs_setup() && !run_setup(&mut workspace, &mut input).await? {
        return Ok(());
    }

    if let Some(profile) = workspace.active_profile() {
        println!("Talking about {}. Type /help for commands.", profile.name);
    }

    loop {
        prompt("> ");
        let line = match next_input(&mut input, tokio::signal::ctrl_c()).await? {
            InputEvent::Line(line) => line,
            InputEvent::Interrupted => {
                println!();
                break;
            }
            InputEvent::Eof => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        match Command::parse(&line) {
            Command::Quit => break,
            command => {
                if let Err(e) = execute(command, &mut workspace, &client).await {
                    eprintln!("error: {:#}", e);
                }
            }
        }
    }

    tracing::info!("CareCompass stopped");
    Ok(())
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // stdout belongs to the conversation
    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn prompt(text: &str) {
    use std::io::Write;
    print!("{}", text);
    let _ = std::io::stdout().flush();
}

/// First run: ask for a name until a profile exists. Returns false on EOF.
async fn run_setup(workspace: &mut PatientWorkspace, input: &mut Input) -> anyhow::Result<bool> {
    println!("Welcome to CareCompass. Let's set up the first profile.");
    loop {
        prompt("Patient name: ");
        let InputEvent::Line(line) = next_input(input, tokio::signal::ctrl_c()).await? else {
            return Ok(false);
        };
        let name = line.trim();
        if name.is_empty() {
            continue;
        }

        match workspace.create_profile(ProfileDraft::new(name)).await {
            Ok(profile) => {
                println!("Created profile {} ({})", profile.name, profile.id);
                return Ok(true);
            }
            Err(e) => {
                // Kept locally, so the user can carry on
                eprintln!("error: profile could not be saved: {}", e);
                return Ok(true);
            }
        }
    }
}

async fn execute(
    command: Command,
    workspace: &mut PatientWorkspace,
    client: &Arc<ApiClient>,
) -> anyhow::Result<()> {
    match command {
        Command::Chat(text) => {
            let (session, profile) = current(workspace)?;
            let mut printer = StreamPrinter::new();
            let mut on_text = |text: &str| printer.update(text);
            let outcome = until_done(
                session,
                session.send(profile, OutgoingMessage::text(text), &mut on_text),
            )
            .await?;
            printer.finish(&outcome);
        }
        Command::Patients => {
            let active = workspace.active_profile().map(|p| p.id.clone());
            for profile in workspace.profiles() {
                let marker = if Some(&profile.id) == active.as_ref() { "*" } else { " " };
                println!("{} {}  {}", marker, profile.id, profile.name);
            }
        }
        Command::Switch(id) => {
            workspace.switch_profile(&id).await?;
            if let Some(profile) = workspace.active_profile() {
                println!("Switched to {}", profile.name);
            }
        }
        Command::Add(name) => {
            let profile = workspace.create_profile(ProfileDraft::new(name)).await?;
            println!("Created profile {} ({})", profile.name, profile.id);
        }
        Command::Threads => {
            let (session, _) = current(workspace)?;
            let active = session.active_thread();
            let store = session.store();
            if store.is_empty() {
                println!("No conversations yet.");
            }
            for thread in store.threads() {
                let marker = if Some(&thread.id) == active.as_ref() { "*" } else { " " };
                println!(
                    "{} {}  {}  {} messages  {}",
                    marker,
                    thread.id,
                    thread.created_at.format("%Y-%m-%d %H:%M"),
                    thread.messages.len(),
                    thread.title().unwrap_or("(empty)")
                );
            }
        }
        Command::Open(id) => {
            let (session, _) = current(workspace)?;
            if !session.select_thread(&id) {
                return Err(anyhow!("No conversation with id {}", id));
            }
            let store = session.store();
            if let Some(thread) = store.get(&id) {
                for message in &thread.messages {
                    let who = if message.is_user() { "you" } else { "carecompass" };
                    println!("{}: {}", who, message.text);
                }
            }
        }
        Command::New => {
            let (session, _) = current(workspace)?;
            session.start_new_thread();
            println!("Started a new conversation.");
        }
        Command::Context => {
            println!("{}", patient_context(workspace.active_profile()));
        }
        Command::Vitals(update) => {
            let vitals = update.apply(&current(workspace)?.1.vitals);
            workspace.record_vitals(vitals).await?;
            println!("Vitals updated.");
        }
        Command::Profile(update) => {
            let patch = update.patch(current(workspace)?.1);
            let profile = workspace.update_active_profile(patch).await?;
            println!("Profile updated for {}.", profile.name);
        }
        Command::Condition(edit) => {
            let conditions = edit.apply(&current(workspace)?.1.conditions);
            let profile = workspace
                .update_active_profile(ProfilePatch {
                    conditions: Some(conditions),
                    ..Default::default()
                })
                .await?;
            if profile.conditions.is_empty() {
                println!("No conditions recorded.");
            } else {
                println!("Conditions: {}", profile.conditions.join(", "));
            }
        }
        Command::Doctor {
            name,
            specialty,
            phone,
        } => {
            workspace
                .save_doctor(Doctor {
                    id: String::new(),
                    name,
                    specialty,
                    phone,
                })
                .await?;
            println!("Doctor saved.");
        }
        Command::Medication {
            name,
            dosage,
            frequency,
        } => {
            workspace
                .save_medication(Medication {
                    id: String::new(),
                    name,
                    dosage,
                    frequency,
                })
                .await?;
            println!("Medication saved.");
        }
        Command::Files => {
            let patient_id = current(workspace)?.1.id.clone();
            let files = client.list_files(&patient_id).await?;
            if files.is_empty() {
                println!("No files.");
            }
            for file in files {
                println!("  {}  {}  {}", file.id, file.name, file.mime_type);
            }
        }
        Command::Upload(path) => {
            let patient_id = current(workspace)?.1.id.clone();
            let (name, mime_type, bytes) = read_local_file(&path).await?;
            let file = client
                .upload_file(&patient_id, name, &mime_type, bytes)
                .await?;
            println!("Uploaded {} ({})", file.name, file.id);
        }
        Command::Analyze(path) => {
            let (_, mime_type, bytes) = read_local_file(&path).await?;
            let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
            let preview = is_image_mime(&mime_type)
                .then(|| format!("data:{};base64,{}", mime_type, encoded));
            analyze(
                workspace,
                FileAnalysis {
                    inline_base64: Some(encoded),
                    preview,
                    mime_type,
                    file_id: None,
                },
            )
            .await?;
        }
        Command::AnalyzeFile(file_id) => {
            let patient_id = current(workspace)?.1.id.clone();
            let file = client
                .list_files(&patient_id)
                .await?
                .into_iter()
                .find(|f| f.id == file_id)
                .ok_or_else(|| anyhow!("No file with id {}", file_id))?;
            let preview = if file.is_image() {
                Some(client.file_download_url(&patient_id, &file.id).await?)
            } else {
                None
            };
            analyze(
                workspace,
                FileAnalysis {
                    inline_base64: None,
                    preview,
                    mime_type: file.mime_type,
                    file_id: Some(file.id),
                },
            )
            .await?;
        }
        Command::Link(file_id) => {
            let patient_id = current(workspace)?.1.id.clone();
            println!("{}", client.file_download_url(&patient_id, &file_id).await?);
        }
        Command::DeleteFile(file_id) => {
            let patient_id = current(workspace)?.1.id.clone();
            client.delete_file(&patient_id, &file_id).await?;
            println!("File deleted.");
        }
        Command::Export(path) => {
            let patient_id = current(workspace)?.1.id.clone();
            let bundle = client.export_patient(&patient_id).await?;
            let json = serde_json::to_string_pretty(&bundle)?;
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported {} chats to {}", bundle.chats.len(), path.display());
        }
        Command::Import(path) => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let bundle: PatientExport =
                serde_json::from_str(&raw).context("Invalid import data structure")?;
            client.import_patient(&bundle).await?;

            *workspace = PatientWorkspace::load(client.clone(), client.clone()).await?;
            workspace.switch_profile(&bundle.patient.id).await?;
            println!("Imported {}", bundle.patient.name);
        }
        Command::Help => println!("{}", HELP),
        Command::Invalid(message) => println!("{}", message),
        Command::Quit => {}
    }
    Ok(())
}

fn current(
    workspace: &PatientWorkspace,
) -> anyhow::Result<(&ChatSession, &Profile)> {
    let profile = workspace
        .active_profile()
        .ok_or_else(|| anyhow!("No active profile. Use /add <name> first."))?;
    let session = workspace
        .session()
        .ok_or_else(|| anyhow!("No active profile. Use /add <name> first."))?;
    Ok((session, profile))
}

async fn analyze(workspace: &PatientWorkspace, analysis: FileAnalysis) -> anyhow::Result<()> {
    let (session, profile) = current(workspace)?;
    let mut printer = StreamPrinter::new();
    let mut on_text = |text: &str| printer.update(text);
    let outcome = until_done(
        session,
        session.analyze_file(profile, analysis, &mut on_text),
    )
    .await?;
    printer.finish(&outcome);
    Ok(())
}

/// Drive an exchange to completion, turning Ctrl-C into a stop request
async fn until_done<F>(
    session: &ChatSession,
    exchange: F,
) -> carecompass_chat::Result<ExchangeOutcome>
where
    F: Future<Output = carecompass_chat::Result<ExchangeOutcome>>,
{
    tokio::pin!(exchange);
    loop {
        tokio::select! {
            outcome = &mut exchange => return outcome,
            _ = tokio::signal::ctrl_c() => {
                session.stop();
            }
        }
    }
}

async fn read_local_file(path: &Path) -> anyhow::Result<(String, String, Vec<u8>)> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    Ok((name, mime_type, bytes))
}
