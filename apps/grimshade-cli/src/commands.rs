//! Subcommand implementations: the UI-binding layer around the engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use grimshade_core::{
    catalog, Engine, EngineEvent, NoticeLevel, ParameterPatch, ParameterSet, UploadRequest,
    CUSTOM_TARGET,
};
use grimshade_http::HttpTransformService;

use crate::config::CliConfig;

fn build_engine(
    config: &CliConfig,
) -> anyhow::Result<(Engine, mpsc::UnboundedReceiver<ParameterSet>)> {
    let service = HttpTransformService::new(&config.service_url, config.request_timeout())
        .context("failed to build service client")?;
    Ok(Engine::new(Arc::new(service), config.engine_config()))
}

async fn read_image(path: &Path) -> anyhow::Result<UploadRequest> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let content_type = match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "tif" | "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        other => bail!("unsupported extension '{other}'; use JPEG, PNG, TIFF, BMP or WebP"),
    };
    Ok(UploadRequest {
        bytes,
        filename,
        content_type: content_type.to_string(),
    })
}

/// Print engine events as they arrive. The receiver side is `Send`, so
/// this runs as its own task even though the engine itself does not.
fn spawn_event_printer(mut events: broadcast::Receiver<EngineEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                EngineEvent::Progress { message, percent } => {
                    println!("[{percent:3}%] {message}");
                }
                EngineEvent::Notice { level, message } => match level {
                    NoticeLevel::Error => eprintln!("error: {message}"),
                    NoticeLevel::Success | NoticeLevel::Info => println!("{message}"),
                },
                EngineEvent::SourceLoaded { session, .. } => {
                    println!(
                        "source bound: {} ({}x{}, {})",
                        session.source_id, session.width, session.height, session.format
                    );
                }
                EngineEvent::PreviewRendered { target, .. } => {
                    tracing::debug!(job = %target, "preview rendered");
                }
                EngineEvent::StateChanged { .. }
                | EngineEvent::TargetInvalidated { .. }
                | EngineEvent::ProgressCleared => {}
            }
        }
    })
}

async fn save_download(
    download: &grimshade_core::Download,
    dir: &Path,
) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(&download.filename);
    tokio::fs::write(&path, &download.bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

pub fn presets() {
    for entry in catalog::catalog() {
        let p = &entry.params;
        println!(
            "{:<16} {:<22} contrast={:<4} brightness={:<4} threshold={:<4} noise={:<3} blur={:<4} method={}",
            entry.name,
            entry.title,
            p.contrast,
            p.brightness,
            p.threshold,
            p.noise,
            p.blur_radius,
            p.method.as_str(),
        );
        println!("{:<16} {}", "", entry.description);
    }
}

pub async fn tints(config: CliConfig) -> anyhow::Result<()> {
    let (engine, _edits) = build_engine(&config)?;
    let tints = engine.load_tints().await?;
    for tint in tints {
        match tint.display_color {
            Some(color) => println!("{:<16} {:<20} {}", tint.id, tint.display_name, color),
            None => println!("{:<16} {}", tint.id, tint.display_name),
        }
    }
    Ok(())
}

pub async fn batch(
    config: CliConfig,
    image: PathBuf,
    tint: Option<String>,
    preserve_aspect: bool,
    download_to: Option<PathBuf>,
) -> anyhow::Result<()> {
    let (engine, _edits) = build_engine(&config)?;
    let printer = spawn_event_printer(engine.subscribe_events());

    engine.upload(read_image(&image).await?).await?;
    if tint.is_some() || preserve_aspect {
        engine.edit_params(
            ParameterPatch::default()
                .with_color_tint(tint)
                .with_preserve_aspect_ratio(preserve_aspect),
        );
    }

    let report = engine.process_all().await?;
    println!(
        "rendered {} targets ({} failed)",
        report.succeeded.len(),
        report.failed.len()
    );
    for (name, reason) in &report.failed {
        eprintln!("  {name}: {reason}");
    }

    if let Some(dir) = download_to {
        for target in engine.ready_targets() {
            match engine.download(&target).await {
                Ok(download) => {
                    let path = save_download(&download, &dir).await?;
                    println!("saved {}", path.display());
                }
                Err(err) => eprintln!("  {target}: {err}"),
            }
        }
    }

    engine.cleanup().await;
    printer.abort();
    Ok(())
}

pub async fn download(
    config: CliConfig,
    image: PathBuf,
    preset: String,
    tint: Option<String>,
    preserve_aspect: bool,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let out = out.unwrap_or_else(|| config.download_dir.clone());
    let (engine, _edits) = build_engine(&config)?;
    let printer = spawn_event_printer(engine.subscribe_events());

    engine.upload(read_image(&image).await?).await?;
    if tint.is_some() || preserve_aspect {
        engine.edit_params(
            ParameterPatch::default()
                .with_color_tint(tint)
                .with_preserve_aspect_ratio(preserve_aspect),
        );
    }

    // Custom exports need a rendered custom preview first.
    if preset == CUSTOM_TARGET {
        engine.process_custom().await?;
    }

    let download = engine.download(&preset).await?;
    let path = save_download(&download, &out).await?;
    println!("saved {}", path.display());

    engine.cleanup().await;
    printer.abort();
    Ok(())
}

pub async fn session(config: CliConfig, image: PathBuf) -> anyhow::Result<()> {
    let download_dir = config.download_dir.clone();
    let (engine, mut edits) = build_engine(&config)?;
    let printer = spawn_event_printer(engine.subscribe_events());

    if let Err(err) = engine.load_tints().await {
        tracing::warn!(error = %err, "could not load tint table");
    }
    engine.upload(read_image(&image).await?).await?;
    engine.process_all().await?;

    print_session_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_line(&engine, &download_dir, line.trim()).await {
                    break;
                }
            }
            Some(_snapshot) = edits.recv() => {
                // Coalesced slider edits: refresh the custom preview.
                if let Err(err) = engine.debounced_refresh().await {
                    tracing::debug!(error = %err, "debounced refresh skipped");
                }
            }
        }
    }

    engine.cleanup().await;
    printer.abort();
    Ok(())
}

fn print_session_help() {
    println!("commands:");
    println!("  contrast|brightness|threshold|noise|blur <value>");
    println!("  preset <name>        apply a catalog preset");
    println!("  tint <id|none>       set the color tint");
    println!("  aspect <on|off>      toggle aspect-ratio preservation");
    println!("  reset                restore default parameters");
    println!("  download <target>    export a preset or 'custom'");
    println!("  params | status | presets | tints | help | quit");
}

/// Handle one interactive command. Returns `false` to end the session.
/// Engine errors are transient notices, not session killers.
async fn handle_line(engine: &Engine, download_dir: &Path, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return true;
    };
    let argument = parts.next();

    match (command, argument) {
        ("quit", _) | ("exit", _) => return false,
        ("help", _) => print_session_help(),
        ("presets", _) => presets(),
        ("tints", _) => {
            for tint in engine.tints() {
                println!("{:<16} {}", tint.id, tint.display_name);
            }
        }
        ("params", _) => {
            let p = engine.params();
            println!(
                "contrast={} brightness={} threshold={} noise={} blur={} tint={} aspect={} method={}",
                p.contrast,
                p.brightness,
                p.threshold,
                p.noise,
                p.blur_radius,
                p.color_tint.as_deref().unwrap_or("none"),
                p.preserve_aspect_ratio,
                p.method.as_str(),
            );
        }
        ("status", _) => {
            println!("state: {:?}", engine.state());
            println!("ready: {}", engine.ready_targets().join(", "));
        }
        ("contrast", Some(value)) => edit_f32(engine, value, |patch, v| patch.with_contrast(v)),
        ("brightness", Some(value)) => {
            edit_i32(engine, value, |patch, v| patch.with_brightness(v))
        }
        ("threshold", Some(value)) => edit_i32(engine, value, |patch, v| patch.with_threshold(v)),
        ("noise", Some(value)) => edit_i32(engine, value, |patch, v| patch.with_noise(v)),
        ("blur", Some(value)) => edit_f32(engine, value, |patch, v| patch.with_blur_radius(v)),
        ("preset", Some(name)) => {
            if let Err(err) = engine.apply_preset(name).await {
                eprintln!("error: {err}");
            }
        }
        ("tint", Some(id)) => {
            let tint = if id == "none" {
                None
            } else {
                Some(id.to_string())
            };
            if let Err(err) = engine.set_color_tint(tint).await {
                eprintln!("error: {err}");
            }
        }
        ("aspect", Some(value)) => {
            let preserve = matches!(value, "on" | "true" | "yes");
            if let Err(err) = engine.set_preserve_aspect(preserve).await {
                eprintln!("error: {err}");
            }
        }
        ("reset", _) => {
            engine.reset();
            println!("parameters reset");
        }
        ("download", Some(target)) => match engine.download(target).await {
            Ok(download) => match save_download(&download, download_dir).await {
                Ok(path) => println!("saved {}", path.display()),
                Err(err) => eprintln!("error: {err}"),
            },
            Err(err) => eprintln!("error: {err}"),
        },
        _ => eprintln!("unknown command; try 'help'"),
    }
    true
}

fn edit_f32(engine: &Engine, value: &str, apply: fn(ParameterPatch, f32) -> ParameterPatch) {
    match value.parse::<f32>() {
        Ok(parsed) => {
            engine.edit_params(apply(ParameterPatch::default(), parsed));
        }
        Err(_) => eprintln!("expected a number, got '{value}'"),
    }
}

fn edit_i32(engine: &Engine, value: &str, apply: fn(ParameterPatch, i32) -> ParameterPatch) {
    match value.parse::<i32>() {
        Ok(parsed) => {
            engine.edit_params(apply(ParameterPatch::default(), parsed));
        }
        Err(_) => eprintln!("expected an integer, got '{value}'"),
    }
}
