#![deny(unsafe_code)]
//! CLI binary for the particle-fx effects.
//!
//! Subcommands:
//! - `render <effect>`: run an effect headlessly for N frames, write a PNG
//! - `list`: print available effects and palettes

mod error;

use clap::{Parser, Subcommand};
use error::CliError;
use particle_fx_core::{params, ManualScheduler, Mount, Palette, PointerEvent, Scene, Vector2};
use particle_fx_effects::EffectKind;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "particle-fx", about = "Particle field effects, rendered headlessly")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an effect for N frames and write the last frame as a PNG.
    Render {
        /// Effect name (e.g. "dot-matrix"). Optional with --scene.
        effect: Option<String>,

        /// Scene file to start from; other flags override it.
        #[arg(long)]
        scene: Option<PathBuf>,

        /// Surface width in pixels [default: 480].
        #[arg(short = 'W', long)]
        width: Option<usize>,

        /// Surface height in pixels [default: 270].
        #[arg(short = 'H', long)]
        height: Option<usize>,

        /// Number of frames to simulate [default: 120].
        #[arg(short, long)]
        frames: Option<usize>,

        /// Simulated frame rate [default: 60].
        #[arg(long)]
        fps: Option<f64>,

        /// PRNG seed for deterministic output [default: 42].
        #[arg(long)]
        seed: Option<u64>,

        /// Effect parameters as a JSON object, merged over the scene's.
        #[arg(long)]
        params: Option<String>,

        /// Hold the pointer at "x,y" for the whole run.
        #[arg(long)]
        pointer: Option<String>,

        /// Fraction of the surface reported visible, in [0, 1].
        #[arg(long)]
        visibility: Option<f64>,

        /// Output file path.
        #[arg(short, long, default_value = "output.png")]
        output: PathBuf,

        /// Also write the resolved scene as JSON to this path.
        #[arg(long)]
        save_scene: Option<PathBuf>,
    },
    /// List available effects and palettes.
    List,
}

/// Flag values that may override a scene file.
#[derive(Debug, Default)]
struct SceneFlags {
    effect: Option<String>,
    width: Option<usize>,
    height: Option<usize>,
    frames: Option<usize>,
    fps: Option<f64>,
    seed: Option<u64>,
    params: Option<String>,
}

fn read_scene(path: &Path) -> Result<Scene, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| CliError::Input(format!("invalid scene {}: {e}", path.display())))
}

/// Merges flags over `base` (or over defaults when there is no scene file).
fn resolve_scene(base: Option<Scene>, flags: SceneFlags) -> Result<Scene, CliError> {
    let mut scene = match (base, flags.effect.as_deref()) {
        (Some(scene), _) => scene,
        (None, Some(effect)) => {
            let mut scene = Scene::new(effect, 480, 270, 42);
            scene.frames = 120;
            scene
        }
        (None, None) => {
            return Err(CliError::Input(
                "an effect name or --scene is required".to_string(),
            ))
        }
    };
    if let Some(effect) = flags.effect {
        scene.effect = effect;
    }
    scene.width = flags.width.unwrap_or(scene.width);
    scene.height = flags.height.unwrap_or(scene.height);
    scene.frames = flags.frames.unwrap_or(scene.frames);
    scene.fps = flags.fps.unwrap_or(scene.fps);
    scene.seed = flags.seed.unwrap_or(scene.seed);
    if let Some(raw) = flags.params {
        let overrides: Value = serde_json::from_str(&raw)
            .map_err(|e| CliError::Input(format!("invalid --params JSON: {e}")))?;
        if !overrides.is_object() {
            return Err(CliError::Input("--params must be a JSON object".to_string()));
        }
        params::merge(&mut scene.params, &overrides);
    }
    scene
        .validate()
        .map_err(|e| CliError::Input(e.to_string()))?;
    Ok(scene)
}

fn parse_pointer(raw: &str) -> Result<Vector2, CliError> {
    let bad = || CliError::Input(format!("--pointer expects \"x,y\", got {raw:?}"));
    let (x, y) = raw.split_once(',').ok_or_else(bad)?;
    let x: f64 = x.trim().parse().map_err(|_| bad())?;
    let y: f64 = y.trim().parse().map_err(|_| bad())?;
    let p = Vector2::new(x, y);
    if p.is_finite() {
        Ok(p)
    } else {
        Err(bad())
    }
}

/// Runs `scene` on a manual clock and returns the final effect.
fn render_scene(
    scene: &Scene,
    pointer: Option<Vector2>,
    visibility: Option<f64>,
) -> Result<EffectKind, CliError> {
    let effect = EffectKind::from_scene(scene)?;
    let mut mount = Mount::new(ManualScheduler::new(scene.fps), effect);
    if let Some(p) = pointer {
        mount.pointer(PointerEvent::Move(p));
    }
    if let Some(v) = visibility {
        mount.visibility(v);
    }
    mount.run_frames(scene.frames)?;
    debug!(frames = mount.frames(), "run finished");
    mount
        .unmount()
        .ok_or_else(|| CliError::Input("effect was released before the run ended".to_string()))
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::List => {
            let effects = EffectKind::list_effects();
            let palettes = Palette::list_names();
            if cli.json {
                let info = serde_json::json!({
                    "effects": effects,
                    "palettes": palettes,
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Effects:");
                for name in effects {
                    println!("  {name}");
                }
                println!("Palettes:");
                println!("  {}", palettes.join(", "));
            }
        }
        Command::Render {
            effect,
            scene,
            width,
            height,
            frames,
            fps,
            seed,
            params,
            pointer,
            visibility,
            output,
            save_scene,
        } => {
            let base = scene.as_deref().map(read_scene).transpose()?;
            let scene = resolve_scene(
                base,
                SceneFlags {
                    effect,
                    width,
                    height,
                    frames,
                    fps,
                    seed,
                    params,
                },
            )?;
            let pointer = pointer.as_deref().map(parse_pointer).transpose()?;

            info!(effect = %scene.effect, frames = scene.frames, "rendering");
            let effect = render_scene(&scene, pointer, visibility)?;
            particle_fx_effects::snapshot::write_png(&effect.frame(), &output)?;

            if let Some(path) = &save_scene {
                let text = serde_json::to_string_pretty(&scene)?;
                std::fs::write(path, text)
                    .map_err(|e| CliError::Io(format!("cannot write {}: {e}", path.display())))?;
            }

            if cli.json {
                let info = serde_json::json!({
                    "effect": scene.effect,
                    "width": scene.width,
                    "height": scene.height,
                    "frames": scene.frames,
                    "fps": scene.fps,
                    "seed": scene.seed,
                    "output": output.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                eprintln!(
                    "rendered {} ({}x{}, {} frames, seed {}) -> {}",
                    scene.effect,
                    scene.width,
                    scene.height,
                    scene.frames,
                    scene.seed,
                    output.display()
                );
            }
        }
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({
                "error": e.to_string(),
                "kind": e.kind(),
                "exit_code": e.exit_code(),
            });
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
