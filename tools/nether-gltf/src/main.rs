//! nether-gltf - glTF/GLB importer
//!
//! Converts glTF 2.0 scenes into engine-agnostic JSON descriptions
//! (.mesh.json + .bin, .skeleton.json, .anim.json, .scene.json)

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use nether_gltf::formats::{self, ANIMATION_EXTENSION, SCENE_EXTENSION, SKELETON_EXTENSION};
use nether_gltf::{load_document, ConverterOptions, GltfConverter, LogLevel, RecordingLogger};

#[derive(Parser)]
#[command(name = "nether-gltf")]
#[command(about = "Nethercore glTF importer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a document and every diagnostic raised while converting it
    Inspect {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Converter options (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Export a mesh as <OUT>.mesh.json + <OUT>.bin
    Mesh {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Mesh index (default: first mesh)
        #[arg(short, long, default_value_t = 0)]
        mesh: usize,

        /// Output path without extension (default: input stem)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Converter options (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Export skin joint paths and bind poses
    Skeleton {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Skin index (default: first skin)
        #[arg(short, long, default_value_t = 0)]
        skin: usize,

        /// Output path without extension (default: input stem)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Converter options (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// List available skins instead of exporting
        #[arg(long)]
        list: bool,
    },

    /// Export an animation clip as keyframe tracks
    Animation {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Animation index (default: first animation)
        #[arg(short, long, default_value_t = 0)]
        animation: usize,

        /// Output path without extension (default: input stem)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Converter options (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// List available animations instead of exporting
        #[arg(long)]
        list: bool,

        /// Sample every joint at the clip's sample rate and print a summary
        #[arg(long)]
        bake: bool,
    },

    /// Export a scene's node graph, sockets included
    Scene {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Scene index (default: first scene)
        #[arg(short, long, default_value_t = 0)]
        scene: usize,

        /// Output path without extension (default: input stem)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Converter options (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { input, config } => inspect(&input, config.as_deref())?,
        Commands::Mesh {
            input,
            mesh,
            output,
            config,
        } => {
            let converter = open(&input, config.as_deref())?;
            let packed = converter
                .create_mesh(mesh)
                .with_context(|| format!("Failed to convert mesh {mesh}"))?;
            let stem = output_stem(&input, output);
            let (json, bin) = formats::write_packed_mesh(&stem, &packed)?;
            tracing::info!(
                "Mesh {} -> {:?} + {:?} ({} primitives, {} bytes)",
                mesh,
                json,
                bin,
                packed.mesh.primitives.len(),
                packed.data.len()
            );
        }
        Commands::Skeleton {
            input,
            skin,
            output,
            config,
            list,
        } => {
            let converter = open(&input, config.as_deref())?;
            if list {
                for (i, s) in converter.document().gltf().skins.iter().enumerate() {
                    println!(
                        "  [{}] {} ({} joints)",
                        i,
                        s.name.as_deref().unwrap_or("<unnamed>"),
                        s.joints.len()
                    );
                }
                return Ok(());
            }
            let skeleton = converter
                .create_skeleton(skin)
                .with_context(|| format!("Failed to convert skin {skin}"))?;
            let path = formats::output_path(&output_stem(&input, output), SKELETON_EXTENSION);
            formats::write_json_file(&path, &skeleton)?;
            tracing::info!("Skeleton {} -> {:?} ({} joints)", skin, path, skeleton.joints.len());
        }
        Commands::Animation {
            input,
            animation,
            output,
            config,
            list,
            bake,
        } => {
            let converter = open(&input, config.as_deref())?;
            if list {
                for (i, a) in converter.document().gltf().animations.iter().enumerate() {
                    println!(
                        "  [{}] {} ({} channels)",
                        i,
                        a.name.as_deref().unwrap_or("<unnamed>"),
                        a.channels.len()
                    );
                }
                return Ok(());
            }
            let clip = converter
                .create_animation(animation)
                .with_context(|| format!("Failed to convert animation {animation}"))?;
            if bake {
                bake_summary(&clip);
            }
            let path = formats::output_path(&output_stem(&input, output), ANIMATION_EXTENSION);
            formats::write_json_file(&path, &clip)?;
            tracing::info!(
                "Animation '{}' -> {:?} ({:.3}s, {} animated joints, {} weight tracks)",
                clip.name,
                path,
                clip.duration,
                clip.animated_joint_count(),
                clip.weight_tracks.len()
            );
        }
        Commands::Scene {
            input,
            scene,
            output,
            config,
        } => {
            let converter = open(&input, config.as_deref())?;
            let graph = converter
                .create_scene(scene)
                .with_context(|| format!("Failed to convert scene {scene}"))?;
            let path = formats::output_path(&output_stem(&input, output), SCENE_EXTENSION);
            formats::write_json_file(&path, &graph)?;
            tracing::info!(
                "Scene '{}' -> {:?} ({} nodes, {} sockets)",
                graph.name,
                path,
                graph.nodes.len(),
                graph.sockets.len()
            );
        }
    }

    Ok(())
}

fn load_options(config: Option<&Path>) -> Result<ConverterOptions> {
    match config {
        Some(path) => ConverterOptions::load(path)
            .with_context(|| format!("Failed to load options from {:?}", path)),
        None => Ok(ConverterOptions::default()),
    }
}

fn open(input: &Path, config: Option<&Path>) -> Result<GltfConverter> {
    let options = load_options(config)?;
    let document = load_document(input).with_context(|| format!("Failed to load glTF: {:?}", input))?;
    GltfConverter::new(document, options).with_context(|| format!("Failed to convert {:?}", input))
}

fn output_stem(input: &Path, output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| input.with_extension(""))
}

fn inspect(input: &Path, config: Option<&Path>) -> Result<()> {
    let options = load_options(config)?;
    let document = load_document(input).with_context(|| format!("Failed to load glTF: {:?}", input))?;
    let logger = RecordingLogger::new();
    let converter = GltfConverter::builder()
        .options(options)
        .logger(logger.clone())
        .build(document)
        .with_context(|| format!("Failed to convert {:?}", input))?;

    let gltf = converter.document().gltf();
    println!("{}", input.display());
    println!("  nodes:      {}", gltf.nodes.len());
    println!("  meshes:     {}", gltf.meshes.len());
    println!("  skins:      {}", gltf.skins.len());
    println!("  animations: {}", gltf.animations.len());
    println!("  scenes:     {}", converter.hierarchy().scenes().len());
    println!("  sockets:    {}", converter.hierarchy().sockets().len());

    let records = logger.records();
    if records.is_empty() {
        println!("  no diagnostics");
    }
    for d in &records {
        let kind = d.kind.map(|k| k.as_str()).unwrap_or("-");
        println!("  {:?} [{}] {}", d.level, kind, d.message);
    }
    if logger.count_at_least(LogLevel::Error) > 0 {
        bail!("{} reported errors", input.display());
    }
    Ok(())
}

fn bake_summary(clip: &nether_gltf::AnimationClip) {
    let frames = clip.frame_count();
    for track in clip.joint_tracks.iter().filter(|t| {
        t.translation.is_animated() || t.rotation.is_animated() || t.scale.is_animated()
    }) {
        let last = (frames - 1) as f32 / clip.sample_rate;
        let (t0, _, _) = track.evaluate(0.0);
        let (t1, _, _) = track.evaluate(last.min(clip.duration));
        println!(
            "  {} ({} frames): translation {:?} -> {:?}",
            track.path, frames, t0, t1
        );
    }
}
