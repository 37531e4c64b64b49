use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use snapforge::{
    app::{AppOptions, SnapforgeApp},
    capture::{CaptureProvider, StillImageProvider},
    config::Config,
    pipeline::NoRender,
    progress::TerminalOverlayHost,
    session::Session,
};

#[derive(Parser)]
#[command(name = "snapforge")]
#[command(about = "Capture, enhance and turn a photo into a 3D model")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, env = "SNAPFORGE_ENHANCE_URL", global = true)]
    enhance_url: Option<String>,

    #[arg(long, env = "SNAPFORGE_GENERATE_URL", global = true)]
    generate_url: Option<String>,

    /// Key sent to both services unless the config sets its own
    #[arg(long, env = "SNAPFORGE_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the viewer window (C capture, E enhance, G generate, S save, R reset view)
    View {
        /// Still image used as the camera
        #[arg(long)]
        image: Option<PathBuf>,

        #[arg(short, long)]
        instruction: Option<String>,
    },

    /// Run the whole pipeline without a window and save the model
    Run {
        image: PathBuf,

        #[arg(short, long)]
        instruction: String,

        /// Directory the model is written to
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Show a local GLB or OBJ file in the viewer
    Show { model: PathBuf },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(url) = &cli.enhance_url {
        config.enhance.endpoint = url.clone();
    }
    if let Some(url) = &cli.generate_url {
        config.generate.endpoint = url.clone();
    }
    if let Some(key) = &cli.api_key {
        config.enhance.api_key.get_or_insert_with(|| key.clone());
        config.generate.api_key.get_or_insert_with(|| key.clone());
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn camera_for(config: &Config, image: Option<PathBuf>) -> Option<Box<dyn CaptureProvider>> {
    image
        .or_else(|| config.capture.source.clone())
        .map(|path| Box::new(StillImageProvider::new(path)) as Box<dyn CaptureProvider>)
}

fn run_headless(
    config: &Config,
    runtime: &tokio::runtime::Runtime,
    image: PathBuf,
    instruction: String,
    output: PathBuf,
) -> Result<()> {
    let mut session = Session::from_config(
        config,
        Arc::new(TerminalOverlayHost::new()),
        runtime.handle().clone(),
    )?;

    session
        .start_camera(&StillImageProvider::new(&image))
        .with_context(|| format!("Failed to open {}", image.display()))?;
    session.capture().context("Capture failed")?;

    runtime
        .block_on(session.enhance_task(instruction))
        .context("Enhancement failed")?;
    let reference = runtime
        .block_on(session.generate_task(Arc::new(NoRender)))
        .context("3D generation failed")?;
    log::info!("Generated {}", reference.suggested_filename);

    let path = session.save(&output).context("Failed to save the model")?;
    println!("{}", path.display());

    session.teardown();
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("snapforge=info"))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    match cli.command {
        Commands::Run {
            image,
            instruction,
            output,
        } => run_headless(&config, &runtime, image, instruction, output),
        Commands::View { image, instruction } => {
            let options = AppOptions {
                camera: camera_for(&config, image),
                instruction,
                model: None,
            };
            SnapforgeApp::new(config, runtime, options)?
                .run()
                .context("Viewer exited with an error")
        }
        Commands::Show { model } => {
            let options = AppOptions {
                camera: camera_for(&config, None),
                instruction: None,
                model: Some(model),
            };
            SnapforgeApp::new(config, runtime, options)?
                .run()
                .context("Viewer exited with an error")
        }
    }
}
