use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use perlin_biomes::app::{AppConfig, FileAction, DEFAULT_SCRIPTS_DIR};
use perlin_biomes::error::fail;
use perlin_biomes::{App, FrameInput, NullTexture, ScriptChoice};
use tracing_subscriber::EnvFilter;

const FRAME: Duration = Duration::from_micros(16_667);

#[derive(Parser)]
#[command(name = "perlin-render")]
#[command(about = "Render a Perlin biome map to PNG, optionally hot reloading a Lua script")]
struct Args {
    /// Directory holding .lua scripts
    #[arg(long, default_value = DEFAULT_SCRIPTS_DIR)]
    scripts: PathBuf,

    /// Script to run, by file name inside --scripts
    #[arg(long)]
    script: Option<String>,

    /// Settings JSON to start from
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Biomes JSON to colour with
    #[arg(long)]
    biomes: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Ignore biomes and render the raw heightmap
    #[arg(long)]
    grayscale: bool,

    /// Island falloff strength
    #[arg(long)]
    island: Option<f32>,

    /// Output PNG (default: timestamped name in the current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep running, polling the scripts directory every SECONDS and
    /// re-exporting whenever the picture changes
    #[arg(long, value_name = "SECONDS")]
    watch: Option<f32>,

    /// Stop a --watch run after this many frames
    #[arg(long)]
    frames: Option<u64>,

    /// Save the rendered settings (default: settings.json in the data dir)
    #[arg(long, value_name = "PATH")]
    export_settings: Option<Option<PathBuf>>,

    /// Save the biomes (default: biomes.json in the data dir)
    #[arg(long, value_name = "PATH")]
    export_biomes: Option<Option<PathBuf>>,

    /// Exit if the script fails to load
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = AppConfig {
        scripts_dir: args.scripts.clone(),
        biome_mode: !args.grayscale,
        island_falloff: args.island,
        ..Default::default()
    };
    if let Some(secs) = args.watch {
        config.watch_interval = Duration::from_secs_f32(secs.max(0.01));
    }
    let mut app = App::new(config);

    if let Some(path) = &args.settings {
        app.run_file_action_at(FileAction::ImportSettings, path)?;
    }
    if let Some(path) = &args.biomes {
        app.run_file_action_at(FileAction::ImportBiomes, path)?;
    }
    if let Some(w) = args.width {
        app.proposed_mut().canvas_width = w;
    }
    if let Some(h) = args.height {
        app.proposed_mut().canvas_height = h;
    }

    if let Some(name) = &args.script {
        if args.strict {
            if let Err(e) = app.host().select(Some(name.as_str())) {
                fail(&e, true);
            }
        } else {
            app.select_script(ScriptChoice::Named(name.clone()));
        }
    }

    let output = args.output.clone();
    let export = |app: &mut App| -> perlin_biomes::Result<PathBuf> {
        match &output {
            Some(path) => app.run_file_action_at(FileAction::ExportImage, path).map(|_| path.clone()),
            None => app.export_snapshot(&std::env::current_dir()?),
        }
    };

    let mut sink = NullTexture;
    app.frame(FrameInput::new(1.0), &mut sink);
    let path = export(&mut app)?;
    eprintln!("Wrote {}", path.display());

    for (action, target) in [
        (FileAction::ExportSettings, &args.export_settings),
        (FileAction::ExportBiomes, &args.export_biomes),
    ] {
        match target {
            Some(Some(path)) => app.run_file_action_at(action, path)?,
            Some(None) => {
                let path = app.run_file_action_default(action)?;
                eprintln!("Wrote {}", path.display());
            }
            None => {}
        }
    }

    if args.watch.is_some() {
        let _watcher = app.watch_scripts()?;
        eprintln!("Watching {} (Ctrl-C to stop)", app.config().scripts_dir.display());

        let mut frame = 0u64;
        let mut last = Instant::now();
        while args.frames.map_or(true, |limit| frame < limit) {
            std::thread::sleep(FRAME);
            let now = Instant::now();
            let delta = now.duration_since(last).as_secs_f32() / FRAME.as_secs_f32();
            last = now;

            if app.frame(FrameInput::new(delta), &mut sink).regenerated {
                match export(&mut app) {
                    Ok(path) => eprintln!("Wrote {}", path.display()),
                    Err(e) => eprintln!("Export failed: {}", e),
                }
            }
            for notice in app.take_notices() {
                eprintln!("{}", notice);
            }
            frame += 1;
        }
    }

    Ok(())
}
