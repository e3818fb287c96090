use clap::{Parser, ValueEnum};
use log::info;
use raycanvas::{
    DisplaySurface, EngineHandle, FormValues, GradientEngine, MemorySurface, Offset,
    PointerEvent, RenderConfig, RenderOutcome, Session,
};
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineKind {
    /// In-process gradient engine
    Builtin,
    /// This binary re-run with `--worker`, over JSON lines
    Worker,
}

/// Render one frame through the request builder and render pipeline.
#[derive(Debug, Parser)]
#[command(name = "raycanvas", version, about)]
struct Cli {
    /// Frame width as a form would submit it (defaults from config when absent)
    #[arg(long)]
    width: Option<String>,

    /// Frame height as a form would submit it
    #[arg(long)]
    height: Option<String>,

    /// Pointer-down position in viewport coordinates, e.g. `60,80`
    #[arg(long, value_parser = parse_pair)]
    click: Option<(f64, f64)>,

    /// Viewport position of the surface's top-left corner
    #[arg(long, value_parser = parse_pair, default_value = "0,0")]
    offset: (f64, f64),

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = EngineKind::Builtin)]
    engine: EngineKind,

    /// Write the final surface as raw RGBA bytes
    #[arg(long)]
    out: Option<PathBuf>,

    /// Serve engine jobs on stdin/stdout instead of rendering
    #[arg(long, hide = true)]
    worker: bool,
}

fn parse_pair(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", s))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("bad x '{}': {}", x, e))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("bad y '{}': {}", y, e))?;
    Ok((x, y))
}

fn engine_handle(kind: EngineKind, config: &RenderConfig) -> anyhow::Result<EngineHandle> {
    match kind {
        EngineKind::Builtin => Ok(EngineHandle::builtin()),
        #[cfg(feature = "worker")]
        EngineKind::Worker => {
            let exe = std::env::current_exe()?;
            Ok(EngineHandle::new(raycanvas::worker::WorkerLoader::new(
                exe,
                vec!["--worker".to_string()],
                config.focus_sentinel,
            )))
        }
        #[cfg(not(feature = "worker"))]
        EngineKind::Worker => {
            let _ = config;
            anyhow::bail!("built without the `worker` feature")
        }
    }
}

async fn run(cli: Cli, config: RenderConfig) -> anyhow::Result<()> {
    let surface = MemorySurface::from_config(&config).with_offset(Offset {
        x: cli.offset.0,
        y: cli.offset.1,
    });
    let engine = engine_handle(cli.engine, &config)?;
    let session = Session::new(config, engine, surface);

    let form = FormValues {
        width: cli.width,
        height: cli.height,
    };
    let outcome = match (cli.click, form.width.is_some() || form.height.is_some()) {
        (Some((x, y)), _) => {
            session
                .pointer_down(PointerEvent { client_x: x, client_y: y }, &form)
                .await?
        }
        (None, true) => session.form_submitted(&form).await?,
        (None, false) => session.page_loaded().await?,
    };

    if let RenderOutcome::Drawn { sequence, width, height } = outcome {
        info!("frame #{} drawn at {}x{}", sequence, width, height);
    }

    let surface = session.into_surface();
    println!(
        "{}x{} sha256={}",
        surface.width(),
        surface.height(),
        surface.digest()
    );
    if let Some(path) = cli.out {
        std::fs::write(&path, surface.pixels())?;
        info!("wrote {} bytes to {}", surface.pixels().len(), path.display());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };

    if cli.worker {
        let stdin = io::stdin();
        let stdout = io::stdout();
        raycanvas::worker::serve(
            &GradientEngine::new(),
            config.focus_sentinel,
            stdin.lock(),
            stdout.lock(),
        )?;
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(cli, config))
}
