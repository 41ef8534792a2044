use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use parttint::export::{ExportFormat, ExportScale, ExportSink, FileExport, DEFAULT_JPEG_QUALITY};
use parttint::segmentation::ExternalMasks;
use parttint::selection::{SelectionError, DEFAULT_ALPHA_THRESHOLD, DEFAULT_TOLERANCE};
use parttint::session::{SessionError, DEFAULT_OPACITY};
use parttint::source::{FileSource, ImageSource};
use parttint::{mask, project, Color, Seed, SelectionConfig, Session};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Grow a mask from one click and save it as a PNG
    Select {
        /// Source image
        #[arg(short, long)]
        image: PathBuf,

        /// Click column in image pixels
        #[arg(short, long)]
        x: u32,

        /// Click row in image pixels
        #[arg(short, long)]
        y: u32,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Where to write the mask PNG
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Recolor parts by clicking on them, then export
    Paint {
        /// Source image
        #[arg(short, long)]
        image: PathBuf,

        /// Click as X,Y,#RRGGBB[,OPACITY]; repeat for more parts, painted in order
        #[arg(short, long = "click", required = true)]
        clicks: Vec<Click>,

        #[command(flatten)]
        selection: SelectionArgs,

        #[command(flatten)]
        export: ExportArgs,

        /// Also save the session as a project in this directory
        #[arg(long)]
        project: Option<PathBuf>,
    },

    /// Render a saved project
    Render {
        /// Project manifest (project.json)
        #[arg(short, long)]
        project: PathBuf,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Paint every mask produced by an external segmentation service
    Auto {
        /// Source image
        #[arg(short, long)]
        image: PathBuf,

        /// Directory of mask PNGs (alpha or luma = occupancy)
        #[arg(long)]
        masks: PathBuf,

        /// Fill color for every part
        #[arg(short, long)]
        color: Color,

        /// Fill opacity (0.0-1.0)
        #[arg(long, default_value_t = DEFAULT_OPACITY)]
        opacity: f32,

        #[command(flatten)]
        export: ExportArgs,

        /// Also save the session as a project in this directory
        #[arg(long)]
        project: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct SelectionArgs {
    /// Per-channel color tolerance (0-255)
    #[arg(short, long, default_value_t = DEFAULT_TOLERANCE, value_parser = parse_tolerance)]
    tolerance: f32,

    /// Pixels with alpha at or below this are background
    #[arg(long, default_value_t = DEFAULT_ALPHA_THRESHOLD)]
    alpha_threshold: u8,

    /// Keep the raw flood-fill edge instead of majority smoothing
    #[arg(long)]
    no_smooth: bool,
}

impl SelectionArgs {
    fn config(&self) -> SelectionConfig {
        SelectionConfig {
            tolerance: self.tolerance,
            alpha_threshold: self.alpha_threshold,
            smooth: !self.no_smooth,
        }
    }
}

#[derive(clap::Args, Debug)]
struct ExportArgs {
    /// Output image
    #[arg(short, long)]
    out: PathBuf,

    /// Output resolution relative to the source: 1x, 2x or 4x
    #[arg(long, default_value = "1x")]
    scale: ExportScale,

    /// png or jpeg; inferred from --out when omitted
    #[arg(short, long)]
    format: Option<ExportFormat>,

    /// JPEG quality (1-100)
    #[arg(short, long, default_value_t = DEFAULT_JPEG_QUALITY)]
    quality: u8,
}

impl ExportArgs {
    fn sink(&self) -> FileExport {
        let format = self
            .format
            .unwrap_or_else(|| ExportFormat::from_path(&self.out));
        FileExport::new(&self.out, format, self.quality)
    }
}

fn parse_tolerance(s: &str) -> Result<f32, String> {
    let tolerance: f32 = s
        .trim()
        .parse()
        .map_err(|e| format!("bad tolerance {s:?}: {e}"))?;
    if !(0.0..=255.0).contains(&tolerance) {
        return Err(format!("tolerance {tolerance} is outside 0-255"));
    }
    Ok(tolerance)
}

/// One `--click` value.
#[derive(Debug, Clone)]
struct Click {
    seed: Seed,
    color: Color,
    opacity: f32,
}

impl FromStr for Click {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if !(3..=4).contains(&parts.len()) {
            return Err(format!("expected X,Y,#RRGGBB[,OPACITY], got {s:?}"));
        }

        let coord = |v: &str| v.parse::<u32>().map_err(|e| format!("bad coordinate {v:?}: {e}"));
        let opacity = match parts.get(3) {
            Some(v) => v.parse::<f32>().map_err(|e| format!("bad opacity {v:?}: {e}"))?,
            None => DEFAULT_OPACITY,
        };

        Ok(Self {
            seed: Seed::new(coord(parts[0])?, coord(parts[1])?),
            color: parts[2].parse().map_err(|e| format!("{e}"))?,
            opacity,
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match args.command {
        Command::Select {
            image,
            x,
            y,
            selection,
            out,
        } => run_select(&image, Seed::new(x, y), selection.config(), &out),
        Command::Paint {
            image,
            clicks,
            selection,
            export,
            project,
        } => run_paint(&image, &clicks, selection.config(), &export, project.as_deref()),
        Command::Render { project, export } => run_render(&project, &export),
        Command::Auto {
            image,
            masks,
            color,
            opacity,
            export,
            project,
        } => run_auto(&image, &masks, color, opacity, &export, project.as_deref()),
    }
}

fn load(path: &Path) -> Result<image::RgbaImage> {
    FileSource::new(path)
        .load()
        .with_context(|| format!("Failed to load {}", path.display()))
}

fn run_select(image: &Path, seed: Seed, config: SelectionConfig, out: &Path) -> Result<()> {
    let mut session = Session::new(load(image)?, config);

    let start = Instant::now();
    let segment = session.select(seed).context("Selection failed")?;
    tracing::info!(
        "Selected {} px, bounds {:?}, in {:.1}ms",
        segment.area,
        segment.bounding_box,
        ms(start.elapsed())
    );

    let bytes = mask::encode_png(&segment.mask).context("Failed to encode mask")?;
    fs::write(out, bytes).with_context(|| format!("Failed to write {}", out.display()))?;
    tracing::info!("Mask written to {}", out.display());
    Ok(())
}

fn run_paint(
    image: &Path,
    clicks: &[Click],
    config: SelectionConfig,
    export: &ExportArgs,
    project_dir: Option<&Path>,
) -> Result<()> {
    let mut session = Session::new(load(image)?, config);

    let mut total_select_time = Duration::ZERO;
    for click in clicks {
        let start = Instant::now();
        match session.click(click.seed, click.color, click.opacity) {
            Ok(_) => {}
            Err(SessionError::Selection(err @ SelectionError::EmptySelection { .. })) => {
                tracing::warn!("{}", err);
            }
            Err(err) => return Err(err).context("Failed to paint click"),
        }
        total_select_time += start.elapsed();
    }

    if session.stack().is_empty() {
        bail!("None of the {} clicks selected anything", clicks.len());
    }
    tracing::info!(
        "{} of {} clicks painted, select={:.1}ms",
        session.stack().len(),
        clicks.len(),
        ms(total_select_time)
    );

    write_export(&session, export)?;

    if let Some(dir) = project_dir {
        project::save(&session, image, dir).context("Failed to save project")?;
    }
    Ok(())
}

fn run_render(manifest: &Path, export: &ExportArgs) -> Result<()> {
    let start = Instant::now();
    let (rendered, skipped) =
        project::render(manifest, export.scale).context("Failed to render project")?;

    if !skipped.is_empty() {
        tracing::warn!("{} layers could not be restored and were left out", skipped.len());
    }
    tracing::info!("Rendered in {:.1}ms", ms(start.elapsed()));

    export
        .sink()
        .write_image(&rendered)
        .context("Failed to write export")
}

fn run_auto(
    image: &Path,
    masks: &Path,
    color: Color,
    opacity: f32,
    export: &ExportArgs,
    project_dir: Option<&Path>,
) -> Result<()> {
    let model = ExternalMasks::from_dir(masks).context("Failed to load external masks")?;
    let mut session = Session::with_model(load(image)?, Box::new(model));

    session
        .paint_all(color, opacity)
        .context("Failed to apply external masks")?;

    write_export(&session, export)?;

    if let Some(dir) = project_dir {
        project::save(&session, image, dir).context("Failed to save project")?;
    }
    Ok(())
}

fn write_export(session: &Session, export: &ExportArgs) -> Result<()> {
    let start = Instant::now();
    let rendered = session
        .export(export.scale)
        .context("Failed to composite layers")?;
    tracing::info!(
        "Composited {} layers in {:.1}ms",
        session.stack().len(),
        ms(start.elapsed())
    );

    export
        .sink()
        .write_image(&rendered)
        .context("Failed to write export")
}

fn ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
