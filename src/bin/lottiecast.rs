use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use lottiecast::{
    BackgroundRemover, CancelToken, Capabilities, ConvertOptions, Frame, ModelRemoverConfig,
    PatternOptions, Preset, RemovalPolicy, RemovalStrategy, Ring, ShapePattern, SoftEdge,
    SpinOptions, StillFormat, select_remover,
};

#[derive(Parser, Debug)]
#[command(name = "lottiecast", version)]
struct Cli {
    /// Log per-frame decisions.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a GIF, WebP or video into a Lottie document.
    Convert(ConvertArgs),
    /// Write a procedural shape-layer pattern.
    Pattern(PatternArgs),
    /// Rotate one still image a full turn.
    Spin(SpinArgs),
    /// Remove the background of one still and write a PNG.
    Cutout(CutoutArgs),
    /// Print what lottiecast sees in a source and which tools are available.
    Probe(ProbeArgs),
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Input animation.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output JSON path (default: `<stem>_lottie.json` next to the input).
    #[arg(long)]
    out: Option<PathBuf>,

    /// JSON options file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Named recipe applied before individual flags.
    #[arg(long)]
    preset: Option<Preset>,

    /// Keep the background; wins over `--removal`.
    #[arg(long)]
    no_remove_bg: bool,

    /// Removal strategy; `threshold` or `model` also switch removal on.
    #[arg(long, value_enum)]
    removal: Option<RemovalChoice>,

    /// Luminance below which pixels are background.
    #[arg(long)]
    dark: Option<u8>,

    /// Luminance above which pixels are background.
    #[arg(long)]
    light: Option<u8>,

    #[arg(long)]
    edge_tolerance: Option<f32>,

    #[command(flatten)]
    soft: SoftEdgeArgs,

    /// Bound on the larger side of every frame.
    #[arg(long)]
    max_size: Option<u32>,

    /// Resample to this many frames per second.
    #[arg(long)]
    fps: Option<f64>,

    /// Keep every n-th sampled frame.
    #[arg(long)]
    skip: Option<u32>,

    #[arg(long)]
    duplicate_threshold: Option<f64>,

    /// Document frame rate override.
    #[arg(long)]
    frame_rate: Option<u32>,

    #[arg(long, value_enum)]
    format: Option<FormatChoice>,

    /// Lossy WebP quality.
    #[arg(long)]
    quality: Option<u8>,

    /// Encode assets in parallel.
    #[arg(long)]
    parallel: bool,

    #[arg(long)]
    threads: Option<usize>,

    #[arg(long)]
    overwrite: bool,
}

#[derive(Parser, Debug)]
struct PatternArgs {
    #[arg(long)]
    pattern: ShapePattern,

    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value_t = 512)]
    size: u32,

    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Seconds per revolution.
    #[arg(long, default_value_t = 3.0)]
    duration: f64,

    #[arg(long)]
    overwrite: bool,
}

#[derive(Parser, Debug)]
struct SpinArgs {
    /// Input still image.
    #[arg(long = "in")]
    in_path: PathBuf,

    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value_t = 512)]
    size: u32,

    #[arg(long, default_value_t = 30)]
    fps: u32,

    #[arg(long, default_value_t = 3.0)]
    duration: f64,

    /// Background to cut out before spinning.
    #[arg(long, value_enum, default_value_t = BackgroundChoice::Light)]
    background: BackgroundChoice,

    #[command(flatten)]
    removal: StillRemovalArgs,

    #[arg(long)]
    overwrite: bool,
}

#[derive(Parser, Debug)]
struct CutoutArgs {
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, value_enum, default_value_t = BackgroundChoice::Both)]
    background: BackgroundChoice,

    #[command(flatten)]
    removal: StillRemovalArgs,

    /// Crop to the centred circle.
    #[arg(long)]
    circle: bool,

    /// Ring painted inside the circle edge, in pixels; 0 disables it.
    #[arg(long, default_value_t = 0, requires = "circle")]
    ring_width: u32,

    /// Ring colour as `#rrggbb` or `#rrggbbaa`.
    #[arg(long, default_value = "#ffd700", value_parser = parse_rgba, requires = "circle")]
    ring_color: [u8; 4],
}

/// Attenuate edge pixels near the removal thresholds instead of keeping them opaque.
#[derive(clap::Args, Debug, Default)]
struct SoftEdgeArgs {
    /// Luminance band past each threshold where edge alpha is scaled.
    #[arg(long)]
    soft_band: Option<u8>,

    /// Alpha factor for edge pixels inside the band, in (0, 1].
    #[arg(long)]
    soft_scale: Option<f32>,
}

impl SoftEdgeArgs {
    fn soft_edge(&self) -> Option<SoftEdge> {
        if self.soft_band.is_none() && self.soft_scale.is_none() {
            return None;
        }
        let base = SoftEdge::default();
        Some(SoftEdge {
            band: self.soft_band.unwrap_or(base.band),
            alpha_scale: self.soft_scale.unwrap_or(base.alpha_scale),
        })
    }
}

/// Removal knobs shared by the still-image commands.
#[derive(clap::Args, Debug, Default)]
struct StillRemovalArgs {
    #[command(flatten)]
    soft: SoftEdgeArgs,

    /// Program used by `--background model` (default: rembg).
    #[arg(long)]
    model_command: Option<String>,

    /// Argument passed to `--model-command`; repeatable.
    #[arg(long = "model-arg", requires = "model_command", allow_hyphen_values = true)]
    model_args: Vec<String>,
}

impl StillRemovalArgs {
    fn model(&self) -> ModelRemoverConfig {
        match &self.model_command {
            Some(command) => ModelRemoverConfig {
                command: command.clone(),
                args: self.model_args.clone(),
            },
            None => ModelRemoverConfig::default(),
        }
    }
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RemovalChoice {
    Threshold,
    Model,
    None,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Png,
    Webp,
    WebpLossless,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BackgroundChoice {
    /// Near-white backgrounds.
    Light,
    /// Near-black backgrounds.
    Dark,
    Both,
    /// External segmentation model; falls back to `both` when it is not installed.
    Model,
    None,
}

impl From<RemovalChoice> for RemovalStrategy {
    fn from(c: RemovalChoice) -> Self {
        match c {
            RemovalChoice::Threshold => Self::Threshold,
            RemovalChoice::Model => Self::Model,
            RemovalChoice::None => Self::None,
        }
    }
}

impl From<FormatChoice> for StillFormat {
    fn from(c: FormatChoice) -> Self {
        match c {
            FormatChoice::Png => Self::Png,
            FormatChoice::Webp => Self::Webp,
            FormatChoice::WebpLossless => Self::WebpLossless,
        }
    }
}

impl BackgroundChoice {
    fn remover(
        self,
        args: &StillRemovalArgs,
    ) -> anyhow::Result<Option<Box<dyn BackgroundRemover>>> {
        let policy = match self {
            Self::Light => RemovalPolicy::light(200),
            Self::Dark => RemovalPolicy::dark(30),
            Self::Both | Self::Model => RemovalPolicy::default(),
            Self::None => return Ok(None),
        };
        let policy = match args.soft.soft_edge() {
            Some(soft) => policy.with_soft_edge(soft),
            None => policy,
        };

        let model = args.model();
        let (strategy, caps) = if self == Self::Model {
            (
                RemovalStrategy::Model,
                Capabilities::probe_with_model(&model.command),
            )
        } else {
            (RemovalStrategy::Threshold, Capabilities::none())
        };
        let remover = select_remover(strategy, &policy, &model, &caps)?;
        if let Some(r) = &remover {
            tracing::debug!(remover = r.name(), ?policy, "still remover");
        }
        Ok(remover)
    }
}

fn parse_rgba(s: &str) -> Result<[u8; 4], String> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
        return Err(format!("expected #rrggbb or #rrggbbaa, got '{s}'"));
    }
    let mut rgba = [0, 0, 0, 255];
    for (i, slot) in rgba.iter_mut().enumerate().take(hex.len() / 2) {
        *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|e| format!("bad colour '{s}': {e}"))?;
    }
    Ok(rgba)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Convert(args) => cmd_convert(args),
        Command::Pattern(args) => cmd_pattern(args),
        Command::Spin(args) => cmd_spin(args),
        Command::Cutout(args) => cmd_cutout(args),
        Command::Probe(args) => cmd_probe(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "lottiecast=debug"
    } else {
        "lottiecast=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn convert_options(args: &ConvertArgs) -> anyhow::Result<ConvertOptions> {
    let mut opts = match &args.config {
        Some(path) => ConvertOptions::from_json_file(path)?,
        None => ConvertOptions::default(),
    };
    if let Some(preset) = args.preset {
        preset.apply(&mut opts);
    }

    let e = &mut opts.extract;
    if let Some(removal) = args.removal {
        e.removal_strategy = removal.into();
        e.remove_background = !matches!(removal, RemovalChoice::None);
    }
    if args.no_remove_bg {
        e.remove_background = false;
    }
    if let Some(dark) = args.dark {
        e.policy.dark_threshold = Some(dark);
    }
    if let Some(light) = args.light {
        e.policy.light_threshold = Some(light);
    }
    if let Some(tol) = args.edge_tolerance {
        e.policy.edge_tolerance = tol;
    }
    if let Some(soft) = args.soft.soft_edge() {
        e.policy.soft_edge = Some(soft);
    }
    if let Some(max) = args.max_size {
        e.max_dimension = max;
    }
    if let Some(fps) = args.fps {
        e.target_frame_rate = Some(fps);
    }
    if let Some(skip) = args.skip {
        e.frame_skip_stride = skip;
    }
    if let Some(dup) = args.duplicate_threshold {
        e.duplicate_threshold = dup;
    }

    let a = &mut opts.assemble;
    if let Some(fr) = args.frame_rate {
        a.frame_rate = Some(fr);
    }
    if let Some(format) = args.format {
        a.format = format.into();
    }
    if let Some(q) = args.quality {
        a.quality = q;
    }
    if args.parallel {
        a.threading.parallel = true;
    }
    if let Some(n) = args.threads {
        a.threading.parallel = true;
        a.threading.threads = Some(n);
    }
    if args.overwrite {
        opts.overwrite = true;
    }

    opts.validate()?;
    Ok(opts)
}

fn cmd_convert(args: ConvertArgs) -> anyhow::Result<()> {
    let opts = convert_options(&args)?;
    let report = lottiecast::convert_file(
        &args.in_path,
        args.out.as_deref(),
        &opts,
        &CancelToken::new(),
    )?;
    eprintln!(
        "{} frames -> {} layers at {} fps, {:.2}s, {:.1} KiB ({} duplicates skipped)",
        report.stats.source_frames,
        report.layers,
        report.frame_rate,
        report.duration_secs,
        report.bytes as f64 / 1024.0,
        report.stats.duplicates_skipped
    );
    eprintln!("wrote {}", report.output.display());
    Ok(())
}

fn cmd_pattern(args: PatternArgs) -> anyhow::Result<()> {
    let opts = PatternOptions {
        size: args.size,
        frame_rate: args.fps,
        duration_s: args.duration,
    };
    let doc = lottiecast::build_pattern_document(args.pattern, &opts)?;
    lottiecast::write_document(&args.out, &doc, args.overwrite)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_spin(args: SpinArgs) -> anyhow::Result<()> {
    let frame = load_still(&args.in_path)?;
    let remover = args.background.remover(&args.removal)?;
    let opts = SpinOptions {
        canvas: args.size,
        frame_rate: args.fps,
        duration_s: args.duration,
        ..SpinOptions::default()
    };
    let doc = lottiecast::spin_document(frame, remover.as_deref(), &opts)?;
    lottiecast::write_document(&args.out, &doc, args.overwrite)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_cutout(args: CutoutArgs) -> anyhow::Result<()> {
    let frame = load_still(&args.in_path)?;
    let frame = match args.background.remover(&args.removal)? {
        Some(remover) => remover.remove(frame)?,
        None => frame,
    };
    let frame = if args.circle {
        let ring = (args.ring_width > 0).then_some(Ring {
            width: args.ring_width,
            rgba: args.ring_color,
        });
        lottiecast::circular_crop(frame, ring)?
    } else {
        frame
    };

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let (width, height) = frame.dimensions();
    image::save_buffer_with_format(
        &args.out,
        frame.as_rgba8(),
        width,
        height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let caps = Capabilities::probe();
    let source = lottiecast::open_source(&args.in_path, &caps)?;
    let info = source.info();
    println!("path: {}", args.in_path.display());
    println!("size: {}x{}", info.width, info.height);
    match info.native_frame_rate {
        Some(fps) => println!("native fps: {fps:.3}"),
        None => println!("native fps: unknown"),
    }
    match info.frame_count {
        Some(n) => println!("frames: {n}"),
        None => println!("frames: unknown"),
    }
    println!("model remover: {}", yes_no(caps.model_remover));
    println!("ffmpeg: {}", yes_no(caps.ffmpeg));
    println!("ffprobe: {}", yes_no(caps.ffprobe));
    Ok(())
}

fn load_still(path: &Path) -> anyhow::Result<Frame> {
    let img = image::open(path).with_context(|| format!("open image '{}'", path.display()))?;
    Ok(Frame::from_dynamic_image(img)?)
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}
