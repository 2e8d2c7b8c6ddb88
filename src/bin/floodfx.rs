use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "floodfx", version)]
struct Cli {
    /// Log pipeline progress to stderr (repeat for more detail).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the distance field of the mask as an 8-bit grey PNG.
    Distance(DistanceArgs),
    /// Write the medial-axis skeleton of the mask.
    Skeleton(EffectArgs),
    /// Write the straight skeleton of the mask.
    StraightSkeleton(EffectArgs),
    /// Write an inner bevel highlight/shadow overlay for the mask.
    Bevel(EffectArgs),
}

#[derive(Args, Debug)]
struct EffectArgs {
    /// Input image; any format the `image` crate decodes.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Image channel used as the mask.
    #[arg(long, value_enum, default_value_t = SourceChoice::Alpha)]
    source: SourceChoice,

    /// Mask threshold in [0, 1]. Overrides the value in `--params`.
    #[arg(long)]
    threshold: Option<f32>,

    /// Effect parameters as a JSON object, e.g. '{"distance_scale": 2.0}'.
    #[arg(long)]
    params: Option<String>,

    /// Step schedule flavour.
    #[arg(long, value_enum, default_value_t = VariantChoice::Jfa)]
    variant: VariantChoice,

    /// Run per-cell kernels on a rayon thread pool.
    #[arg(long)]
    parallel: bool,

    /// Worker threads for `--parallel`.
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Args, Debug)]
struct DistanceArgs {
    #[command(flatten)]
    effect: EffectArgs,

    /// Signed distance (outline seeds, negative inside).
    #[arg(long)]
    signed: bool,

    /// Distance mapped to white. Defaults to the largest finite distance in the field.
    #[arg(long)]
    max: Option<f32>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SourceChoice {
    Alpha,
    Luma,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VariantChoice {
    Jfa,
    OnePlusJfa,
    OnePlusOnePlusJfa,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Distance(args) => cmd_distance(args),
        Command::Skeleton(args) => cmd_rgba("skeleton", args),
        Command::StraightSkeleton(args) => cmd_rgba("straight_skeleton", args),
        Command::Bevel(args) => cmd_rgba("inner_bevel", args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_distance(args: DistanceArgs) -> anyhow::Result<()> {
    let mut overrides = serde_json::Map::new();
    if args.signed {
        overrides.insert("signed_distance".to_string(), serde_json::Value::Bool(true));
    }
    let params = effect_params("distance", &args.effect, overrides)?;
    let mask = read_mask(&args.effect.in_path, args.effect.source)?;
    let mut pipeline = make_pipeline(&args.effect)?;

    let floodfx::EffectOutput::Field(field) = pipeline.apply(&mask, &params)? else {
        anyhow::bail!("distance effect produced no scalar field");
    };

    let max = match args.max {
        Some(m) => m,
        None => field
            .cells()
            .iter()
            .filter(|v| v.is_finite())
            .fold(0.0f32, |acc, v| acc.max(v.abs()))
            .max(1.0),
    };
    let gray = floodfx::gray8_from_field(field, max)?;
    write_png(
        &args.effect.out,
        &gray,
        field.dims(),
        image::ColorType::L8,
    )
}

fn cmd_rgba(kind: &str, args: EffectArgs) -> anyhow::Result<()> {
    let params = effect_params(kind, &args, serde_json::Map::new())?;
    let mask = read_mask(&args.in_path, args.source)?;
    let mut pipeline = make_pipeline(&args)?;

    let floodfx::EffectOutput::Rgba(rgba) = pipeline.apply(&mask, &params)? else {
        anyhow::bail!("{kind} effect produced no RGBA output");
    };
    let bytes = floodfx::rgba8_from_cells(rgba);
    write_png(&args.out, &bytes, rgba.dims(), image::ColorType::Rgba8)
}

fn effect_params(
    kind: &str,
    args: &EffectArgs,
    overrides: serde_json::Map<String, serde_json::Value>,
) -> anyhow::Result<floodfx::EffectParams> {
    let mut params = match &args.params {
        Some(json) => {
            let v: serde_json::Value =
                serde_json::from_str(json).with_context(|| "parse --params JSON")?;
            match v {
                serde_json::Value::Object(map) => map,
                _ => anyhow::bail!("--params must be a JSON object"),
            }
        }
        None => serde_json::Map::new(),
    };
    if let Some(t) = args.threshold {
        params.insert("threshold".to_string(), serde_json::json!(t));
    }
    params.extend(overrides);

    let spec = floodfx::EffectSpec {
        kind: kind.to_string(),
        params: serde_json::Value::Object(params),
    };
    Ok(floodfx::parse_effect(&spec)?)
}

fn make_pipeline(args: &EffectArgs) -> anyhow::Result<floodfx::Pipeline> {
    let opts = floodfx::EngineOpts {
        variant: match args.variant {
            VariantChoice::Jfa => floodfx::FloodVariant::Jfa,
            VariantChoice::OnePlusJfa => floodfx::FloodVariant::OnePlusJfa,
            VariantChoice::OnePlusOnePlusJfa => floodfx::FloodVariant::OnePlusOnePlusJfa,
        },
        threading: floodfx::Threading {
            parallel: args.parallel,
            threads: args.threads,
        },
    };
    Ok(floodfx::Pipeline::new(&opts)?)
}

fn read_mask(path: &Path, source: SourceChoice) -> anyhow::Result<floodfx::CellGrid<f32>> {
    let img = image::open(path)
        .with_context(|| format!("open image '{}'", path.display()))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    let source = match source {
        SourceChoice::Alpha => floodfx::MaskSource::Alpha,
        SourceChoice::Luma => floodfx::MaskSource::Luma,
    };
    Ok(floodfx::mask_from_rgba8(
        img.as_raw(),
        width,
        height,
        source,
    )?)
}

fn write_png(
    out: &Path,
    bytes: &[u8],
    (width, height): (u32, u32),
    color: image::ColorType,
) -> anyhow::Result<()> {
    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        out,
        bytes,
        width,
        height,
        color,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", out.display()))?;

    eprintln!("wrote {}", out.display());
    Ok(())
}
