use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use card_press::{
    compose_pdf, parse_card_list, write_card_list, AspectRotation, CardBatch, ComposeRequest,
    ComposerOptions, FeedDirection, ImageAdjustment, PageSize, RotateDirection, RotationMode,
};

mod logger;

#[derive(Parser)]
#[command(name = "cardpress", about = "Printable card sheet generator", version)]
struct Cli {
    /// Enable progress output on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a card sheet PDF from card images
    Pdf {
        /// Card front image file(s) or directory(ies)
        #[arg(value_name = "IMAGE")]
        fronts: Vec<PathBuf>,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,

        /// Page size
        #[arg(long, value_enum)]
        page_size: Option<PageSizeArg>,

        /// Page resolution in dots per inch
        #[arg(long)]
        dpi: Option<u32>,

        /// Card width in mm
        #[arg(short = 'W', long)]
        width: Option<f64>,

        /// Card height in mm
        #[arg(short = 'H', long)]
        height: Option<f64>,

        /// Card bleed in mm [a4/a3: 3, letter/tabloid: 1.5]
        #[arg(long)]
        bleed: Option<f64>,

        /// Page margin in mm
        #[arg(long)]
        margin: Option<f64>,

        /// Minimum card spacing in mm [a4/a3: 1, letter/tabloid: 0]
        #[arg(long)]
        spacing: Option<f64>,

        /// Distance between card rows and the fold line in mm
        #[arg(long)]
        fold: Option<f64>,

        /// Bleed already present in front images, in mm
        #[arg(long, default_value = "0")]
        front_bleed: f64,

        /// Back image for the cards listed on the command line
        #[arg(short, long)]
        back: Option<PathBuf>,

        /// Bleed already present in the back image, in mm
        #[arg(long, default_value = "0")]
        back_bleed: f64,

        /// Disable automatic aspect rotation of card images
        #[arg(long)]
        no_rotate: bool,

        /// Rotation direction for aspect rotation
        #[arg(long, default_value = "anticlockwise", value_enum)]
        rotate_dir: RotateDirArg,

        /// Fronts and backs on separate pages instead of a foldable layout
        #[arg(long)]
        twosided: bool,

        /// Printer feed direction for two-sided output
        #[arg(long, default_value = "portrait", value_enum)]
        feed_dir: FeedDirArg,

        /// Generate only odd-numbered (front side) pages
        #[arg(long, conflicts_with = "only_back")]
        only_front: bool,

        /// Generate only even-numbered (back side) pages
        #[arg(long)]
        only_back: bool,

        /// Back side x offset in mm for two-sided output
        #[arg(long, default_value = "0")]
        back_offset_x: f64,

        /// Back side y offset in mm for two-sided output
        #[arg(long, default_value = "0")]
        back_offset_y: f64,

        /// Card list file(s) to include
        #[arg(long)]
        list: Vec<PathBuf>,

        /// Read a card list from stdin
        #[arg(long)]
        stdin: bool,

        /// Overwrite the output file if it exists
        #[arg(long)]
        overwrite: bool,

        /// Options file (JSON) providing defaults for geometry settings
        #[arg(long)]
        conf: Option<PathBuf>,
    },

    /// Write a card list for later use with the pdf subcommand
    List {
        /// Card front image file(s) or directory(ies)
        #[arg(value_name = "IMAGE", required = true)]
        fronts: Vec<PathBuf>,

        /// Back image for the listed cards (blank back if omitted)
        #[arg(short, long)]
        back: Option<PathBuf>,

        /// Bleed already present in the back image, in mm
        #[arg(long, default_value = "0")]
        back_bleed: f64,

        /// Bleed already present in front images, in mm
        #[arg(long, default_value = "0")]
        front_bleed: f64,

        /// Write the card list to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append to the output file instead of overwriting
        #[arg(long, requires = "output")]
        append: bool,

        /// Pass a card list from stdin through to the output
        #[arg(long)]
        stdin: bool,

        /// Place the new batch before the stdin batches
        #[arg(long, requires = "stdin")]
        first: bool,
    },

    /// Rotate, resize, and add or crop bleed on card images
    Image {
        /// Source image file(s) or directory(ies)
        #[arg(value_name = "IMAGE", required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (single input only)
        #[arg(short, long, conflicts_with = "prefix")]
        output: Option<PathBuf>,

        /// Write each result next to its input, with this filename prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Rotate images not matching this aspect
        #[arg(short = 'a', long, value_enum, conflicts_with = "rotate_all")]
        rotate_to_aspect: Option<AspectArg>,

        /// Rotate every image a quarter turn
        #[arg(long)]
        rotate_all: bool,

        /// Rotation direction
        #[arg(long, default_value = "anticlockwise", value_enum)]
        rotate_dir: RotateDirArg,

        /// Resize to the given physical size (after rotation, before bleed)
        #[arg(short, long)]
        resize: bool,

        /// New (rotated) width in mm
        #[arg(short = 'W', long, default_value = "61.5")]
        width: f64,

        /// New (rotated) height in mm
        #[arg(short = 'H', long, default_value = "88")]
        height: f64,

        /// Bleed to add in mm; negative values crop
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        bleed: f64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PageSizeArg {
    A4,
    A3,
    Letter,
    Tabloid,
}

#[derive(Clone, Copy, ValueEnum)]
enum FeedDirArg {
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, ValueEnum)]
enum RotateDirArg {
    Clockwise,
    Anticlockwise,
}

#[derive(Clone, Copy, ValueEnum)]
enum AspectArg {
    Portrait,
    Landscape,
}

impl From<PageSizeArg> for PageSize {
    fn from(arg: PageSizeArg) -> Self {
        match arg {
            PageSizeArg::A4 => Self::A4,
            PageSizeArg::A3 => Self::A3,
            PageSizeArg::Letter => Self::Letter,
            PageSizeArg::Tabloid => Self::Tabloid,
        }
    }
}

impl From<FeedDirArg> for FeedDirection {
    fn from(arg: FeedDirArg) -> Self {
        match arg {
            FeedDirArg::Portrait => Self::Portrait,
            FeedDirArg::Landscape => Self::Landscape,
        }
    }
}

impl From<RotateDirArg> for RotateDirection {
    fn from(arg: RotateDirArg) -> Self {
        match arg {
            RotateDirArg::Clockwise => Self::Clockwise,
            RotateDirArg::Anticlockwise => Self::Anticlockwise,
        }
    }
}

impl From<AspectArg> for RotationMode {
    fn from(arg: AspectArg) -> Self {
        match arg {
            AspectArg::Portrait => Self::ToPortrait,
            AspectArg::Landscape => Self::ToLandscape,
        }
    }
}

/// Expand directory arguments into the image files they contain; plain file
/// arguments must themselves look like images.
fn expand_image_args(args: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for arg in args {
        if arg.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(arg)
                .with_context(|| format!("cannot read directory {}", arg.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file() && image::ImageFormat::from_path(path).is_ok())
                .collect();
            entries.sort();
            files.extend(entries);
        } else {
            if image::ImageFormat::from_path(arg).is_err() {
                bail!("not a valid image: {}", arg.display());
            }
            files.push(arg.clone());
        }
    }
    Ok(files)
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("failed to read stdin")?;
    Ok(text)
}

#[allow(clippy::too_many_arguments)]
async fn run_pdf(
    fronts: Vec<PathBuf>,
    output: PathBuf,
    page_size: Option<PageSizeArg>,
    dpi: Option<u32>,
    width: Option<f64>,
    height: Option<f64>,
    bleed: Option<f64>,
    margin: Option<f64>,
    spacing: Option<f64>,
    fold: Option<f64>,
    front_bleed: f64,
    back: Option<PathBuf>,
    back_bleed: f64,
    no_rotate: bool,
    rotate_dir: RotateDirArg,
    twosided: bool,
    feed_dir: FeedDirArg,
    only_front: bool,
    only_back: bool,
    back_offset_x: f64,
    back_offset_y: f64,
    list: Vec<PathBuf>,
    stdin: bool,
    overwrite: bool,
    conf: Option<PathBuf>,
) -> Result<()> {
    // Settings resolve in precedence order: explicit flag, options file,
    // page-size defaults.
    let mut options = match &conf {
        Some(path) => ComposerOptions::load(path)
            .await
            .with_context(|| format!("cannot load options file {}", path.display()))?,
        None => {
            let page_size = page_size.map(PageSize::from).unwrap_or_default();
            ComposerOptions::for_page_size(page_size)
        }
    };
    if let Some(arg) = page_size {
        if conf.is_some() {
            options.page_size = arg.into();
            options.bleed_mm = options.page_size.default_bleed_mm();
            options.spacing_mm = options.page_size.default_spacing_mm();
        }
    }
    if let Some(dpi) = dpi {
        options.dpi = dpi;
    }
    if let Some(width) = width {
        options.card_width_mm = width;
    }
    if let Some(height) = height {
        options.card_height_mm = height;
    }
    if let Some(bleed) = bleed {
        options.bleed_mm = bleed;
    }
    if let Some(margin) = margin {
        options.margin_mm = margin;
    }
    if let Some(spacing) = spacing {
        options.spacing_mm = spacing;
    }
    if let Some(fold) = fold {
        options.fold_mm = fold;
    }
    options.two_sided = twosided;
    options.feed_direction = feed_dir.into();
    options.print_fronts = !only_back;
    options.print_backs = !only_front;
    options.back_offset_x_mm = back_offset_x;
    options.back_offset_y_mm = back_offset_y;

    let mut batches = Vec::new();
    let front_files = expand_image_args(&fronts)?;
    if !front_files.is_empty() {
        batches.push(CardBatch {
            back_image: back,
            back_bleed_mm: back_bleed,
            front_bleed_mm: front_bleed,
            fronts: front_files,
        });
    }
    for path in &list {
        let mut parsed = card_press::load_card_list(path)
            .await
            .with_context(|| format!("cannot load card list {}", path.display()))?;
        batches.append(&mut parsed);
    }
    if stdin {
        batches.append(&mut parse_card_list(&read_stdin()?)?);
    }
    if batches.is_empty() {
        bail!("no card images given; pass image files, --list, or --stdin");
    }

    let transform = (!no_rotate).then(|| AspectRotation {
        portrait: true,
        clockwise: matches!(rotate_dir, RotateDirArg::Clockwise),
        physical: true,
    });

    let request = ComposeRequest {
        output: output.clone(),
        options,
        transform,
        batches,
        overwrite,
    };
    let summary = compose_pdf(request).await?;
    println!(
        "Generated {} cards over {} pages → {}",
        summary.cards,
        summary.pages,
        output.display()
    );
    Ok(())
}

async fn run_list(
    fronts: Vec<PathBuf>,
    back: Option<PathBuf>,
    back_bleed: f64,
    front_bleed: f64,
    output: Option<PathBuf>,
    append: bool,
    stdin: bool,
    first: bool,
) -> Result<()> {
    let batch = CardBatch {
        back_image: back,
        back_bleed_mm: back_bleed,
        front_bleed_mm: front_bleed,
        fronts: expand_image_args(&fronts)?,
    };

    // Batches passed through from stdin keep their position relative to the
    // new one.
    let mut batches = Vec::new();
    if stdin {
        let passed = parse_card_list(&read_stdin()?)?;
        if first {
            batches.push(batch);
            batches.extend(passed);
        } else {
            batches.extend(passed);
            batches.push(batch);
        }
    } else {
        batches.push(batch);
    }
    let text = write_card_list(&batches);

    match output {
        Some(path) => {
            if append {
                let mut existing = match tokio::fs::read_to_string(&path).await {
                    Ok(existing) => existing,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
                    Err(e) => return Err(e.into()),
                };
                existing.push_str(&text);
                tokio::fs::write(&path, existing).await?;
            } else {
                tokio::fs::write(&path, text).await?;
            }
            info!("wrote card list to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

async fn run_image(
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
    prefix: Option<String>,
    rotate_to_aspect: Option<AspectArg>,
    rotate_all: bool,
    rotate_dir: RotateDirArg,
    resize: bool,
    width: f64,
    height: f64,
    bleed: f64,
) -> Result<()> {
    let prefix = match (&output, prefix) {
        (None, None) => bail!("either --output or --prefix must be set"),
        (Some(_), None) => None,
        (None, Some(prefix)) => Some(prefix),
        (Some(_), Some(_)) => unreachable!("clap rejects --output with --prefix"),
    };

    let inputs = expand_image_args(&inputs)?;
    if output.is_some() && inputs.len() > 1 {
        bail!("--output can only be used with a single input image");
    }

    let rotation = if rotate_all {
        RotationMode::Always
    } else {
        rotate_to_aspect.map(RotationMode::from).unwrap_or_default()
    };
    let adjustment = ImageAdjustment {
        rotation,
        rotate_direction: rotate_dir.into(),
        resize_mm: resize.then_some((width, height)),
        bleed_mm: bleed,
    };

    for input in inputs {
        let target = match (&output, &prefix) {
            (Some(path), _) => path.clone(),
            (None, Some(prefix)) => prefixed_path(&input, prefix)?,
            (None, None) => unreachable!(),
        };
        info!("adjusting {} → {}", input.display(), target.display());
        card_press::adjust_image_file(&input, &target, adjustment).await?;
    }
    Ok(())
}

fn prefixed_path(input: &Path, prefix: &str) -> Result<PathBuf> {
    let name = input
        .file_name()
        .with_context(|| format!("no file name in {}", input.display()))?;
    let mut prefixed = std::ffi::OsString::from(prefix);
    prefixed.push(name);
    Ok(input.with_file_name(prefixed))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _ = logger::StderrLogger::init(cli.verbose);

    match cli.command {
        Commands::Pdf {
            fronts,
            output,
            page_size,
            dpi,
            width,
            height,
            bleed,
            margin,
            spacing,
            fold,
            front_bleed,
            back,
            back_bleed,
            no_rotate,
            rotate_dir,
            twosided,
            feed_dir,
            only_front,
            only_back,
            back_offset_x,
            back_offset_y,
            list,
            stdin,
            overwrite,
            conf,
        } => {
            run_pdf(
                fronts,
                output,
                page_size,
                dpi,
                width,
                height,
                bleed,
                margin,
                spacing,
                fold,
                front_bleed,
                back,
                back_bleed,
                no_rotate,
                rotate_dir,
                twosided,
                feed_dir,
                only_front,
                only_back,
                back_offset_x,
                back_offset_y,
                list,
                stdin,
                overwrite,
                conf,
            )
            .await
        }

        Commands::List {
            fronts,
            back,
            back_bleed,
            front_bleed,
            output,
            append,
            stdin,
            first,
        } => run_list(fronts, back, back_bleed, front_bleed, output, append, stdin, first).await,

        Commands::Image {
            inputs,
            output,
            prefix,
            rotate_to_aspect,
            rotate_all,
            rotate_dir,
            resize,
            width,
            height,
            bleed,
        } => {
            run_image(
                inputs,
                output,
                prefix,
                rotate_to_aspect,
                rotate_all,
                rotate_dir,
                resize,
                width,
                height,
                bleed,
            )
            .await
        }
    }
}
