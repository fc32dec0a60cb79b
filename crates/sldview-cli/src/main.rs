use serde::Serialize;
use sldview::{
    ArrowPlacement, Container, DiagramMetadata, DiagramViewer, Interaction, SizeConstraints,
    ViewBox, ViewerCallbacks, ViewerConfig, ViewerOptions, ZoomRange,
};
use std::str::FromStr;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Viewer(sldview::Error),
    Json(serde_json::Error),
    Render(&'static str),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Viewer(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Render(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<sldview::Error> for CliError {
    fn from(value: sldview::Error) -> Self {
        Self::Viewer(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Inspect,
    Render,
}

#[derive(Debug, Clone, Copy, Default)]
enum RenderFormat {
    #[default]
    Svg,
    Png,
}

impl FromStr for RenderFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    svg_path: Option<String>,
    metadata_path: Option<String>,
    config_path: Option<String>,
    svg_type: Option<String>,
    constraints: SizeConstraints,
    pretty: bool,
    render_format: RenderFormat,
    render_scale: f32,
    background: Option<String>,
    out: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectOut<'a> {
    width: f64,
    height: f64,
    view_box: ViewBox,
    natural: ViewBox,
    zoom: f64,
    zoom_range: ZoomRange,
    arrows: &'a [ArrowPlacement],
    interactions: Vec<Interaction>,
}

fn usage() -> &'static str {
    "sldview-cli\n\
\n\
USAGE:\n\
  sldview-cli [inspect] [--pretty] [OPTIONS] <svg-path> <metadata-path>\n\
  sldview-cli render [--format svg|png] [--scale <n>] [--background <css-color>] [--out <path>] [OPTIONS] <svg-path> <metadata-path>\n\
\n\
OPTIONS:\n\
  --type <svg-type>        diagram flavor (default: voltage-level)\n\
  --min-width <w>          minimum surface width\n\
  --min-height <h>         minimum surface height\n\
  --max-width <w>          maximum surface width\n\
  --max-height <h>         maximum surface height\n\
  --config <path>          viewer config JSON (camelCase keys, all optional)\n\
\n\
NOTES:\n\
  - inspect prints the viewport, synthesized arrows and interactive elements as JSON.\n\
  - render prints the interactive SVG to stdout by default; use --out to write a file.\n\
  - PNG output defaults to writing next to the SVG input file.\n\
  - Set RUST_LOG (e.g. RUST_LOG=sldview=debug) to trace initialization on stderr.\n\
"
}

fn next_number<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<f64, CliError> {
    let Some(raw) = it.next() else {
        return Err(CliError::Usage(usage()));
    };
    let v = raw.parse::<f64>().map_err(|_| CliError::Usage(usage()))?;
    if !(v.is_finite() && v > 0.0) {
        return Err(CliError::Usage(usage()));
    }
    Ok(v)
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args {
        command: Command::Inspect,
        render_format: RenderFormat::Svg,
        render_scale: 1.0,
        ..Default::default()
    };

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "inspect" => args.command = Command::Inspect,
            "render" => args.command = Command::Render,
            "--pretty" => args.pretty = true,
            "--type" => {
                let Some(t) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.svg_type = Some(t.clone());
            }
            "--min-width" => args.constraints.min_width = next_number(&mut it)?,
            "--min-height" => args.constraints.min_height = next_number(&mut it)?,
            "--max-width" => args.constraints.max_width = next_number(&mut it)?,
            "--max-height" => args.constraints.max_height = next_number(&mut it)?,
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config_path = Some(path.clone());
            }
            "--format" => {
                let Some(fmt) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.render_format = fmt
                    .parse::<RenderFormat>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--scale" => {
                args.render_scale = next_number(&mut it)? as f32;
            }
            "--background" => {
                let Some(bg) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                if !bg.trim().is_empty() {
                    args.background = Some(bg.trim().to_string());
                }
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.svg_path.is_none() {
                    args.svg_path = Some(path.to_string());
                } else if args.metadata_path.is_none() {
                    args.metadata_path = Some(path.to_string());
                } else {
                    return Err(CliError::Usage(usage()));
                }
            }
        }
    }

    let c = &args.constraints;
    if args.metadata_path.is_none() || c.min_width > c.max_width || c.min_height > c.max_height {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    Ok(())
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None => {
            print!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

/// Callbacks only log: the CLI has no application to navigate or toggle anything, but they keep
/// every interaction category wired.
fn logging_callbacks() -> ViewerCallbacks {
    ViewerCallbacks::default()
        .with_next_voltage_level(|vl| tracing::info!(next = vl, "navigate"))
        .with_breaker(|equipment, open, _| tracing::info!(equipment, open, "toggle switch"))
        .with_feeder(|equipment, component_type, id, x, y| {
            tracing::info!(equipment, ?component_type, id, x, y, "feeder menu");
        })
}

fn build_viewer(args: &Args) -> Result<DiagramViewer, CliError> {
    let (Some(svg_path), Some(metadata_path)) = (&args.svg_path, &args.metadata_path) else {
        return Err(CliError::Usage(usage()));
    };
    let svg = std::fs::read_to_string(svg_path)?;
    let metadata = DiagramMetadata::from_json(&std::fs::read_to_string(metadata_path)?)?;
    let config = match &args.config_path {
        Some(path) => ViewerConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => ViewerConfig::default(),
    };

    let mut options = ViewerOptions {
        constraints: args.constraints,
        config,
        ..Default::default()
    };
    if let Some(t) = &args.svg_type {
        options.svg_type = t.clone();
    }

    let mut viewer = DiagramViewer::new(
        Some(Container::new()),
        svg,
        metadata,
        options,
        logging_callbacks(),
    );
    if !viewer.is_initialized() {
        // Re-run to surface the reason.
        viewer.try_initialize()?;
    }
    Ok(viewer)
}

fn default_png_out_path(svg_path: Option<&str>) -> std::path::PathBuf {
    match svg_path {
        Some(path) => std::path::PathBuf::from(path).with_extension("png"),
        None => std::path::PathBuf::from("out.png"),
    }
}

fn render_svg_to_png(svg: &str, scale: f32, background: Option<&str>) -> Result<Vec<u8>, CliError> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)
        .map_err(|_| CliError::Render("failed to parse SVG for PNG rendering"))?;
    let size = tree.size();
    let width_px = (size.width() * scale).ceil().max(1.0) as u32;
    let height_px = (size.height() * scale).ceil().max(1.0) as u32;

    let mut pixmap = tiny_skia::Pixmap::new(width_px, height_px)
        .ok_or(CliError::Render("failed to allocate pixmap for PNG rendering"))?;
    if let Some(color) = background.and_then(parse_tiny_skia_color) {
        pixmap.fill(color);
    }
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    pixmap
        .encode_png()
        .map_err(|_| CliError::Render("failed to encode PNG"))
}

fn parse_tiny_skia_color(text: &str) -> Option<tiny_skia::Color> {
    let s = text.trim().to_ascii_lowercase();
    match s.as_str() {
        "transparent" => return Some(tiny_skia::Color::from_rgba8(0, 0, 0, 0)),
        "white" => return Some(tiny_skia::Color::from_rgba8(255, 255, 255, 255)),
        "black" => return Some(tiny_skia::Color::from_rgba8(0, 0, 0, 255)),
        _ => {}
    }

    let hex = s.strip_prefix('#')?;
    let channel = |i: usize, width: usize| -> Option<u8> {
        let v = u8::from_str_radix(hex.get(i * width..(i + 1) * width)?, 16).ok()?;
        Some(if width == 1 { (v << 4) | v } else { v })
    };
    match hex.len() {
        3 => Some(tiny_skia::Color::from_rgba8(
            channel(0, 1)?,
            channel(1, 1)?,
            channel(2, 1)?,
            255,
        )),
        6 => Some(tiny_skia::Color::from_rgba8(
            channel(0, 2)?,
            channel(1, 2)?,
            channel(2, 2)?,
            255,
        )),
        8 => Some(tiny_skia::Color::from_rgba8(
            channel(0, 2)?,
            channel(1, 2)?,
            channel(2, 2)?,
            channel(3, 2)?,
        )),
        _ => None,
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let viewer = build_viewer(&args)?;
    let Some(viewport) = viewer.viewport() else {
        return Err(CliError::Render("viewer produced no viewport"));
    };

    match args.command {
        Command::Inspect => {
            let report = InspectOut {
                width: viewport.width,
                height: viewport.height,
                view_box: viewport.view_box,
                natural: viewport.natural,
                zoom: viewport.zoom(),
                zoom_range: viewport.zoom_range,
                arrows: viewer.arrows(),
                interactions: viewer.interactions(),
            };
            write_json(&report, args.pretty)
        }
        Command::Render => {
            let markup = viewer
                .container()
                .map(Container::markup)
                .unwrap_or_default();
            match args.render_format {
                RenderFormat::Svg => write_text(&markup, args.out.as_deref()),
                RenderFormat::Png => {
                    let bytes =
                        render_svg_to_png(&markup, args.render_scale, args.background.as_deref())?;
                    let out = args.out.clone().unwrap_or_else(|| {
                        default_png_out_path(args.svg_path.as_deref())
                            .to_string_lossy()
                            .to_string()
                    });
                    if out == "-" {
                        use std::io::Write;
                        std::io::stdout().lock().write_all(&bytes)?;
                    } else {
                        std::fs::write(out, bytes)?;
                    }
                    Ok(())
                }
            }
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
