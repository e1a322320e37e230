//! Purpose: `koki` CLI entry point: read one image, report the markers in it.
//! Exports: Binary entry point only (no public library API).
//! Role: Thin harness over `koki::api`; owns argument parsing and output shaping.
//! Invariants: Prints `Reading <IMAGE>` before anything else on stdout.
//! Invariants: Errors go to stderr (JSON when not a TTY); exit codes come from `to_exit_code`.
//! Invariants: Notices are non-fatal and never alter stdout payloads.
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::error::ErrorKind as ClapErrorKind;
use clap::{Parser, ValueEnum, ValueHint};
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod marker_json;

use koki::api::{
    CameraParams, DEFAULT_MARGIN, DEFAULT_MARKER_WIDTH, DEFAULT_WINDOW, Detector, DetectorOptions,
    DirLog, Error, ErrorKind, FrameLog, NullLog, ThresholdMode, decode_image, to_exit_code,
};
use koki::notice::{Notice, frame_size_mismatch, notice_json};
use marker_json::{marker_json, marker_text, markers_document};

struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `koki --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing(cli.verbose);
    let color_mode = cli.color;
    detect(cli)
        .map(|()| RunOutcome::ok())
        .map_err(add_io_hint)
        .map_err(add_internal_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "koki",
    version,
    about = "Find square fiducial markers in an image",
    long_about = None,
    after_help = r#"EXAMPLES
  $ koki frame.jpg
  $ koki frame.jpg --format json --marker-width 0.08
  $ koki frame.png --camera webcam.yaml --debug-dir /tmp/koki-debug

Camera files (YAML or JSON) may set frameWidth, frameHeight, focalLengthX,
focalLengthY, principalPointX and principalPointY."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(help = "Image to read (JPEG or PNG)", value_hint = ValueHint::FilePath)]
    image: PathBuf,
    #[arg(long, value_enum, default_value = "text", help = "Output format")]
    format: OutputFormat,
    #[arg(
        long,
        default_value_t = DEFAULT_MARKER_WIDTH,
        help = "Printed marker width, in metres"
    )]
    marker_width: f64,
    #[arg(long, help = "Camera parameter file (.yaml/.yml or JSON)", value_hint = ValueHint::FilePath)]
    camera: Option<PathBuf>,
    #[arg(long, help = "Focal length in pixels (overrides the camera file)")]
    focal_length: Option<f64>,
    #[arg(
        long,
        default_value = "adaptive",
        value_parser = parse_threshold,
        help = "Threshold: adaptive, auto, or a fixed level 0-255"
    )]
    threshold: ThresholdArg,
    #[arg(long, default_value_t = DEFAULT_WINDOW, help = "Adaptive threshold window, in pixels")]
    window: u32,
    #[arg(
        long,
        default_value_t = DEFAULT_MARGIN,
        allow_negative_numbers = true,
        help = "Adaptive threshold margin below the local mean"
    )]
    margin: i16,
    #[arg(long, help = "Write intermediate images to this directory", value_hint = ValueHint::DirPath)]
    debug_dir: Option<PathBuf>,
    #[arg(short, long, help = "Log detection details to stderr")]
    verbose: bool,
    #[arg(long, value_enum, default_value = "auto", help = "Colorize stderr labels")]
    color: ColorMode,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Jsonl,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ThresholdArg {
    Adaptive,
    Auto,
    Level(u8),
}

fn parse_threshold(value: &str) -> Result<ThresholdArg, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "adaptive" => Ok(ThresholdArg::Adaptive),
        "auto" => Ok(ThresholdArg::Auto),
        other => other
            .parse::<u8>()
            .map(ThresholdArg::Level)
            .map_err(|_| format!("expected adaptive, auto, or 0-255, got `{value}`")),
    }
}

fn threshold_mode(arg: ThresholdArg, window: u32, margin: i16) -> ThresholdMode {
    match arg {
        ThresholdArg::Adaptive => ThresholdMode::Adaptive { window, margin },
        ThresholdArg::Auto => ThresholdMode::Auto,
        ThresholdArg::Level(level) => ThresholdMode::Global(level),
    }
}

fn positive(value: f64, flag: &str) -> Result<f64, Error> {
    if value.is_finite() && value > 0.0 {
        return Ok(value);
    }
    Err(Error::new(ErrorKind::Usage)
        .with_message(format!("{flag} must be a positive number, got {value}")))
}

fn detect(cli: Cli) -> Result<(), Error> {
    let marker_width = positive(cli.marker_width, "--marker-width")?;
    if cli.window == 0 {
        return Err(Error::new(ErrorKind::Usage).with_message("--window must be at least 1"));
    }

    let display_path = cli.image.display().to_string();
    println!("Reading {display_path}");

    let bytes = std::fs::read(&cli.image).map_err(|err| Error::from_io(err, &cli.image))?;
    let frame = decode_image(&bytes).map_err(|err| err.with_path(&cli.image))?;
    let frame_size = frame.dimensions();

    let mut params = CameraParams::for_frame(frame_size.0, frame_size.1);
    if let Some(camera) = &cli.camera {
        params = CameraParams::from_path(camera, params)?;
        if params.size != frame_size {
            let time = notice_time_now().unwrap_or_default();
            let notice = frame_size_mismatch(time, &display_path, params.size, frame_size);
            emit_notice(&notice, cli.color);
        }
    }
    if let Some(focal_length) = cli.focal_length {
        params = params.with_focal_length(positive(focal_length, "--focal-length")?);
    }

    let detector = Detector::new(DetectorOptions {
        threshold: threshold_mode(cli.threshold, cli.window, cli.margin),
        marker_width,
        ..DetectorOptions::default()
    });

    let dir_log;
    let log: &dyn FrameLog = match &cli.debug_dir {
        Some(dir) => {
            dir_log = DirLog::create(dir)?;
            &dir_log
        }
        None => &NullLog,
    };
    let markers = detector.find_markers_with(&frame, &params, |_| marker_width, log)?;

    match cli.format {
        OutputFormat::Text => {
            for (index, marker) in markers.iter().enumerate() {
                print!("{}", marker_text(index, marker));
            }
        }
        OutputFormat::Json => {
            let value = markers_document(&display_path, &markers);
            println!("{}", to_json_string(&value, true));
        }
        OutputFormat::Jsonl => {
            for marker in &markers {
                println!("{}", to_json_string(&marker_json(marker), false));
            }
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn to_json_string(value: &Value, pretty: bool) -> String {
    let encoded = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    encoded.unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::NotFound => err.with_hint("Check the image path."),
        ErrorKind::Permission => err.with_hint("Permission denied. Check file permissions."),
        ErrorKind::Io => err.with_hint("I/O error. Check the path, filesystem, and disk space."),
        _ => err,
    }
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with RUST_BACKTRACE=1 and share the image if it persists.",
    )
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn notice_time_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}

fn emit_notice(notice: &Notice, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!("{label} {} (path: {})", notice.message, notice.path);
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Decode => "could not decode image".to_string(),
        ErrorKind::Config => "invalid configuration".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));
    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    for cause in error_causes(err) {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
