//! Purpose: Render printable marker images (`koki-markergen <MARKER> <OUTPUT_PREFIX>`).
//! Role: Companion to `koki`; writes `<OUTPUT_PREFIX>-<MARKER>.png` and prints its path.
//! Invariants: Marker numbers outside the code table are usage errors (exit 2).
//! Invariants: Emits only a plain stderr message on failure.
use std::path::{Path, PathBuf};

use clap::Parser;
use koki::api::{Error, ErrorKind, MARKER_COUNT, render_marker, to_exit_code};

#[derive(Parser)]
#[command(
    name = "koki-markergen",
    version,
    about = "Render a printable koki marker as a PNG",
    after_help = "EXAMPLES\n  $ koki-markergen 7 marker        # writes marker-7.png"
)]
struct Cli {
    #[arg(help = "Marker number")]
    marker: u8,
    #[arg(help = "Output path prefix; `-<MARKER>.png` is appended")]
    output_prefix: PathBuf,
    #[arg(long, default_value_t = 40, help = "Pixels per marker cell")]
    cell_px: u32,
    #[arg(long, default_value_t = 2, help = "White margin around the marker, in cells")]
    margin_cells: u32,
}

fn main() {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(path) => println!("{}", path.display()),
        Err(err) => {
            eprintln!("koki-markergen: {err}");
            if let Some(hint) = err.hint() {
                eprintln!("hint: {hint}");
            }
            std::process::exit(to_exit_code(err.kind()));
        }
    }
}

fn output_path(prefix: &Path, marker: u8) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(format!("-{marker}.png"));
    PathBuf::from(name)
}

fn run(cli: &Cli) -> Result<PathBuf, Error> {
    if cli.marker as usize >= MARKER_COUNT {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("no marker number {}", cli.marker))
            .with_hint(format!("Marker numbers run from 0 to {}.", MARKER_COUNT - 1)));
    }
    let image = render_marker(cli.marker, cli.cell_px, cli.margin_cells)?;
    let path = output_path(&cli.output_prefix, cli.marker);
    image.save(&path).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write marker image")
            .with_path(&path)
            .with_source(err)
    })?;
    Ok(path)
}
