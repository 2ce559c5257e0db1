use clap::Parser;
use geostamp::{batch, exif::gps::GeoCoordinate, version, FilenameTimestampParser, StampOptions};
use std::{error::Error, path::PathBuf};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Write the date/time from each file name, and optionally a GPS position, into the Exif
/// metadata of every image in a folder
#[derive(Parser)]
#[command(name = version::name(), version)]
struct Cli {
    /// Folder with the images to modify
    #[arg(short, long)]
    input: PathBuf,
    /// Don't write the timestamp fields
    #[arg(short, long, action)]
    notime: bool,
    /// Position to write, as <latitude>,<longitude> in decimal degrees
    #[arg(short, long, allow_hyphen_values = true)]
    gps: Option<GeoCoordinate>,
    /// Print the metadata of every image as JSON instead of modifying anything
    #[arg(long, action)]
    dump: bool,
    #[arg(short, long, action)]
    verbose: bool,
}

impl Cli {
    fn stamp_options(&self) -> StampOptions {
        StampOptions {
            modify_timestamp: !self.notime,
            coordinate: self.gps,
        }
    }
}

fn init_logging(verbose: bool) {
    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> geostamp::Result<()> {
    if cli.dump {
        let entries = batch::dump_directory(&cli.input)?;
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    batch::process_directory(&cli.input, &cli.stamp_options(), &FilenameTimestampParser)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    debug!("{} {}", version::name(), version::version().unwrap_or("(unknown version)"));

    run(&cli).map_err(|e| {
        error!("{}", e);
        e.into()
    })
}
