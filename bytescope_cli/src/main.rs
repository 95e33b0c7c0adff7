use clap::{self, Parser as _};
use std::path::PathBuf;

mod print;
mod settings;

#[derive(clap::Parser, Debug)]
#[clap(version, about = "Identifies the format of a file and describes each of its bytes")]
struct Arguments {
    /// Path to the file to inspect.
    input: PathBuf,
    /// Directory containing additional format definitions, may be specified more than once.
    #[clap(long, short)]
    definitions: Vec<PathBuf>,
    /// Path to a TOML settings file.
    #[clap(long, short)]
    config: Option<PathBuf>,
    /// If set, files embedded in the input are inspected too.
    #[clap(long, short)]
    recursive: bool,
    /// Sets how deeply nested embedded files can be before they are no longer inspected.
    #[clap(long)]
    max_depth: Option<usize>,
    /// Only prints the lines of the tab with this name.
    #[clap(long)]
    tab: Option<String>,
    /// If set, prints every tagged byte range.
    #[clap(long)]
    ranges: bool,
    /// If set along with --ranges, prints a hex dump of the bytes in each range.
    #[clap(long)]
    dump: bool,
    /// If set, logs debugging information unless overridden by RUST_LOG.
    #[clap(long, short)]
    verbose: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("{path:?} is {size} bytes long, which exceeds the maximum input size of {limit} bytes")]
struct InputTooLarge {
    path: PathBuf,
    size: u64,
    limit: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let arguments = Arguments::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if arguments.verbose {
        "debug"
    } else {
        "warn"
    }))
    .init();

    let settings = match &arguments.config {
        Some(path) => settings::Settings::load(path)?,
        None => settings::Settings::default(),
    };

    let catalog = bytescope_load::Catalog::new();
    for directory in settings.definition_directories.iter().chain(&arguments.definitions) {
        for result in catalog.load_user_directory(directory)? {
            if let Err(error) = result {
                log::error!("{}", error);
            }
        }
    }

    let size = std::fs::metadata(&arguments.input)?.len();
    if size > settings.max_input_size {
        return Err(Box::new(InputTooLarge {
            path: arguments.input,
            size,
            limit: settings.max_input_size,
        }));
    }

    let bytes = std::fs::read(&arguments.input)?;
    let inspection = if arguments.recursive || settings.recursive {
        let depth = arguments.max_depth.unwrap_or(settings.max_embedding_depth);
        bytescope_inspect::inspect_recursive(&catalog, &bytes, depth)
    } else {
        bytescope_inspect::inspect(&catalog, &bytes)
    };

    let options = print::Options {
        tab: arguments.tab,
        ranges: arguments.ranges,
        dump: arguments.dump,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let name = arguments.input.display().to_string();
    print::inspection(&mut out, &name, &bytes, &inspection, &options, 0)?;
    Ok(())
}
