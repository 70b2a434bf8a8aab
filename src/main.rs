use clap::{ArgAction, Parser};
use rowgray::engine::{convert_file, ConvertOptions};
use rowgray::error::RowGrayError;
use rowgray::ops::{ExecutorKind, OutputFormat};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

#[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser)]
#[command(name = "rowgray")]
#[command(version, long_about = None)]
#[command(about = "Convert an image to grayscale, split by rows across workers")]
struct Cli {
    /// Input image (PNG or JPEG)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output image path
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Output format: 1 = PNG, 2 = JPEG
    #[arg(value_name = "FORMAT_CODE")]
    format_code: u32,

    /// Number of workers (required for threads and pool)
    #[arg(value_name = "WORKER_COUNT")]
    worker_count: Option<usize>,

    /// Concurrency substrate: threads, pool or distributed
    #[arg(long, value_name = "KIND", default_value = "threads", value_parser = parse_executor)]
    executor: ExecutorKind,

    /// More log output (repeat for trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn parse_executor(value: &str) -> Result<ExecutorKind, String> {
    ExecutorKind::from_str(value).map_err(|e| e.to_string())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), RowGrayError> {
    let format = OutputFormat::from_code(cli.format_code)?;
    let options = ConvertOptions {
        input: cli.input,
        output: cli.output,
        format,
        executor: cli.executor,
        worker_count: cli.worker_count,
    };
    let report = convert_file(&options)?;
    info!(
        workers = report.worker_count,
        executor = %report.executor,
        decode_ms = report.decode_time.as_millis() as u64,
        transform_ms = report.transform_time.as_millis() as u64,
        encode_ms = report.encode_time.as_millis() as u64,
        bytes = report.bytes_written,
        "done"
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let category = err.category();
            eprintln!("rowgray: [{}] {err}", category.as_str());
            ExitCode::from(category.exit_code() as u8)
        }
    }
}
