use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use datatab::data::{output, parse};
use datatab::{HeaderMode, InputFormat, OutputFormat, Table};

#[derive(Parser)]
#[command(name = "datatab")]
struct Cli {
    #[arg(help = "File holding CSV text or a data URL. Reads stdin when omitted or '-'")]
    input: Option<PathBuf>,

    #[arg(
        long = "input-format",
        short = 'i',
        default_value = "auto",
        help = "Input format: auto, csv or data-url"
    )]
    format: String,

    #[arg(
        long = "header",
        default_value = "auto",
        help = "Whether the first row is a header: auto (guess), yes or no"
    )]
    header: String,

    #[arg(
        long = "output-format",
        short = 'o',
        default_value = "json",
        help = "Output format: json, csv, or plain"
    )]
    output_format: String,

    #[arg(long = "row", short = 'r', help = "Print only the data row at this 0-based index")]
    row: Option<usize>,
}

pub fn main() {
    // Reset SIGPIPE to default so writing to a broken pipe exits cleanly
    // instead of panicking.
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "datatab=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting datatab");
    let cli = Cli::parse();

    let input_format = match cli.format.as_str() {
        "auto" => InputFormat::Auto,
        "csv" => InputFormat::Csv,
        "data-url" => InputFormat::DataUrl,
        other => {
            eprintln!("Unknown input format: {other}. Valid formats: auto, csv, data-url");
            std::process::exit(1);
        }
    };

    let header_mode = match cli.header.as_str() {
        "auto" => HeaderMode::Infer,
        "yes" | "true" => HeaderMode::Present,
        "no" | "false" => HeaderMode::Absent,
        other => {
            eprintln!("Unknown header mode: {other}. Valid modes: auto, yes, no");
            std::process::exit(1);
        }
    };

    let output_format = match cli.output_format.as_str() {
        "json" => OutputFormat::Json,
        "csv" => OutputFormat::Csv,
        "plain" => OutputFormat::Plain,
        other => {
            eprintln!("Unknown output format: {other}. Valid formats: json, csv, plain");
            std::process::exit(1);
        }
    };

    let parsed = match cli.input.as_deref() {
        Some(path) if path.as_os_str() != "-" => {
            info!("Reading {}", path.display());
            parse::parse_file(path, input_format, header_mode)
        }
        _ => parse::parse_stdin(input_format, header_mode),
    };
    let table = parsed.unwrap_or_else(|err| {
        eprintln!("Error parsing input: {err:#}");
        std::process::exit(1);
    });

    info!(
        "Parsed table: {} rows, {} columns, header: {}",
        table.rows.len(),
        table.num_columns(),
        table.headers.is_some()
    );

    let rendered = render(&table, output_format, cli.row).unwrap_or_else(|err| {
        eprintln!("Error writing output: {err:#}");
        std::process::exit(1);
    });

    let mut stdout = io::stdout().lock();
    if let Err(err) = writeln!(stdout, "{rendered}") {
        eprintln!("Error writing output: {err}");
        std::process::exit(1);
    }
}

fn render(table: &Table, format: OutputFormat, row: Option<usize>) -> anyhow::Result<String> {
    match row {
        Some(idx) => output::format_row(table, format, idx),
        None => output::format_table(table, format),
    }
}
