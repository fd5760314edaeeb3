use clap::{Parser, ValueEnum};
use docxflow_pdf::{ConvertOptions, ErrorKind, PageLayout};
use std::error::Error as _;
use std::path::PathBuf;

#[derive(Clone, Copy, ValueEnum)]
enum PageSize {
    Letter,
    A4,
}

#[derive(Parser)]
#[command(name = "docxflow-pdf", version, about = "Convert the text and tables of a DOCX file to PDF")]
struct Args {
    /// Input DOCX file
    input: PathBuf,
    /// Output PDF file (defaults to input with .pdf extension)
    output: Option<PathBuf>,
    /// Page size of the generated PDF
    #[arg(long, value_enum, default_value = "letter")]
    page_size: PageSize,
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let output = args
        .output
        .unwrap_or_else(|| docxflow_pdf::output_path(&args.input));
    let options = ConvertOptions {
        layout: match args.page_size {
            PageSize::Letter => PageLayout::letter(),
            PageSize::A4 => PageLayout::a4(),
        },
    };

    if !args.input.is_file() {
        println!("Error: file not found: {}", args.input.display());
        std::process::exit(1);
    }

    println!("Converting: {}", file_name(&args.input));
    println!("To: {}", file_name(&output));
    println!("Note: text and tables only; images and drawings are skipped.");

    match docxflow_pdf::convert_with_options(&args.input, &output, &options) {
        Ok(()) => println!("Successfully created: {}", output.display()),
        Err(e) if e.kind() == ErrorKind::FileNotFound => {
            println!("Error: {e}");
            std::process::exit(1);
        }
        Err(e) => {
            println!("Error during conversion: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            eprintln!("{e:?}");
            std::process::exit(1);
        }
    }
}
