//! Command-line facade over the parser core.
//!
//! Usage:
//!   pdfax extract-text <pdf>
//!   pdfax page-count <pdf>
//!   pdfax extract-content <pdf> <page> <out>
//!
//! Exit codes: 0 success, 1 invalid arguments, 2 parse/decode failure,
//! 3 I/O failure.

use pdfax::{Document, Error};
use std::process::ExitCode;

const EXIT_USAGE: u8 = 1;
const EXIT_PARSE: u8 = 2;
const EXIT_IO: u8 = 3;

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Usage(msg)) => {
            eprintln!("{}", msg);
            eprintln!();
            eprintln!("usage: pdfax extract-text <pdf>");
            eprintln!("       pdfax page-count <pdf>");
            eprintln!("       pdfax extract-content <pdf> <page> <out>");
            ExitCode::from(EXIT_USAGE)
        },
        Err(CliError::Lib(Error::Io(e))) => {
            eprintln!("I/O error: {}", e);
            ExitCode::from(EXIT_IO)
        },
        Err(CliError::Lib(e)) => {
            eprintln!("error: {}", e);
            ExitCode::from(EXIT_PARSE)
        },
    }
}

enum CliError {
    Usage(String),
    Lib(Error),
}

impl From<Error> for CliError {
    fn from(e: Error) -> Self {
        CliError::Lib(e)
    }
}

fn run(args: &[String]) -> Result<(), CliError> {
    let command = args
        .first()
        .ok_or_else(|| CliError::Usage("missing command".to_string()))?;

    match command.as_str() {
        "extract-text" => {
            let path = expect_arg(args, 1, "<pdf>")?;
            let doc = Document::open(path)?;
            for page in doc.pages()? {
                println!("{}", page.extract_text()?);
            }
            Ok(())
        },
        "page-count" => {
            let path = expect_arg(args, 1, "<pdf>")?;
            let doc = Document::open(path)?;
            println!("{}", doc.page_count()?);
            Ok(())
        },
        "extract-content" => {
            let path = expect_arg(args, 1, "<pdf>")?;
            let number: usize = expect_arg(args, 2, "<page>")?
                .parse()
                .map_err(|_| CliError::Usage("page must be a positive integer".to_string()))?;
            let out = expect_arg(args, 3, "<out>")?;

            let doc = Document::open(path)?;
            let page = doc
                .get_page(number)
                .ok_or_else(|| CliError::Usage(format!("no page {}", number)))?;
            let bytes = page.contents_stream_bytes()?;
            std::fs::write(out, bytes).map_err(|e| CliError::Lib(Error::Io(e)))?;
            Ok(())
        },
        other => Err(CliError::Usage(format!("unknown command: {}", other))),
    }
}

fn expect_arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str, CliError> {
    args.get(index)
        .map(|s| s.as_str())
        .ok_or_else(|| CliError::Usage(format!("missing argument {}", name)))
}
