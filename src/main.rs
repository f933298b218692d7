use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use coa_extract::config::{ExtractionConfig, APP_VERSION};
use coa_extract::pipeline::extraction::terpenes::extract_terpenes_with_limit;
use coa_extract::pipeline::extraction::{clean_ocr_text, to_json};
use coa_extract::{detect_lab_type, init_tracing, validate_ocr_quality, CoaExtractor, OcrOutput};

#[derive(Parser, Debug)]
#[command(
    name = "coa-extract",
    version = APP_VERSION,
    about = "Extract cannabinoid and terpene data from COA OCR text"
)]
struct Cli {
    /// Text file to read. Reads stdin when omitted.
    file: Option<PathBuf>,

    /// Input is an OCR provider JSON document rather than plain text.
    #[arg(long)]
    ocr_json: bool,

    /// JSON file overriding extraction settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the text quality report instead of a record.
    #[arg(long, conflicts_with_all = ["lab", "terpenes"])]
    quality: bool,

    /// Print only the detected lab type.
    #[arg(long, conflicts_with = "terpenes")]
    lab: bool,

    /// Print only the parsed terpene panel.
    #[arg(long)]
    terpenes: bool,

    /// Pretty-print JSON output.
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            ExtractionConfig::from_json(&json)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => ExtractionConfig::default(),
    };

    let input = read_input(cli.file.as_ref())?;
    let ocr = if cli.ocr_json {
        let output: OcrOutput =
            serde_json::from_str(&input).context("parsing OCR JSON input")?;
        Some(output)
    } else {
        None
    };
    let text = ocr.as_ref().map_or(input.as_str(), |o| o.extracted_text.as_str());

    let json = if cli.quality {
        to_json(&validate_ocr_quality(text), cli.pretty)?
    } else if cli.lab {
        to_json(&detect_lab_type(text), cli.pretty)?
    } else if cli.terpenes {
        let cleaned = clean_ocr_text(text);
        to_json(&extract_terpenes_with_limit(&cleaned, config.terpene_limit), cli.pretty)?
    } else {
        let extractor = CoaExtractor::new(config);
        let record = match &ocr {
            Some(output) => extractor.extract_from_ocr(output)?,
            None => extractor.extract(text),
        };
        to_json(&record, cli.pretty)?
    };

    println!("{json}");
    Ok(())
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}
