//! repdf CLI - layout-preserving PDF translation tool

mod translator;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use repdf::pipeline::BoxedTransform;
use repdf::{
    extract_file, load_manifest, save_manifest, ExtractOptions, ExtractedDocument, FontConfig,
    IdentityTransform, OverlapPolicy, PageSelection, PdfExtractor, Pipeline, PipelineOptions,
    RenderOptions, RenderReport,
};

use translator::{ChatTranslator, TranslatorConfig, DEFAULT_API_BASE, DEFAULT_MODEL};

#[derive(Parser)]
#[command(name = "repdf")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Rebuild PDFs with translated content in the original layout", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, translate and rebuild a PDF
    Rebuild {
        /// Input PDF file (or manifest with --manifest)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output PDF file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Treat the input as a JSON extraction manifest
        #[arg(long)]
        manifest: bool,

        /// Keep the source text
        #[arg(long)]
        no_translate: bool,

        #[command(flatten)]
        translate: TranslateArgs,

        #[command(flatten)]
        extract: ExtractArgs,

        #[command(flatten)]
        layout: LayoutArgs,

        /// Write the render report as JSON
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Extract primitives into a JSON manifest
    Extract {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output manifest (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Render a JSON manifest to PDF without translating
    Render {
        /// Input manifest
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output PDF file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        #[command(flatten)]
        layout: LayoutArgs,

        /// Write the render report as JSON
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Show what would be extracted from a PDF
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct TranslateArgs {
    /// Target language code
    #[arg(short, long, default_value = "hi")]
    target: String,

    /// API key of the translation backend
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Chat model
    #[arg(long, env = "REPDF_MODEL", default_value = DEFAULT_MODEL)]
    model: String,
}

#[derive(Args)]
struct ExtractArgs {
    /// Directory for extracted images
    #[arg(long, value_name = "DIR", default_value = "extracted_images")]
    images: PathBuf,

    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Skip table detection
    #[arg(long)]
    no_tables: bool,

    /// Fail on the first unreadable page
    #[arg(long)]
    strict: bool,
}

impl ExtractArgs {
    fn options(&self) -> Result<ExtractOptions, Box<dyn std::error::Error>> {
        let pages = match &self.pages {
            Some(p) => PageSelection::parse(p)?,
            None => PageSelection::All,
        };
        let options = ExtractOptions::new()
            .with_image_dir(&self.images)
            .with_tables(!self.no_tables)
            .with_pages(pages);
        Ok(if self.strict { options } else { options.lenient() })
    }
}

#[derive(Args)]
struct LayoutArgs {
    /// Primary font file
    #[arg(long, value_name = "TTF")]
    font: Option<PathBuf>,

    /// Secondary font file
    #[arg(long, value_name = "TTF")]
    fallback_font: Option<PathBuf>,

    /// Use only the built-in Helvetica font
    #[arg(long, conflicts_with_all = ["font", "fallback_font"])]
    builtin_font: bool,

    /// Drop text lines when at least this share of them lies in a table (0.0-1.0)
    #[arg(long, value_name = "RATIO")]
    min_coverage: Option<f32>,

    /// Store uncompressed content streams
    #[arg(long)]
    no_compress: bool,
}

impl LayoutArgs {
    fn fonts(&self) -> FontConfig {
        if self.builtin_font {
            return FontConfig::builtin_only();
        }
        let mut fonts = FontConfig::default();
        if let Some(path) = &self.font {
            fonts = fonts.with_primary(path);
        }
        if let Some(path) = &self.fallback_font {
            fonts = fonts.with_secondary(path);
        }
        fonts
    }

    fn overlap(&self) -> OverlapPolicy {
        match self.min_coverage {
            Some(ratio) => OverlapPolicy::MinCoverage(ratio.clamp(0.0, 1.0)),
            None => OverlapPolicy::Containment,
        }
    }

    fn render(&self, title: Option<String>) -> RenderOptions {
        let options = RenderOptions::new().with_compression(!self.no_compress);
        match title {
            Some(title) => options.with_title(title),
            None => options,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Rebuild {
            input,
            output,
            manifest,
            no_translate,
            translate,
            extract,
            layout,
            report,
        } => cmd_rebuild(
            &input,
            output.as_deref(),
            manifest,
            no_translate,
            &translate,
            &extract,
            &layout,
            report.as_deref(),
        ),
        Commands::Extract {
            input,
            output,
            extract,
        } => cmd_extract(&input, output.as_deref(), &extract),
        Commands::Render {
            input,
            output,
            layout,
            report,
        } => cmd_render(&input, &output, &layout, report.as_deref()),
        Commands::Info { input } => cmd_info(&input),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn progress(steps: u64) -> ProgressBar {
    let pb = ProgressBar::new(steps);
    let template = "{spinner:.green} [{bar:40.cyan/blue}] {msg}";
    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// `report.pdf` -> `report.hi.pdf`
fn default_output(input: &Path, target: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{}.{}.pdf", stem, target))
}

#[allow(clippy::too_many_arguments)]
fn cmd_rebuild(
    input: &Path,
    output: Option<&Path>,
    manifest: bool,
    no_translate: bool,
    translate: &TranslateArgs,
    extract: &ExtractArgs,
    layout: &LayoutArgs,
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output(input, &translate.target));

    let transform: BoxedTransform = if no_translate {
        Box::new(IdentityTransform)
    } else {
        let api_key = translate
            .api_key
            .clone()
            .ok_or("missing API key: set OPENAI_API_KEY or pass --no-translate")?;
        let config = TranslatorConfig::new(api_key)
            .with_api_base(&translate.api_base)
            .with_model(&translate.model);
        Box::new(ChatTranslator::new(config)?)
    };

    let options = PipelineOptions {
        target: translate.target.clone(),
        overlap: layout.overlap(),
        extract: extract.options()?,
        fonts: layout.fonts(),
        render: layout.render(input.file_stem().map(|s| s.to_string_lossy().into_owned())),
    };
    let pipeline = Pipeline::with_options(transform, options);

    let pb = progress(2);
    pb.set_message("Extracting...");
    let doc = if manifest {
        load_manifest(input)?
    } else {
        extract_file(input, pipeline.options().extract.clone())?
    };
    pb.inc(1);

    pb.set_message(if no_translate {
        "Rendering..."
    } else {
        "Translating and rendering..."
    });
    let report = pipeline.rebuild(doc, &output)?;
    pb.inc(1);
    pb.finish_with_message("Done!");

    print_report(&report);
    if let Some(path) = report_path {
        fs::write(path, report.to_json(true)?)?;
        println!("{} {}", "Report saved to".green(), path.display());
    }
    Ok(())
}

fn cmd_extract(
    input: &Path,
    output: Option<&Path>,
    extract: &ExtractArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = extract_file(input, extract.options()?)?;

    match output {
        Some(path) => {
            save_manifest(&doc, path)?;
            println!(
                "{} {} ({} lines, {} tables, {} images)",
                "Saved to".green(),
                path.display(),
                doc.blocks.len(),
                doc.tables.len(),
                doc.images.len()
            );
        }
        None => println!("{}", doc.to_json(true)?),
    }
    Ok(())
}

fn cmd_render(
    input: &Path,
    output: &Path,
    layout: &LayoutArgs,
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load_manifest(input)?;
    let options = PipelineOptions {
        overlap: layout.overlap(),
        fonts: layout.fonts(),
        render: layout.render(None),
        ..PipelineOptions::default()
    };
    let report = Pipeline::with_options(IdentityTransform, options).rebuild(doc, output)?;

    print_report(&report);
    if let Some(path) = report_path {
        fs::write(path, report.to_json(true)?)?;
    }
    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let extractor = PdfExtractor::open_with_options(
        input,
        ExtractOptions::new().lenient().with_images(false),
    )?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), extractor.version());
    println!("{}: {}", "Pages".bold(), extractor.page_count());
    println!(
        "{}: {}",
        "Encrypted".bold(),
        if extractor.is_encrypted() { "Yes" } else { "No" }
    );
    if let Ok(size) = extractor.page_size(1) {
        println!("{}: {} x {} pt", "Page 1".bold(), size.width, size.height);
    }

    let doc: ExtractedDocument = extractor.extract()?;
    println!();
    println!("{}", "Layout Primitives".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Text lines".bold(), doc.blocks.len());
    println!("{}: {}", "Tables".bold(), doc.tables.len());
    println!(
        "{}: {}",
        "Words".bold(),
        doc.plain_text().split_whitespace().count()
    );
    Ok(())
}

fn print_report(report: &RenderReport) {
    println!("\n{}", "Rebuild Summary".cyan().bold());
    if let Some(path) = &report.output {
        println!("  {} {}", "├─ Output:".dimmed(), path.display());
    }
    println!("  {} {} ({:?})", "├─ Font:".dimmed(), report.font, report.font_state);
    println!("  {} {}", "├─ Pages:".dimmed(), report.page_count());
    println!(
        "  {} {} drawn, {} skipped, {} table duplicates removed",
        "└─ Primitives:".dimmed(),
        report.drawn_count(),
        report.skipped_count(),
        report.suppressed_blocks
    );
    for (page, kind, reason) in report.skips() {
        println!("     {} page {} {}: {}", "skipped".yellow(), page, kind, reason);
    }
}

fn cmd_version() {
    println!("{} {}", "repdf".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Layout-preserving PDF translation tool");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/repdf".dimmed());
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output() {
        assert_eq!(
            default_output(Path::new("/docs/report.pdf"), "hi"),
            PathBuf::from("/docs/report.hi.pdf")
        );
    }

    #[test]
    fn test_cli_parses_rebuild() {
        let cli = Cli::try_parse_from([
            "repdf",
            "rebuild",
            "in.pdf",
            "--no-translate",
            "--builtin-font",
            "--pages",
            "1-3",
            "--min-coverage",
            "0.8",
        ])
        .unwrap();
        let Commands::Rebuild { extract, layout, no_translate, .. } = cli.command else {
            panic!("expected rebuild");
        };
        assert!(no_translate);
        assert_eq!(extract.options().unwrap().pages, PageSelection::Range(1..=3));
        assert_eq!(layout.overlap(), OverlapPolicy::MinCoverage(0.8));
        assert!(layout.fonts().primary.is_none());
    }

    #[test]
    fn test_font_flags_conflict() {
        let args = [
            "repdf", "render", "m.json", "-o", "o.pdf", "--builtin-font", "--font", "a.ttf",
        ];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_render_manifest_command() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("doc.json");
        fs::write(
            &manifest,
            r#"{"page_sizes": {"1": [612, 792]},
                "blocks": [{"page": 1, "bbox": [72, 72, 200, 12], "text": "Hello"}]}"#,
        )
        .unwrap();
        let output = dir.path().join("out.pdf");
        let report = dir.path().join("report.json");

        let layout = LayoutArgs {
            font: None,
            fallback_font: None,
            builtin_font: true,
            min_coverage: None,
            no_compress: false,
        };
        cmd_render(&manifest, &output, &layout, Some(&report)).unwrap();
        assert!(output.exists());

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(report).unwrap()).unwrap();
        assert_eq!(json["pages"].as_array().unwrap().len(), 1);
    }
}
