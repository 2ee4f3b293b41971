use clap::{Parser, Subcommand};
use gallery_curator::report::{ReportFormat, ReportMode, build_report};
use gallery_curator::selection::Selection;
use gallery_curator::types::{DateFilter, load_gallery};
use gallery_curator::{config, output, render};
use std::path::{Path, PathBuf};

/// Shared flags for commands that read a gallery tree.
#[derive(clap::Args, Clone)]
struct TreeArgs {
    /// Gallery data file (the server's gallery_data.json)
    tree: PathBuf,

    /// Only show images taken on this date (YYYY-MM-DD), or "all"
    #[arg(long, default_value = "all")]
    date: DateFilter,
}

#[derive(Parser)]
#[command(name = "gallery-curator")]
#[command(about = "Review, filter, and report on photo gallery trees")]
#[command(long_about = "\
Review, filter, and report on photo gallery trees

Works on the gallery_data.json a curator server keeps per gallery: a tree
of folders, each holding images with a modification date and a review
status (good, bad, or neutral).

  {\"name\": \"root\", \"children\": [
    {\"name\": \"2024-01-01\", \"full_path\": \"2024-01-01\", \"comment\": \"\",
     \"images\": [{\"filename\": \"beach_3f2c.jpg\", \"full_path\": \"beach_3f2c.jpg\",
                 \"modification_date\": \"2024-01-01\", \"status\": \"good\"}],
     \"children\": []}]}

Only folders that directly hold images matching the date filter get a
heading; empty folders are skipped but their subfolders still nest
correctly in the table of contents.

Run 'gallery-curator gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml
    #[arg(long, default_value = ".", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a standalone HTML review page
    Render {
        #[command(flatten)]
        tree: TreeArgs,
        /// Gallery name used in image URLs
        #[arg(long, default_value = "gallery")]
        gallery: String,
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the table of contents
    Toc {
        #[command(flatten)]
        tree: TreeArgs,
        /// List the images under each heading
        #[arg(long)]
        images: bool,
    },
    /// List the dates images were taken on
    Dates {
        /// Gallery data file
        tree: PathBuf,
    },
    /// Export an HTML or Markdown report
    Report {
        #[command(flatten)]
        tree: TreeArgs,
        /// html or markdown
        #[arg(long)]
        format: ReportFormat,
        /// good_only or good_and_neutral (config default when omitted)
        #[arg(long)]
        mode: Option<ReportMode>,
        /// Gallery name used in image URLs
        #[arg(long, default_value = "gallery")]
        gallery: String,
        /// Prefix for image links in Markdown (config default when omitted)
        #[arg(long)]
        base_url: Option<String>,
        /// Output file (report.html or report.md when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Summarize a gallery tree and flag problems
    Check {
        /// Gallery data file
        tree: PathBuf,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Render { tree, gallery, out } => {
            let config = config::load_config(&cli.config)?;
            let gallery_tree = load_gallery(&tree.tree)?;
            let rendered = render::render(&gallery_tree, &tree.date);
            let ctx = config.server.render_context(&gallery);
            let page = render::render_page(&rendered, &ctx, &Selection::default(), &gallery);
            write_or_print(out.as_deref(), &page.into_string())?;
        }
        Command::Toc { tree, images } => {
            let gallery_tree = load_gallery(&tree.tree)?;
            let rendered = render::render(&gallery_tree, &tree.date);
            output::print_outline(&rendered, images);
        }
        Command::Dates { tree } => {
            let gallery_tree = load_gallery(&tree)?;
            output::print_dates(&gallery_tree);
        }
        Command::Report {
            tree,
            format,
            mode,
            gallery,
            base_url,
            out,
        } => {
            let config = config::load_config(&cli.config)?;
            let gallery_tree = load_gallery(&tree.tree)?;
            let ctx = config.server.render_context(&gallery);
            let mode = mode.unwrap_or(config.report.default_mode);
            let base_url = base_url.unwrap_or_else(|| config.server.base_url.clone());
            match build_report(&gallery_tree, &tree.date, mode, format, &ctx, &base_url) {
                Some(report) => {
                    let out = out.unwrap_or_else(|| PathBuf::from(&report.filename));
                    std::fs::write(&out, &report.content)?;
                    println!("==> Report written to {}", out.display());
                }
                None => println!("No data to export for the selected date."),
            }
        }
        Command::Check { tree } => {
            let gallery_tree = load_gallery(&tree)?;
            let rendered = render::render(&gallery_tree, &DateFilter::All);
            output::print_check(&gallery_tree, &rendered);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn write_or_print(out: Option<&Path>, content: &str) -> std::io::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, content)?;
            log::info!("Wrote {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}
