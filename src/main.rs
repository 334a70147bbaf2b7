//! annex CLI - search and download books and papers from the catalog.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use annex::catalog::{Book, Catalog, DEFAULT_CONTENT_FILTER};
use annex::config::Config;
use annex::console::Console;

/// Search and download books and papers from a shadow-library catalog.
#[derive(Parser, Debug)]
#[command(name = "annex")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Print records as JSON instead of formatted text.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the catalog for books.
    Search {
        /// Term to search for.
        term: String,

        /// Content type filter: book_any for books, journal for papers.
        #[arg(long, default_value = DEFAULT_CONTENT_FILTER)]
        content: String,
    },

    /// Download a book by content hash.
    Download {
        /// Content hash of the book, from a prior search result.
        hash: String,

        /// Book title, used for the filename.
        #[arg(long)]
        title: String,

        /// Book format, for example pdf or epub.
        #[arg(long)]
        format: String,
    },

    /// Look up a paper by DOI.
    Lookup {
        /// DOI of the paper, e.g. 10.1038/nature12345.
        doi: String,
    },

    /// Look up a paper by DOI and download it.
    FetchPaper {
        /// DOI of the paper to download.
        doi: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let console = Console::new();

    let config = Config::from_env().context("failed to load configuration")?;
    let catalog = Catalog::new(&config).context("failed to create catalog client")?;

    match args.command {
        Command::Search { term, content } => {
            console.step(&format!("Searching for: {term}"));
            let books = catalog.search(&term, &content).await?;

            if books.is_empty() {
                console.warning("No results found");
                return Ok(());
            }

            console.success(&format!("Found {} result(s)", books.len()));
            if args.json {
                println!("{}", serde_json::to_string_pretty(&books)?);
            } else {
                for book in &books {
                    console.section(&book.title);
                    print_book(&console, book);
                }
            }
        }

        Command::Download {
            hash,
            title,
            format,
        } => {
            let book = Book {
                language: None,
                format: Some(format),
                size: None,
                title,
                publisher: None,
                authors: None,
                url: String::new(),
                hash,
            };

            console.step(&format!("Downloading: {}", book.title));
            let path = catalog
                .download_book(&book, &config.secret_key, config.download_dir())
                .await?;
            console.success(&format!("Saved to {}", path.display()));
        }

        Command::Lookup { doi } => {
            console.step(&format!("Looking up DOI: {doi}"));
            let paper = catalog.lookup_doi(&doi).await?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&paper)?);
            } else {
                console.section(paper.title.as_deref().unwrap_or(&paper.doi));
                print_paper(&console, &paper);
            }
        }

        Command::FetchPaper { doi } => {
            console.step(&format!("Looking up DOI: {doi}"));
            let paper = catalog.lookup_doi(&doi).await?;
            console.success(&format!(
                "Resolved: {}",
                paper.title.as_deref().unwrap_or(&paper.doi)
            ));

            console.step("Downloading paper...");
            let path = catalog
                .download_paper(&paper, config.download_dir())
                .await?;
            console.success(&format!("Saved to {}", path.display()));
        }
    }

    Ok(())
}

fn print_book(console: &Console, book: &Book) {
    console.field("authors:", book.authors.as_deref().unwrap_or("-"));
    console.field("publisher:", book.publisher.as_deref().unwrap_or("-"));
    console.field("language:", book.language.as_deref().unwrap_or("-"));
    console.field("format:", book.format.as_deref().unwrap_or("-"));
    console.field("size:", book.size.as_deref().unwrap_or("-"));
    console.field("hash:", &book.hash);
    console.field("url:", &book.url);
}

fn print_paper(console: &Console, paper: &annex::Paper) {
    console.field("doi:", &paper.doi);
    console.field("authors:", paper.authors.as_deref().unwrap_or("-"));
    console.field("journal:", paper.journal.as_deref().unwrap_or("-"));
    console.field("size:", paper.size.as_deref().unwrap_or("-"));
    console.field("hash:", paper.hash.as_deref().unwrap_or("-"));
    console.field("page:", &paper.page_url);
}
