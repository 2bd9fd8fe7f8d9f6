use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scripture-pages")]
#[command(about = "Convert a scripture reference into printed page numbers", long_about = None)]
pub struct Cli {
    #[arg(
        required_unless_present_any = ["list_books", "print_schema"],
        help = "Reference to convert, e.g. \"John 3:16\" or \"Matthew 5:1-7:10\""
    )]
    pub reference: Option<String>,

    #[arg(short, long, help = "Page dataset (CSV with page,ref[,spill] or a JSON array); estimates pages when omitted")]
    pub map: Option<PathBuf>,

    #[arg(long, help = "Print the result as JSON")]
    pub json: bool,

    #[arg(long, help = "Log directory for session logs and reports")]
    pub log_dir: Option<PathBuf>,

    #[arg(long, help = "Echo informational log entries to stderr")]
    pub verbose: bool,

    #[arg(long, default_value_t = 1.5, help = "Estimator: pages per chapter")]
    pub pages_per_chapter: f64,

    #[arg(long, default_value_t = 25, help = "Estimator: verses per page")]
    pub verses_per_page: u32,

    #[arg(long, help = "List every book with its chapter count and abbreviations")]
    pub list_books: bool,

    #[arg(long, help = "Print the JSON Schema of the --json output")]
    pub print_schema: bool,
}

impl Cli {
    pub fn parse() -> Self {
        Parser::parse()
    }
}
