use clap::builder::PossibleValue;
use clap::Parser;

const HELP_TEXT: &str = "Suggestions and bug reports are greatly appreciated:
https://github.com/proxy-catalog/proxy-catalog/issues";

#[derive(Parser, Debug, Clone)]
#[command(after_help = HELP_TEXT)]
pub struct Cli {
    /// Host the REST API binds to; overrides API_HOST
    #[arg(long)]
    pub host: Option<String>,

    /// Port the REST API binds to; overrides API_PORT
    #[arg(long)]
    pub port: Option<u16>,

    /// Path to an env file to load instead of the default `.env`
    #[arg(long)]
    pub env_file: Option<std::path::PathBuf>,

    /// Logging level
    #[arg(long = "log", default_value = "info",
        value_parser([
            PossibleValue::new("debug"),
            PossibleValue::new("info"),
            PossibleValue::new("warn"),
            PossibleValue::new("error")
        ])
    )]
    pub log_level: String,

    /// Start with the background scheduler disabled, regardless of PROXY_SCHEDULER_ENABLED
    #[arg(long)]
    pub no_scheduler: bool,
}
