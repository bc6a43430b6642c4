//! WHOIS Check CLI Application
//!
//! Command-line front end over whois-check-lib: raw WHOIS text, availability
//! verdicts, domain age and JSON reports for one or more domains.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use std::path::Path;
use std::process;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use whois_check_lib::{
    load_env_config, parse_timeout, ConfigManager, DefaultsConfig, EnvConfig, ErrorKind,
    FileConfig, LookupConfig, LookupReport, ServerDirectory, StaticDirectory, WhoisError,
    WhoisLookup,
};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for whois-check
#[derive(Parser, Debug)]
#[command(name = "whois-check")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query WHOIS servers for domain information, availability and age")]
#[command(
    long_about = "Query WHOIS servers for domain information, availability and age.\n\nServers are picked per TLD from a bundled table that can be extended with --servers or a config file. Referrals are followed for .com and .net."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domain names to look up (e.g. example.com, www.example.co.uk)
    #[arg(value_name = "DOMAINS", help_heading = "Domain Selection")]
    pub domains: Vec<String>,

    /// Input file with domains (one per line, # starts a comment)
    #[arg(
        short = 'f',
        long = "file",
        value_name = "FILE",
        help_heading = "Domain Selection"
    )]
    pub file: Option<String>,

    /// Print WHOIS text escaped for HTML with <br /> line breaks
    #[arg(long = "html", help_heading = "Output Format")]
    pub html: bool,

    /// Print AVAILABLE or TAKEN per domain
    #[arg(short = 'a', long = "available", help_heading = "Output Format")]
    pub available: bool,

    /// Print the creation date and age per domain
    #[arg(long = "age", help_heading = "Output Format")]
    pub age: bool,

    /// Output a JSON report per domain
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// List routed TLDs with their servers and exit
    #[arg(long = "list-tlds", help_heading = "Servers")]
    pub list_tlds: bool,

    /// JSON server table to merge over the bundled one
    #[arg(long = "servers", value_name = "FILE", help_heading = "Servers")]
    pub servers: Option<String>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Timeout for every network phase (e.g. 5s, 30s, 2m)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Configuration")]
    pub timeout: Option<String>,

    /// WHOIS TCP port
    #[arg(long = "port", value_name = "PORT", help_heading = "Configuration")]
    pub port: Option<u16>,

    /// Accept invalid TLS certificates from HTTP registries
    #[arg(long = "insecure", help_heading = "Configuration")]
    pub insecure: bool,

    /// Show detailed progress (debug logging)
    #[arg(short = 'v', long = "verbose", help_heading = "Debugging")]
    pub verbose: bool,

    /// Show protocol-level details (trace logging)
    #[arg(short = 'd', long = "debug", help_heading = "Debugging")]
    pub debug: bool,
}

/// Everything a run needs after config layering.
struct Settings {
    lookup: LookupConfig,
    directory: Arc<StaticDirectory>,
    json: bool,
    html: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_tracing(&args);

    match run(args).await {
        Ok(0) => {}
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn validate_args(args: &Args) -> Result<(), String> {
    // --list-tlds is self-contained
    if args.list_tlds {
        return Ok(());
    }

    if args.domains.is_empty() && args.file.is_none() {
        return Err("You must specify domain names or a file with --file".to_string());
    }

    if args.json && args.html {
        return Err("Cannot specify both --json and --html".to_string());
    }

    if args.html && (args.available || args.age) {
        return Err("--html only applies to raw WHOIS output".to_string());
    }

    if let Some(timeout) = &args.timeout {
        if parse_timeout(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use format like '5s', '30s', '2m'",
                timeout
            ));
        }
    }

    if args.port == Some(0) {
        return Err("Port must be between 1 and 65535".to_string());
    }

    Ok(())
}

fn init_tracing(args: &Args) {
    let filter = if args.debug {
        EnvFilter::new("warn,whois_check=trace,whois_check_lib=trace")
    } else if args.verbose {
        EnvFilter::new("warn,whois_check=debug,whois_check_lib=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(args.debug),
        )
        .with(filter)
        .init();
}

/// Run the lookups and return the process exit code.
async fn run(args: Args) -> Result<i32, Box<dyn std::error::Error>> {
    let settings = build_settings(&args)?;

    if args.list_tlds {
        print_tlds(&settings.directory);
        return Ok(0);
    }

    let mut domains = args.domains.clone();
    if let Some(file) = &args.file {
        domains.extend(read_domains_from_file(file)?);
    }

    info!(count = domains.len(), "Starting lookups");

    let width = ui::domain_column_width(&domains);
    let mut reports = Vec::with_capacity(domains.len());
    let mut syntax_failures = 0;

    for (index, domain) in domains.iter().enumerate() {
        let mut lookup = match WhoisLookup::with_config(
            domain,
            settings.directory.clone(),
            settings.lookup.clone(),
        ) {
            Ok(lookup) => lookup,
            Err(e) => {
                if e.kind() == ErrorKind::InvalidDomainSyntax {
                    syntax_failures += 1;
                }
                if settings.json {
                    let mut report = LookupReport::new(domain.as_str());
                    report.errors.push(e.user_message());
                    reports.push(report);
                } else {
                    println!("{}", e.user_message());
                }
                continue;
            }
        };

        if settings.json {
            reports.push(build_report(&mut lookup).await);
            continue;
        }

        if args.available || args.age {
            if args.available {
                let result = lookup.is_available().await;
                ui::print_availability(lookup.domain(), &result, width);
            }
            if args.age {
                let result = lookup.check_age().await;
                ui::print_age(lookup.domain(), &result, width);
            }
            continue;
        }

        if domains.len() > 1 {
            if index > 0 {
                println!();
            }
            ui::print_domain_header(lookup.domain());
        }

        if settings.html {
            match lookup.html_info().await {
                Ok(html) => println!("{}", html),
                Err(e) => println!("{}", e.user_message()),
            }
        } else {
            println!("{}", lookup.info_text().await);
        }
    }

    if settings.json {
        display_json_results(&reports)?;
    }

    Ok(if syntax_failures > 0 { 1 } else { 0 })
}

/// One fetch per domain; availability and age are derived from the same text.
async fn build_report(lookup: &mut WhoisLookup) -> LookupReport {
    let mut report = LookupReport::new(lookup.domain());
    report.subdomain = Some(lookup.subdomain().to_string());
    report.tld = Some(lookup.tld_chain().to_string());

    match lookup.info().await {
        Ok(text) => {
            report.available = Some(lookup.availability_of(&text));
            match lookup.age_of(&text) {
                Ok(age) => report.age = Some(age),
                Err(e) => report.errors.push(e.user_message()),
            }
            report.text = Some(text);
        }
        Err(e) => report.errors.push(e.user_message()),
    }

    report
}

/// Layer configuration: defaults < config file < WC_* environment < CLI flags.
fn build_settings(args: &Args) -> Result<Settings, Box<dyn std::error::Error>> {
    let config_manager = ConfigManager::new(args.verbose);
    let env_config = load_env_config();

    let file_config = if let Some(path) = &args.config {
        debug!(path = %path, "Using explicit config file (--config)");
        config_manager
            .load_file(path)
            .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?
    } else if let Some(path) = &env_config.config {
        debug!(path = %path, "Using explicit config file (WC_CONFIG)");
        config_manager
            .load_file(path)
            .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?
    } else {
        config_manager.discover_and_load()?
    };

    let file_defaults = file_config.defaults.clone().unwrap_or_default();
    let env_defaults = env_config.to_defaults();

    let mut lookup = env_defaults.apply_to(file_defaults.apply_to(LookupConfig::default()));
    lookup = apply_cli_args(lookup, args);

    let directory = build_directory(args, &file_config, &file_defaults, &env_defaults)?;
    let (json, html) = output_modes(args, &file_config, &env_config);

    debug!(
        connect_timeout = ?lookup.connect_timeout,
        read_timeout = ?lookup.read_timeout,
        http_timeout = ?lookup.http_timeout,
        port = lookup.whois_port,
        tlds = directory.len(),
        "Resolved settings"
    );

    Ok(Settings {
        lookup,
        directory: Arc::new(directory),
        json,
        html,
    })
}

fn apply_cli_args(mut config: LookupConfig, args: &Args) -> LookupConfig {
    if let Some(timeout) = args.timeout.as_deref().and_then(parse_timeout) {
        config = config.with_timeout(timeout);
    }
    if let Some(port) = args.port {
        config = config.with_whois_port(port);
    }
    if args.insecure {
        config = config.with_accept_invalid_certs(true);
    }
    config
}

/// Bundled table, then the config file's `[servers]`, then a servers file.
fn build_directory(
    args: &Args,
    file_config: &FileConfig,
    file_defaults: &DefaultsConfig,
    env_defaults: &DefaultsConfig,
) -> Result<StaticDirectory, WhoisError> {
    let mut directory = StaticDirectory::bundled();
    directory.extend(file_config.server_overrides()?);

    let servers_file = args
        .servers
        .as_ref()
        .or(env_defaults.servers_file.as_ref())
        .or(file_defaults.servers_file.as_ref());

    if let Some(path) = servers_file {
        debug!(path = %path, "Loading server table");
        directory.extend(StaticDirectory::from_json_file(path)?);
    }

    Ok(directory)
}

fn output_modes(args: &Args, file_config: &FileConfig, env_config: &EnvConfig) -> (bool, bool) {
    let output = file_config.output.clone().unwrap_or_default();

    // Only an explicit mode flag on the command line overrides stored defaults
    if args.json || args.html || args.available || args.age {
        return (args.json, args.html);
    }

    let json = env_config.json.or(output.json).unwrap_or(false);
    let html = !json && output.html.unwrap_or(false);
    (json, html)
}

fn print_tlds(directory: &StaticDirectory) {
    let routes: Vec<_> = directory
        .tlds()
        .into_iter()
        .filter_map(|tld| directory.route(&tld).cloned().map(|route| (tld, route)))
        .collect();

    ui::print_routes(&routes);
}

fn read_domains_from_file(file_path: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {}", file_path).into());
    }

    let content = std::fs::read_to_string(path)?;
    let domains = parse_domain_lines(&content);

    if domains.is_empty() {
        return Err("No valid domains found in the file.".into());
    }

    Ok(domains)
}

/// Skip blank lines and `#` comments, including trailing ones.
fn parse_domain_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn display_json_results(reports: &[LookupReport]) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(reports)?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("whois-check").chain(argv.iter().copied()))
    }

    #[test]
    fn test_validate_args() {
        assert!(validate_args(&args(&["example.com"])).is_ok());
        assert!(validate_args(&args(&["--list-tlds"])).is_ok());
        assert!(validate_args(&args(&["--file", "domains.txt"])).is_ok());

        assert!(validate_args(&args(&[])).is_err());
        assert!(validate_args(&args(&["example.com", "--json", "--html"])).is_err());
        assert!(validate_args(&args(&["example.com", "--html", "--age"])).is_err());
        assert!(validate_args(&args(&["example.com", "--timeout", "soon"])).is_err());
        assert!(validate_args(&args(&["example.com", "--port", "0"])).is_err());
    }

    #[test]
    fn test_apply_cli_args() {
        let config = apply_cli_args(
            LookupConfig::default(),
            &args(&["example.com", "--timeout", "7s", "--port", "4343", "--insecure"]),
        );

        assert_eq!(config.connect_timeout.as_secs(), 7);
        assert_eq!(config.read_timeout.as_secs(), 7);
        assert_eq!(config.http_timeout.as_secs(), 7);
        assert_eq!(config.whois_port, 4343);
        assert!(config.accept_invalid_certs);

        let untouched = apply_cli_args(LookupConfig::default(), &args(&["example.com"]));
        let defaults = LookupConfig::default();
        assert_eq!(untouched.read_timeout, defaults.read_timeout);
        assert_eq!(untouched.whois_port, defaults.whois_port);
        assert!(!untouched.accept_invalid_certs);
    }

    #[test]
    fn test_parse_domain_lines() {
        let content = "# header\nexample.com\n\n  example.org  # trailing\n#only comment\nwww.example.co.uk\n";
        assert_eq!(
            parse_domain_lines(content),
            vec!["example.com", "example.org", "www.example.co.uk"]
        );
    }

    #[test]
    fn test_output_modes() {
        let env = EnvConfig::default();
        let mut file = FileConfig::default();
        file.output = Some(whois_check_lib::OutputConfig {
            json: Some(true),
            html: None,
        });

        assert_eq!(output_modes(&args(&["a.com"]), &file, &env), (true, false));
        assert_eq!(output_modes(&args(&["a.com", "--available"]), &file, &env), (false, false));
        assert_eq!(output_modes(&args(&["a.com", "--html"]), &file, &env), (false, true));

        let env = EnvConfig {
            json: Some(false),
            ..EnvConfig::default()
        };
        assert_eq!(output_modes(&args(&["a.com"]), &file, &env), (false, false));
    }
}
