//! Content Blocker CLI
//!
//! CLI tool for compiling filter lists, checking URLs against them and
//! keeping configured lists up to date.

mod transport;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cb_compiler::{compile_filter_list, ParseOptions};
use cb_core::psl;
use cb_core::types::ResourceType;
use cb_profile::{ContentBlockingConfig, ContentBlockingInformation, ContentBlockingProfile, ProfileManager};

use crate::transport::ReqwestTransport;

#[derive(Parser)]
#[command(name = "cb-cli")]
#[command(about = "Content blocker filter list compiler and tools")]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Public suffix list (public_suffix_list.dat) for third-party detection
    #[arg(long, global = true)]
    psl: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile filter lists and print statistics
    Compile {
        /// Input filter list files
        #[arg(short, long, required = true)]
        input: Vec<String>,

        /// Drop rules with interior wildcards
        #[arg(long)]
        no_wildcards: bool,
    },

    /// Check a request URL against filter lists
    Check {
        /// Input filter list files
        #[arg(short, long, required = true)]
        input: Vec<String>,

        /// URL of the page issuing the request
        #[arg(short, long, default_value = "")]
        base: String,

        /// Request URL
        #[arg(short, long)]
        url: String,

        /// Resource type (script, image, stylesheet, subdocument, ...)
        #[arg(short = 't', long = "type", default_value = "other")]
        resource_type: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print element hiding selectors for a domain
    Cosmetic {
        /// Input filter list files
        #[arg(short, long, required = true)]
        input: Vec<String>,

        /// Page domain
        #[arg(short, long)]
        domain: String,
    },

    /// Show configured profiles
    Info {
        /// Configuration file
        #[arg(short, long)]
        config: String,
    },

    /// Download configured lists
    Update {
        /// Configuration file
        #[arg(short, long)]
        config: String,

        /// Update every list, not only stale ones
        #[arg(long)]
        all: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(path) = &cli.psl {
        if let Err(e) = psl::load_psl_from_file(path) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }

    let result = match cli.command {
        Commands::Compile { input, no_wildcards } => cmd_compile(&input, !no_wildcards, cli.verbose),
        Commands::Check {
            input,
            base,
            url,
            resource_type,
            json,
        } => cmd_check(&input, &base, &url, &resource_type, json),
        Commands::Cosmetic { input, domain } => cmd_cosmetic(&input, &domain),
        Commands::Info { config } => cmd_info(&config),
        Commands::Update { config, all } => cmd_update(&config, all),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_compile(inputs: &[String], enable_wildcards: bool, verbose: bool) -> Result<(), String> {
    if inputs.is_empty() {
        return Err("No input files specified".to_string());
    }

    let options = ParseOptions { enable_wildcards };
    let start = Instant::now();
    let mut combined = String::new();

    for (list_id, path) in inputs.iter().enumerate() {
        let content = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;

        if verbose {
            let compiled = compile_filter_list(&content, &options);
            println!(
                "  [{}] {} ({}) - {} lines, {} rules, {} selectors",
                list_id,
                Path::new(path).file_name().unwrap_or_default().to_string_lossy(),
                compiled.header.title.as_deref().unwrap_or("untitled"),
                compiled.stats.parse.lines,
                compiled.stats.rules,
                compiled.stats.selectors
            );
        }

        combined.push_str(&content);
        combined.push('\n');
    }

    let compiled = compile_filter_list(&combined, &options);
    let stats = compiled.stats;
    let total_time = start.elapsed();

    println!("Compiled {} filter lists", inputs.len());
    println!("  Lines:      {}", stats.parse.lines);
    println!("  Comments:   {}", stats.parse.comments);
    println!("  Dropped:    {}", stats.parse.dropped);
    println!(
        "  Rules:      {} -> {} (dedupe removed {}, {} exceptions)",
        stats.optimize.before, stats.optimize.after, stats.optimize.deduped, stats.exceptions
    );
    println!(
        "  Selectors:  {} (dedupe removed {})",
        stats.selectors, stats.optimize.cosmetic_deduped
    );
    println!("  Trie nodes: {}", stats.trie_nodes);
    println!("  Time:       {:.1}ms", total_time.as_secs_f64() * 1000.0);

    Ok(())
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    base: &'a str,
    url: &'a str,
    resource_type: &'a str,
    result: &'static str,
    profile: Option<String>,
    filter: Option<String>,
}

fn cmd_check(inputs: &[String], base: &str, url: &str, resource_type: &str, json: bool) -> Result<(), String> {
    let manager = load_lists(inputs)?;
    let (result, decided_by) = manager.explain_url(base, url, ResourceType::from_str(resource_type));
    let (profile, filter) = decided_by.unzip();

    let report = CheckReport {
        base,
        url,
        resource_type,
        result: result.as_str(),
        profile,
        filter,
    };

    if json {
        let output = serde_json::to_string_pretty(&report).map_err(|e| format!("Failed to encode report: {}", e))?;
        println!("{output}");
        return Ok(());
    }

    println!("{}: {}", report.result, report.url);
    if let (Some(profile), Some(filter)) = (&report.profile, &report.filter) {
        println!("  Rule:    {} ({})", filter, profile);
    }

    Ok(())
}

fn cmd_cosmetic(inputs: &[String], domain: &str) -> Result<(), String> {
    let manager = load_lists(inputs)?;

    for profile in manager.profiles() {
        println!("{}:", profile.name());
        println!("  Global:     {}", profile.style_sheet().len());
        println!("  Blacklist:  {}", profile.style_sheet_black_list(domain).join(", "));
        println!("  Whitelist:  {}", profile.style_sheet_white_list(domain).join(", "));
    }

    println!();
    for selector in manager.hidden_selectors(domain) {
        println!("{selector}");
    }

    Ok(())
}

fn cmd_info(config_path: &str) -> Result<(), String> {
    let config = load_config(config_path)?;
    let manager = ProfileManager::from_config(&config);

    // Only the headers are needed here
    for (name, err) in manager.load_all(true) {
        eprintln!("Warning: profile '{}': {}", name, err);
    }

    let now = SystemTime::now();
    println!("Config: {}", config_path);
    println!("  Wildcards:  {}", config.enable_wildcards);
    println!("  Profiles:   {}", manager.len());

    for profile in manager.profiles() {
        let information = profile.information();
        let header = profile.header();
        println!();
        println!("{}", information.name);
        println!("  Title:      {}", information.title);
        println!("  Path:       {}", information.path.display());
        println!("  Update URL: {}", information.update_url.as_deref().unwrap_or("-"));
        println!("  Version:    {}", header.version.as_deref().unwrap_or("-"));
        println!("  Expires:    {}h", header.expires_or_default().as_secs() / 3600);
        println!("  State:      {:?}", profile.state());
        println!("  Stale:      {}", profile.is_stale(now));
    }

    Ok(())
}

fn cmd_update(config_path: &str, all: bool) -> Result<(), String> {
    let config = load_config(config_path)?;
    let manager = ProfileManager::from_config(&config);
    manager.load_all(true);

    let transport = ReqwestTransport::new().map_err(|e| format!("Failed to create HTTP client: {}", e))?;
    let runtime = tokio::runtime::Runtime::new().map_err(|e| format!("Failed to start runtime: {}", e))?;

    let failures = runtime.block_on(async {
        let handles = if all {
            manager.update_all(&transport)
        } else {
            manager.update_stale(&transport, SystemTime::now())
        };

        if handles.is_empty() {
            println!("All lists are up to date");
        }

        let mut failures = 0usize;
        for (name, handle) in handles {
            match handle.wait().await {
                Ok(()) => println!("Updated {}", name),
                Err(e) => {
                    eprintln!("Failed to update {}: {}", name, e);
                    failures += 1;
                }
            }
        }
        failures
    });

    if failures > 0 {
        return Err(format!("{} list(s) failed to update", failures));
    }

    Ok(())
}

/// Load a config file and install its public suffix list.
///
/// A list given with `--psl` takes precedence.
fn load_config(config_path: &str) -> Result<ContentBlockingConfig, String> {
    let config = ContentBlockingConfig::load(config_path).map_err(|e| e.to_string())?;
    if !psl::is_psl_initialized() {
        config.install_psl().map_err(|e| e.to_string())?;
    }
    Ok(config)
}

/// One profile per list file, named after the file.
fn load_lists(inputs: &[String]) -> Result<ProfileManager, String> {
    if inputs.is_empty() {
        return Err("No input files specified".to_string());
    }

    let mut manager = ProfileManager::new();
    for path in inputs {
        let information = ContentBlockingInformation::new(path.as_str(), path.as_str());
        manager.insert(Arc::new(ContentBlockingProfile::new(information)));
    }

    if let Some((name, err)) = manager.load_all(false).into_iter().next() {
        return Err(format!("Failed to load '{}': {}", name, err));
    }

    Ok(manager)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check_command() {
        let cli = Cli::parse_from([
            "cb-cli", "check", "-i", "list.txt", "--base", "https://site.org", "--url", "https://ads.com/x.js",
            "--type", "script", "--json",
        ]);
        match cli.command {
            Commands::Check {
                input,
                resource_type,
                json,
                ..
            } => {
                assert_eq!(input, vec!["list.txt"]);
                assert_eq!(resource_type, "script");
                assert!(json);
            }
            _ => panic!("expected check command"),
        }
    }

    #[test]
    fn test_parse_global_psl_option() {
        let cli = Cli::parse_from(["cb-cli", "cosmetic", "-i", "list.txt", "-d", "a.com", "--psl", "psl.dat"]);
        assert_eq!(cli.psl.as_deref(), Some("psl.dat"));
        assert!(matches!(cli.command, Commands::Cosmetic { .. }));
    }

    #[test]
    fn test_load_config_reports_missing_psl() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "psl_path = \"/nonexistent/public_suffix_list.dat\"\n").unwrap();

        let err = load_config(&path.to_string_lossy()).unwrap_err();
        assert!(err.contains("public suffix list"), "unexpected error: {err}");
    }

    #[test]
    fn test_load_lists_reports_missing_file() {
        let err = load_lists(&["/nonexistent/list.txt".to_string()]).unwrap_err();
        assert!(err.starts_with("Failed to load '/nonexistent/list.txt'"));
    }

    #[test]
    fn test_check_against_list_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("list.txt");
        fs::write(&path, "||ads.com^$script\n").unwrap();
        let inputs = vec![path.to_string_lossy().into_owned()];

        let manager = load_lists(&inputs).unwrap();
        let (result, decided_by) = manager.explain_url("https://site.org", "https://ads.com/x.js", ResourceType::Script);
        assert!(result.is_blocked());
        assert_eq!(decided_by.map(|(_, filter)| filter).as_deref(), Some("||ads.com^$script"));
        assert!(cmd_check(&inputs, "https://site.org", "https://ads.com/x.js", "script", true).is_ok());
    }
}
