use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;
use webscout_core::report::{finding_line, generate_text_report, tally, write_json_report};
use webscout_core::{Finding, ScanOptions, ScanOutcome, ScanRules, execute_scan};
use webscout_scanner::CancelFlag;

/// Parse a `Name: value` header argument.
pub fn parse_header_line(line: &str) -> Result<(String, String), String> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| format!("Header '{}' must look like 'Name: value'", line))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Header '{}' has no name", line));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Parse a `name=value` cookie argument.
pub fn parse_cookie_line(line: &str) -> Result<(String, String), String> {
    let (name, value) = line
        .split_once('=')
        .ok_or_else(|| format!("Cookie '{}' must look like 'name=value'", line))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Cookie '{}' has no name", line));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Expand `~` and environment variables in a user-supplied path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(
        shellexpand::full(path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| path.to_string()),
    )
}

fn seconds(value: f64, flag: &str) -> Result<Duration> {
    match Duration::try_from_secs_f64(value) {
        Ok(duration) => Ok(duration),
        Err(_) => bail!("--{} must be a non-negative number of seconds, got {}", flag, value),
    }
}

/// Translate parsed arguments into scan options. The report path and the
/// quiet flag stay with the caller.
pub fn build_scan_options(args: &ArgMatches) -> Result<ScanOptions> {
    let url = args.get_one::<Url>("url").context("--url is required")?;

    let rules = match args.get_one::<String>("rules") {
        Some(path) => ScanRules::load(&expand_path(path))?,
        None => ScanRules::default(),
    };

    let mut options = ScanOptions::new(url.as_str())
        .with_max_depth(*args.get_one::<usize>("crawl-depth").unwrap_or(&2))
        .with_delay(seconds(*args.get_one::<f64>("delay").unwrap_or(&1.0), "delay")?)
        .with_workers(*args.get_one::<usize>("workers").unwrap_or(&1))
        .with_rules(rules)
        .with_test_forms(args.get_flag("test-forms"));

    options.timeout = Duration::from_secs(*args.get_one::<u64>("timeout").unwrap_or(&8));
    options.accept_invalid_certs = !args.get_flag("verify-tls");
    options.strict_scope = args.get_flag("strict-scope");
    options.show_progress = !args.get_flag("quiet");
    options.headers = args
        .get_many::<(String, String)>("header")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    options.cookies = args
        .get_many::<(String, String)>("cookie")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    if let Some(limit) = args.get_one::<f64>("max-duration") {
        options.max_duration = Some(seconds(*limit, "max-duration")?);
    }

    Ok(options)
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_configuration(options: &ScanOptions) {
    println!("\n🕷️  Scanning {}", options.url.bold());
    println!("Crawl depth: {}", options.max_depth);
    println!("Workers: {}", options.workers);
    println!("Delay: {:.2}s", options.delay.as_secs_f64());
    if options.test_forms {
        println!("Form testing: enabled");
    }
    if options.strict_scope {
        println!("Scope: strict (exact host and port)");
    }
    println!();
}

pub fn print_outcome(outcome: &ScanOutcome) {
    print_divider();
    print!("{}", generate_text_report(&outcome.findings));
    print_divider();

    println!(
        "Pages fetched: {}  URLs visited: {}  Forms found: {}  Time: {:.1}s",
        outcome.pages_fetched,
        outcome.visited.len(),
        outcome.forms.len(),
        outcome.elapsed.as_secs_f64()
    );
}

pub async fn handle_scan(args: &ArgMatches) -> Result<()> {
    let quiet = args.get_flag("quiet");
    let output = expand_path(
        args.get_one::<String>("output")
            .map(String::as_str)
            .unwrap_or(webscout_core::report::DEFAULT_REPORT_PATH),
    );

    let cancel = CancelFlag::new();
    let mut options = build_scan_options(args)?.with_cancel_flag(cancel.clone());
    debug!("Scan target {} with depth {}", options.url, options.max_depth);

    if !quiet {
        print_configuration(&options);
        options = options.with_finding_callback(Arc::new(|finding: &Finding| {
            println!("{}", finding_line(finding).yellow());
        }));
    }

    // First ctrl-c stops the scan gracefully; the report is still written
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "\n{} Stopping scan, finishing in-flight requests...",
                "!".yellow().bold()
            );
            cancel.cancel();
        }
    });

    let outcome = execute_scan(options).await;
    ctrl_c.abort();
    let outcome = outcome?;

    if outcome.cancelled {
        println!(
            "\n{} Scan stopped early; the report covers what was scanned.\n",
            "!".yellow().bold()
        );
    } else if !quiet {
        println!("\n✓ Scan complete!\n");
    }

    print_outcome(&outcome);

    write_json_report(&outcome.findings, &output)?;
    info!("Report written to {}", output.display());
    println!("Report saved to {}", output.display().to_string().green());

    if !quiet && !outcome.findings.is_empty() {
        let summary: Vec<String> = tally(&outcome.findings)
            .into_iter()
            .map(|(category, count)| format!("{} {}", count, category))
            .collect();
        println!("Found: {}", summary.join(", "));
    }

    Ok(())
}
