use crate::handlers::{parse_cookie_line, parse_header_line};
use clap::{ArgAction, arg};
use url::Url;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("webscout")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("webscout")
        .about(
            "Crawl a site within its own domain, check every page for weak headers and \
            information leaks, and probe query parameters for injection flaws.",
        )
        .styles(CLAP_STYLING)
        .arg(
            arg!(-u --"url" <URL>)
                .required(true)
                .help("The root URL to scan")
                .value_parser(clap::value_parser!(Url)),
        )
        .arg(
            arg!(-d --"crawl-depth" <DEPTH>)
                .required(false)
                .help("Maximum number of link hops from the root URL")
                .value_parser(clap::value_parser!(usize))
                .default_value("2"),
        )
        .arg(
            arg!(--"delay" <SECONDS>)
                .required(false)
                .help("Minimum time between two requests, shared by all workers")
                .value_parser(clap::value_parser!(f64))
                .default_value("1.0"),
        )
        .arg(
            arg!(-w --"workers" <NUM_WORKERS>)
                .required(false)
                .help("The number of async workers crawling the site.")
                .value_parser(clap::value_parser!(usize))
                .default_value("1"),
        )
        .arg(
            arg!(--"timeout" <SECONDS>)
                .required(false)
                .help("Request timeout in seconds")
                .value_parser(clap::value_parser!(u64))
                .default_value("8"),
        )
        .arg(
            arg!(--"verify-tls")
                .required(false)
                .help("Validate TLS certificates (default: accept any certificate)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(-H --"header" <HEADER>)
                .required(false)
                .help("Extra request header as 'Name: value'. May be repeated.")
                .value_parser(parse_header_line)
                .action(ArgAction::Append),
        )
        .arg(
            arg!(-c --"cookie" <COOKIE>)
                .required(false)
                .help("Cookie sent with every request as 'name=value'. May be repeated.")
                .value_parser(parse_cookie_line)
                .action(ArgAction::Append),
        )
        .arg(
            arg!(--"rules" <PATH>)
                .required(false)
                .help("JSON file overriding the built-in headers, patterns and payloads"),
        )
        .arg(
            arg!(--"test-forms")
                .required(false)
                .help("Also submit probes through every form found during the crawl")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--"strict-scope")
                .required(false)
                .help("Only queue links whose host and port exactly match the root URL")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--"max-duration" <SECONDS>)
                .required(false)
                .help("Stop the scan after this many seconds and report what was found")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            arg!(-o --"output" <PATH>)
                .required(false)
                .help("Where to write the JSON report")
                .default_value("vulnerability_report.json"),
        )
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(-v --"verbose" "Increase log verbosity (-v info, -vv debug)")
                .required(false)
                .action(ArgAction::Count),
        )
}
