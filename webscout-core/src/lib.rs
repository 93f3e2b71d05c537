pub mod collector;
pub mod data;
pub mod fuzz;
pub mod payloads;
pub mod report;
pub mod rules;
pub mod scan;
pub mod security;

use colored::Colorize;

pub use collector::{FindingCallback, FindingCollector};
pub use data::{Detection, Finding, FindingCategory, PayloadCategory, Severity};
pub use rules::{RuleSet, ScanRules};
pub use scan::{ScanContext, ScanOptions, ScanOutcome, execute_scan};

pub fn print_banner() {
    let banner = r#"
                   __                         __
 _      _____  ___/ /_______________  __  __/ /_
| | /| / / _ \/ __  / ___/ ___/ __ \/ / / / __/
| |/ |/ /  __/ /_/ (__  ) /__/ /_/ / /_/ / /_
|__/|__/\___/\__,_/____/\___/\____/\__,_/\__/
"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "  {} {}\n  {}\n",
        "webscout".bold(),
        env!("CARGO_PKG_VERSION"),
        "For authorized security testing only.".dimmed()
    );
}
