use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use webscout::commands::command_argument_builder;
use webscout::handlers::*;

fn matches(args: &[&str]) -> clap::ArgMatches {
    let mut argv = vec!["webscout"];
    argv.extend_from_slice(args);
    command_argument_builder().try_get_matches_from(argv).unwrap()
}

#[test]
fn test_parse_header_line() {
    assert_eq!(
        parse_header_line("Authorization: Bearer abc:def"),
        Ok(("Authorization".to_string(), "Bearer abc:def".to_string()))
    );
    assert_eq!(
        parse_header_line("X-Empty:"),
        Ok(("X-Empty".to_string(), String::new()))
    );
}

#[test]
fn test_parse_header_line_invalid() {
    assert!(parse_header_line("no separator").is_err());
    assert!(parse_header_line(": value").is_err());
}

#[test]
fn test_parse_cookie_line() {
    assert_eq!(
        parse_cookie_line("session=a=b"),
        Ok(("session".to_string(), "a=b".to_string()))
    );
    assert!(parse_cookie_line("session").is_err());
    assert!(parse_cookie_line("=value").is_err());
}

#[test]
fn test_defaults() {
    let options = build_scan_options(&matches(&["-u", "http://example.com"])).unwrap();

    assert_eq!(options.url, "http://example.com/");
    assert_eq!(options.max_depth, 2);
    assert_eq!(options.delay, Duration::from_secs(1));
    assert_eq!(options.workers, 1);
    assert_eq!(options.timeout, Duration::from_secs(8));
    assert!(options.accept_invalid_certs);
    assert!(!options.test_forms);
    assert!(!options.strict_scope);
    assert!(options.max_duration.is_none());
    assert!(options.show_progress);
    assert!(options.headers.is_empty());
}

#[test]
fn test_all_flags() {
    let options = build_scan_options(&matches(&[
        "--url",
        "https://example.com/app",
        "-d",
        "4",
        "--delay",
        "0.25",
        "-w",
        "3",
        "--timeout",
        "15",
        "--verify-tls",
        "-H",
        "X-Api-Key: secret",
        "-H",
        "Accept: text/html",
        "-c",
        "session=abc",
        "--test-forms",
        "--strict-scope",
        "--max-duration",
        "60",
        "-q",
    ]))
    .unwrap();

    assert_eq!(options.max_depth, 4);
    assert_eq!(options.delay, Duration::from_millis(250));
    assert_eq!(options.workers, 3);
    assert_eq!(options.timeout, Duration::from_secs(15));
    assert!(!options.accept_invalid_certs);
    assert_eq!(
        options.headers,
        vec![
            ("X-Api-Key".to_string(), "secret".to_string()),
            ("Accept".to_string(), "text/html".to_string()),
        ]
    );
    assert_eq!(options.cookies, vec![("session".to_string(), "abc".to_string())]);
    assert!(options.test_forms);
    assert!(options.strict_scope);
    assert_eq!(options.max_duration, Some(Duration::from_secs(60)));
    assert!(!options.show_progress);
}

#[test]
fn test_url_is_required() {
    assert!(
        command_argument_builder()
            .try_get_matches_from(["webscout"])
            .is_err()
    );
}

#[test]
fn test_invalid_url_rejected() {
    assert!(
        command_argument_builder()
            .try_get_matches_from(["webscout", "-u", "not a url"])
            .is_err()
    );
}

#[test]
fn test_malformed_header_rejected() {
    assert!(
        command_argument_builder()
            .try_get_matches_from(["webscout", "-u", "http://example.com", "-H", "broken"])
            .is_err()
    );
}

#[test]
fn test_negative_delay_rejected() {
    let args = matches(&["-u", "http://example.com", "--delay=-1"]);
    let err = build_scan_options(&args).err().unwrap();
    assert!(err.to_string().contains("--delay"));
}

#[test]
fn test_rules_file_loaded() -> Result<(), Box<dyn std::error::Error>> {
    let mut rules_file = NamedTempFile::new()?;
    write!(rules_file, r#"{{"required_headers": ["Content-Security-Policy"]}}"#)?;
    let path = rules_file.path().to_string_lossy().to_string();

    let options = build_scan_options(&matches(&["-u", "http://example.com", "--rules", &path]))?;

    assert_eq!(options.rules.required_headers, vec!["Content-Security-Policy"]);
    assert_eq!(options.rules.disclosure.len(), 4);
    Ok(())
}

#[test]
fn test_missing_rules_file_is_an_error() {
    let args = matches(&["-u", "http://example.com", "--rules", "/nonexistent/rules.json"]);
    assert!(build_scan_options(&args).is_err());
}

#[test]
fn test_expand_path_plain() {
    assert_eq!(
        expand_path("reports/out.json"),
        std::path::PathBuf::from("reports/out.json")
    );
}

#[test]
fn test_oversized_durations_rejected() {
    let args = matches(&["-u", "http://example.com", "--delay", "1e300"]);
    let err = build_scan_options(&args).err().unwrap();
    assert!(err.to_string().contains("--delay"));

    let args = matches(&["-u", "http://example.com", "--max-duration", "1e300"]);
    let err = build_scan_options(&args).err().unwrap();
    assert!(err.to_string().contains("--max-duration"));
}

#[test]
fn test_nan_delay_rejected() {
    let args = matches(&["-u", "http://example.com", "--delay", "NaN"]);
    assert!(build_scan_options(&args).is_err());
}
