//! CLI parsing tests for the stv command line interface

use clap::Parser;
use stevedore::cli::{Cli, Command, OutputFormat};

// ============================================================================
// Basic command parsing tests
// ============================================================================

#[test]
fn test_parse_troubleshoot_command() {
    let args = Cli::parse_from(["stv", "troubleshoot", "-a", "shop", "cart"]);
    assert!(matches!(args.command, Command::Troubleshoot(_)));
}

#[test]
fn test_parse_troubleshoot_alias_ts() {
    let args = Cli::parse_from(["stv", "ts", "-a", "shop", "cart"]);
    assert!(matches!(args.command, Command::Troubleshoot(_)));
}

#[test]
fn test_parse_troubleshoot_app_and_service() {
    let args = Cli::parse_from(["stv", "troubleshoot", "--app", "shop", "cart"]);
    let Command::Troubleshoot(ts) = args.command;
    assert_eq!(ts.app, "shop");
    assert_eq!(ts.service, "cart");
}

#[test]
fn test_parse_troubleshoot_trace() {
    let args = Cli::parse_from(["stv", "troubleshoot", "-a", "shop", "cart", "--trace"]);
    let Command::Troubleshoot(ts) = args.command;
    assert!(ts.trace);
}

#[test]
fn test_parse_troubleshoot_default_timeout() {
    let args = Cli::parse_from(["stv", "troubleshoot", "-a", "shop", "cart"]);
    let Command::Troubleshoot(ts) = args.command;
    assert_eq!(ts.timeout, 60);
}

#[test]
fn test_parse_troubleshoot_custom_timeout() {
    let args = Cli::parse_from(["stv", "troubleshoot", "-a", "shop", "cart", "--timeout", "15"]);
    let Command::Troubleshoot(ts) = args.command;
    assert_eq!(ts.timeout, 15);
}

#[test]
fn test_parse_troubleshoot_missing_app_fails() {
    let result = Cli::try_parse_from(["stv", "troubleshoot", "cart"]);
    assert!(result.is_err());
}

#[test]
fn test_parse_troubleshoot_missing_service_fails() {
    let result = Cli::try_parse_from(["stv", "troubleshoot", "-a", "shop"]);
    assert!(result.is_err());
}

// ============================================================================
// Namespace flag tests
// ============================================================================

#[test]
fn test_parse_with_namespace() {
    let args = Cli::parse_from(["stv", "-n", "staging", "troubleshoot", "-a", "shop", "cart"]);
    assert_eq!(args.namespace, Some("staging".to_string()));
}

#[test]
fn test_parse_with_namespace_long_flag() {
    let args = Cli::parse_from([
        "stv",
        "--namespace",
        "staging",
        "troubleshoot",
        "-a",
        "shop",
        "cart",
    ]);
    assert_eq!(args.namespace, Some("staging".to_string()));
}

// ============================================================================
// Output format tests
// ============================================================================

#[test]
fn test_parse_default_output_format() {
    let args = Cli::parse_from(["stv", "troubleshoot", "-a", "shop", "cart"]);
    assert_eq!(args.output, OutputFormat::Text);
}

#[test]
fn test_parse_output_json() {
    let args = Cli::parse_from(["stv", "-o", "json", "troubleshoot", "-a", "shop", "cart"]);
    assert_eq!(args.output, OutputFormat::Json);
}

#[test]
fn test_parse_output_yaml() {
    let args = Cli::parse_from(["stv", "-o", "yaml", "troubleshoot", "-a", "shop", "cart"]);
    assert_eq!(args.output, OutputFormat::Yaml);
}

#[test]
fn test_parse_output_long_flag() {
    let args = Cli::parse_from([
        "stv",
        "--output",
        "json",
        "troubleshoot",
        "-a",
        "shop",
        "cart",
    ]);
    assert_eq!(args.output, OutputFormat::Json);
}

// ============================================================================
// Context flag tests
// ============================================================================

#[test]
fn test_parse_context() {
    let args = Cli::parse_from([
        "stv",
        "--context",
        "my-cluster",
        "troubleshoot",
        "-a",
        "shop",
        "cart",
    ]);
    assert_eq!(args.context, Some("my-cluster".to_string()));
}

// ============================================================================
// Verbose flag tests
// ============================================================================

#[test]
fn test_parse_verbose() {
    let args = Cli::parse_from(["stv", "-v", "troubleshoot", "-a", "shop", "cart"]);
    assert_eq!(args.verbose, 1);
}

#[test]
fn test_parse_verbose_double() {
    let args = Cli::parse_from(["stv", "-vv", "troubleshoot", "-a", "shop", "cart"]);
    assert_eq!(args.verbose, 2);
}

#[test]
fn test_parse_verbose_triple() {
    let args = Cli::parse_from(["stv", "-vvv", "troubleshoot", "-a", "shop", "cart"]);
    assert_eq!(args.verbose, 3);
}

// ============================================================================
// No color flag test
// ============================================================================

#[test]
fn test_parse_no_color() {
    let args = Cli::parse_from(["stv", "--no-color", "troubleshoot", "-a", "shop", "cart"]);
    assert!(args.no_color);
}

// ============================================================================
// OutputFormat tests
// ============================================================================

#[test]
fn test_output_format_default() {
    assert_eq!(OutputFormat::default(), OutputFormat::Text);
}

#[test]
fn test_output_format_debug() {
    let format = OutputFormat::Yaml;
    let debug = format!("{:?}", format);
    assert_eq!(debug, "Yaml");
}
