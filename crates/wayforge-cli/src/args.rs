// crates/wayforge-cli/src/args.rs
// ============================================================================
// Module: Argument Parsing
// Description: The CLI's clap surface, plus the manual pre-pass needed to
// support the bare `target <name>` positional form alongside `-t/--target`.
// Purpose: Keep the non-standard grammar quirk isolated from the rest of the
// binary.
// Dependencies: clap
// ============================================================================

//! ## Overview
//! `wayforge` accepts a target name two ways: `-t NAME` / `--target NAME`,
//! or the bare word `target` followed by a name (`wayforge target deploy`),
//! mirroring the positional form long-lived build tools in this space
//! support for muscle-memory compatibility. Clap's derive API has no clean
//! way to express "a positional subcommand-shaped word that isn't actually
//! a subcommand," so [`normalize_args`] rewrites it into `--target NAME`
//! before [`Cli::parse_from`] ever sees it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use clap::ArgAction;
use clap::Parser;

// ============================================================================
// SECTION: CLI Surface
// ============================================================================

/// Command-line arguments for the `wayforge` binary.
#[derive(Parser, Debug)]
#[command(name = "wayforge", disable_help_subcommand = true)]
pub struct Cli {
    /// The target to run. Defaults to the `target` environment variable,
    /// then to the build script's declared default target.
    #[arg(short = 't', long = "target", value_name = "NAME")]
    pub target: Option<String>,

    /// Number of workers to run concurrently. Omit to run sequentially.
    #[arg(short = 'p', long = "parallel", value_name = "N")]
    pub parallel: Option<usize>,

    /// Run only the named target, ignoring its dependencies.
    #[arg(short = 's', long = "single-target", action = ArgAction::SetTrue)]
    pub single_target: bool,

    /// Sets an environment variable before resolving configuration, as
    /// `KEY=VALUE`. May be repeated.
    #[arg(short = 'e', long = "environment-variable", value_name = "KEY=VALUE", action = ArgAction::Append)]
    pub environment_variable: Vec<String>,

    /// Lists every declared target and its build order, without running
    /// anything.
    #[arg(long = "list", action = ArgAction::SetTrue)]
    pub list: bool,

    /// Prints the computed build plan before running it.
    #[arg(long = "what-if", action = ArgAction::SetTrue)]
    pub what_if: bool,

    /// Everything after a literal `--` is forwarded verbatim to target
    /// bodies as script arguments, rather than parsed as flags.
    #[arg(last = true, value_name = "SCRIPTARGS")]
    pub script_args: Vec<String>,
}

// ============================================================================
// SECTION: Positional Pre-pass
// ============================================================================

/// Rewrites a leading bare `target NAME` pair into `--target NAME`, leaving
/// every other argument untouched. When a `-t`/`--target` flag is *also*
/// present before a `--` separator, the positional form wins (per the
/// documented precedence) and the conflicting flag's pair is dropped; the
/// returned `bool` reports whether that happened, so the caller can warn.
/// Anything after a literal `--` is script-argument territory and is never
/// inspected or rewritten, even if it happens to look like `-t`/`--target`.
///
/// `args` is expected to include the program name at index 0, matching
/// [`std::env::args`].
#[must_use]
pub fn normalize_args(args: Vec<String>) -> (Vec<String>, bool) {
    if args.len() < 3 || args[1] != "target" {
        return (args, false);
    }
    let mut normalized = Vec::with_capacity(args.len());
    normalized.push(args[0].clone());
    normalized.push("--target".to_string());

    let mut conflict = false;
    let mut past_separator = false;
    let mut rest = args.into_iter().skip(2);
    while let Some(arg) = rest.next() {
        if past_separator {
            normalized.push(arg);
            continue;
        }
        if arg == "--" {
            past_separator = true;
            normalized.push(arg);
            continue;
        }
        if arg == "-t" || arg == "--target" {
            conflict = true;
            rest.next();
            continue;
        }
        normalized.push(arg);
    }
    (normalized, conflict)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_target_form_is_rewritten() {
        let raw = vec!["wayforge".to_string(), "target".to_string(), "Deploy".to_string()];
        let (normalized, conflict) = normalize_args(raw);
        assert_eq!(normalized, vec!["wayforge", "--target", "Deploy"]);
        assert!(!conflict);
    }

    #[test]
    fn flag_form_is_left_untouched() {
        let raw = vec!["wayforge".to_string(), "--target".to_string(), "Deploy".to_string()];
        let (normalized, conflict) = normalize_args(raw.clone());
        assert_eq!(normalized, raw);
        assert!(!conflict);
    }

    #[test]
    fn bare_word_without_a_following_name_is_left_untouched() {
        let raw = vec!["wayforge".to_string(), "target".to_string()];
        let (normalized, conflict) = normalize_args(raw.clone());
        assert_eq!(normalized, raw);
        assert!(!conflict);
    }

    #[test]
    fn target_appearing_later_is_not_a_positional() {
        let raw = vec!["wayforge".to_string(), "--list".to_string(), "target".to_string(), "Deploy".to_string()];
        let (normalized, conflict) = normalize_args(raw.clone());
        assert_eq!(normalized, raw);
        assert!(!conflict);
    }

    #[test]
    fn trailing_flags_after_positional_target_survive() {
        let raw = vec![
            "wayforge".to_string(),
            "target".to_string(),
            "Deploy".to_string(),
            "--parallel".to_string(),
            "4".to_string(),
        ];
        let (normalized, conflict) = normalize_args(raw);
        assert_eq!(normalized, vec!["wayforge", "--target", "Deploy", "--parallel", "4"]);
        assert!(!conflict);
    }

    #[test]
    fn positional_wins_over_a_conflicting_flag_and_reports_it() {
        let raw = vec![
            "wayforge".to_string(),
            "target".to_string(),
            "Deploy".to_string(),
            "--target".to_string(),
            "Other".to_string(),
        ];
        let (normalized, conflict) = normalize_args(raw);
        assert_eq!(normalized, vec!["wayforge", "--target", "Deploy"]);
        assert!(conflict);
    }

    #[test]
    fn parses_with_clap_after_normalization() {
        let raw = vec!["wayforge".to_string(), "target".to_string(), "Deploy".to_string()];
        let (normalized, _) = normalize_args(raw);
        let cli = Cli::parse_from(normalized);
        assert_eq!(cli.target.as_deref(), Some("Deploy"));
    }

    #[test]
    fn script_args_after_separator_are_left_alone_even_if_flag_shaped() {
        let raw = vec![
            "wayforge".to_string(),
            "target".to_string(),
            "Deploy".to_string(),
            "--".to_string(),
            "-t".to_string(),
            "--target".to_string(),
        ];
        let (normalized, conflict) = normalize_args(raw);
        assert_eq!(normalized, vec!["wayforge", "--target", "Deploy", "--", "-t", "--target"]);
        assert!(!conflict);
    }

    #[test]
    fn script_args_are_collected_separately_from_flags() {
        let raw =
            vec!["wayforge".to_string(), "--target".to_string(), "Deploy".to_string(), "--".to_string(), "a".to_string(), "b".to_string()];
        let (normalized, _) = normalize_args(raw);
        let cli = Cli::parse_from(normalized);
        assert_eq!(cli.target.as_deref(), Some("Deploy"));
        assert_eq!(cli.script_args, vec!["a".to_string(), "b".to_string()]);
    }
}
