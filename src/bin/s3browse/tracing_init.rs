// Log subscriber for the s3browse binary.
//
// Listing output and signed URLs go to stdout, so every log line goes to
// stderr and the two can be piped separately.

use std::env;
use std::io::IsTerminal;

use tracing_subscriber::fmt::format::FmtSpan;

use s3browse_rs::config::TracingConfig;

const EVENT_FILTER_ENV_VAR: &str = "RUST_LOG";

const CRATE_TARGETS: [&str; 2] = ["s3browse_rs", "s3browse"];

// Credential lookups (IMDS, STS) and request signing happen in these crates.
const AWS_SDK_TARGETS: [&str; 4] = [
    "aws_config",
    "aws_smithy_runtime",
    "aws_sigv4",
    "aws_sdk_sts",
];

/// The directive string and whether targets are shown.
///
/// `RUST_LOG` wins unless AWS SDK tracing was asked for explicitly. Without
/// SDK tracing, `aws_config` still reports warnings so that a broken
/// credential source is visible at the default verbosity.
fn event_filter(config: &TracingConfig, env_filter: Option<String>) -> (String, bool) {
    let level = config.tracing_level;
    let crate_directives = CRATE_TARGETS.map(|target| format!("{target}={level}"));

    if config.aws_sdk_tracing {
        let sdk_directives = AWS_SDK_TARGETS.map(|target| format!("{target}={level}"));
        return ([crate_directives.join(","), sdk_directives.join(",")].join(","), true);
    }

    match env_filter {
        Some(filter) if !filter.trim().is_empty() => (filter, true),
        _ => (format!("{},aws_config=warn", crate_directives.join(",")), false),
    }
}

pub fn init_tracing(config: &TracingConfig) {
    let fmt_span = if config.span_events_tracing {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let (filter, show_target) = event_filter(config, env::var(EVENT_FILTER_ENV_VAR).ok());

    let subscriber_builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .compact()
        .with_ansi(!config.disable_color_tracing && std::io::stderr().is_terminal())
        .with_span_events(fmt_span)
        .with_env_filter(filter)
        .with_target(show_target);

    if config.json_tracing {
        subscriber_builder.json().init();
    } else {
        subscriber_builder.init();
    }
}
