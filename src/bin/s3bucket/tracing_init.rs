use std::env;
use std::io::IsTerminal;

use tracing_subscriber::fmt::format::FmtSpan;

use s3bucket_rs::config::TracingConfig;

const EVENT_FILTER_ENV_VAR: &str = "RUST_LOG";

const SDK_TARGETS: [&str; 4] = ["aws_smithy_runtime", "aws_config", "aws_sigv4", "aws_sdk_s3"];

/// Logging for the `s3bucket` CLI.
///
/// Listing and deletion results are printed on stdout, so every log line goes
/// to stderr. By default only this crate's events are shown, at the level
/// picked with `-v`/`-q`. `--aws-sdk-tracing` adds the SDK's request and
/// retry events at the same level. Without it, `RUST_LOG` replaces the
/// default filter entirely.
pub fn init_tracing(config: &TracingConfig) {
    let fmt_span = if config.span_events_tracing {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let (event_filter, show_target) =
        event_filter(config, env::var(EVENT_FILTER_ENV_VAR).ok());

    let subscriber_builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .compact()
        .with_ansi(!config.disable_color_tracing && std::io::stderr().is_terminal())
        .with_span_events(fmt_span)
        .with_env_filter(event_filter)
        .with_target(show_target);

    if config.json_tracing {
        subscriber_builder.json().init();
    } else {
        subscriber_builder.init();
    }
}

/// Filter directives, and whether event targets are worth printing.
///
/// Targets only matter once events from other crates can show up.
fn event_filter(config: &TracingConfig, env_filter: Option<String>) -> (String, bool) {
    let level = config.tracing_level;
    let own = format!("s3bucket_rs={level},s3bucket={level}");

    if config.aws_sdk_tracing {
        let sdk = SDK_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",");
        return (format!("{own},{sdk}"), true);
    }

    match env_filter {
        Some(filter) => (filter, true),
        None => (own, false),
    }
}
