// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::{Args, ValueEnum};
use miette::{GraphicalReportHandler, GraphicalTheme, ThemeStyles};
use owo_colors::{OwoColorize, Style, style};
use std::{
    fmt,
    io::{self, BufWriter, Write},
    sync::Once,
};
use tracing::{Event, Level, Subscriber, level_filters::LevelFilter, warn};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{FmtContext, FormatEvent, FormatFields, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// The environment variable used to configure logging.
pub(crate) const LOG_ENV: &str = "ATF_TPS_LOG";

/// Log target for messages printed without an `error:`/`warning:` heading.
pub(crate) const NO_HEADING: &str = "atf_tps_cli::no_heading";

pub(crate) mod clap_styles {
    use clap::builder::{
        Styles,
        styling::{AnsiColor, Effects},
    };

    pub(crate) const fn style() -> Styles {
        let heading = AnsiColor::Green.on_default().effects(Effects::BOLD);
        let literal = AnsiColor::Cyan.on_default().effects(Effects::BOLD);
        Styles::styled()
            .header(heading)
            .usage(heading)
            .literal(literal)
            .placeholder(AnsiColor::Cyan.on_default())
            .error(AnsiColor::Red.on_default().effects(Effects::BOLD))
            .valid(literal)
            .invalid(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    }
}

#[derive(Copy, Clone, Debug, Args)]
#[must_use]
pub(crate) struct OutputOpts {
    /// Verbose output
    #[arg(long, short, global = true, env = "ATF_TPS_VERBOSE")]
    pub(crate) verbose: bool,

    /// Produce color output: auto, always, never
    #[arg(
        long,
        value_enum,
        default_value_t,
        hide_possible_values = true,
        global = true,
        value_name = "WHEN",
        env = "CARGO_TERM_COLOR"
    )]
    pub(crate) color: Color,
}

impl OutputOpts {
    pub(crate) fn init(self) -> OutputContext {
        let OutputOpts { verbose, color } = self;
        init_logging(color, verbose);
        OutputContext { verbose, color }
    }
}

#[derive(Copy, Clone, Debug)]
#[must_use]
pub struct OutputContext {
    pub(crate) verbose: bool,
    pub(crate) color: Color,
}

impl OutputContext {
    /// Returns styles for errors printed to stderr.
    pub fn stderr_styles(&self) -> StderrStyles {
        if self.color.should_colorize(supports_color::Stream::Stderr) {
            StderrStyles {
                bold: style().bold(),
            }
        } else {
            StderrStyles::default()
        }
    }

    /// Returns styles for the human-readable summary written to stdout.
    pub(crate) fn summary_styles(&self) -> SummaryStyles {
        if self.color.should_colorize(supports_color::Stream::Stdout) {
            SummaryStyles::colorized()
        } else {
            SummaryStyles::default()
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
#[must_use]
pub enum Color {
    #[default]
    Auto,
    Always,
    Never,
}

impl Color {
    pub(crate) fn should_colorize(self, stream: supports_color::Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

static INIT_LOGGER: Once = Once::new();

/// Installs the stderr log layer and the miette report hook. Only the first
/// call has any effect.
fn init_logging(color: Color, verbose: bool) {
    let colorize = color.should_colorize(supports_color::Stream::Stderr);

    INIT_LOGGER.call_once(|| {
        let value = std::env::var_os(LOG_ENV).unwrap_or_default();
        let value = value.to_string_lossy();
        let (targets, parse_error) = match parse_log_targets(&value, verbose) {
            Ok(targets) => (targets, None),
            Err(error) => (Targets::new().with_default(LevelFilter::INFO), Some(error)),
        };

        let layer = tracing_subscriber::fmt::layer()
            .event_format(HeadingFormatter { colorize })
            .with_writer(io::stderr)
            .with_filter(targets);
        tracing_subscriber::registry().with(layer).init();

        if let Some(error) = parse_error {
            warn!("ignoring invalid {LOG_ENV} value `{value}`: {error}");
        }

        if miette::set_hook(Box::new(move |_| Box::new(report_handler(colorize)))).is_err() {
            warn!("miette report hook was already installed");
        }
    });
}

fn report_handler(colorize: bool) -> GraphicalReportHandler {
    let mut theme = if supports_unicode::on(supports_unicode::Stream::Stderr) {
        GraphicalTheme::unicode()
    } else {
        GraphicalTheme::ascii()
    };
    if !colorize {
        theme.styles = ThemeStyles::none();
    }
    theme.characters.error = "error:".into();
    GraphicalReportHandler::new_themed(theme)
}

/// Parses the value of [`LOG_ENV`] into a filter.
///
/// An empty value means the default level, which is raised to `DEBUG` with
/// `--verbose`.
fn parse_log_targets(value: &str, verbose: bool) -> Result<Targets, String> {
    if value.is_empty() {
        let level = if verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        };
        return Ok(Targets::new().with_default(level));
    }
    value.parse().map_err(|error| format!("{error}"))
}

/// Prints each event as `<level>: <message>`, or just the message for events
/// logged to [`NO_HEADING`].
struct HeadingFormatter {
    colorize: bool,
}

impl HeadingFormatter {
    fn heading(&self, level: Level) -> (&'static str, Style) {
        let (heading, colored) = match level {
            Level::ERROR => ("error", style().red().bold()),
            Level::WARN => ("warning", style().yellow().bold()),
            Level::INFO => ("info", style().bold()),
            Level::DEBUG => ("debug", style().bold()),
            Level::TRACE => ("trace", style().dimmed()),
        };
        (heading, if self.colorize { colored } else { style() })
    }
}

impl<S, N> FormatEvent<S, N> for HeadingFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        if metadata.target() != NO_HEADING {
            let (heading, heading_style) = self.heading(*metadata.level());
            write!(writer, "{}: ", heading.style(heading_style))?;
        }
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[derive(Debug, Default)]
pub struct StderrStyles {
    pub(crate) bold: Style,
}

#[derive(Debug, Default)]
pub(crate) struct SummaryStyles {
    pub(crate) program: Style,
    pub(crate) pass: Style,
    pub(crate) fail: Style,
    pub(crate) skip: Style,
    pub(crate) count: Style,
}

impl SummaryStyles {
    fn colorized() -> Self {
        Self {
            program: style().bold(),
            pass: style().green().bold(),
            fail: style().red().bold(),
            skip: style().yellow().bold(),
            count: style().bold(),
        }
    }
}

/// Where command output goes. Tests capture stdout instead of printing it.
#[derive(Default)]
pub enum OutputWriter {
    /// Write to the process's stdout.
    #[default]
    Normal,
    /// Capture stdout.
    #[cfg(test)]
    Test {
        /// Captured stdout.
        stdout: Vec<u8>,
    },
}

impl OutputWriter {
    pub(crate) fn stdout_writer(&mut self) -> Box<dyn Write + '_> {
        match self {
            Self::Normal => Box::new(BufWriter::new(io::stdout().lock())),
            #[cfg(test)]
            Self::Test { stdout } => Box::new(stdout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("", false, Some(LevelFilter::INFO) ; "default")]
    #[test_case("", true, Some(LevelFilter::DEBUG) ; "verbose")]
    #[test_case("trace", false, Some(LevelFilter::TRACE) ; "explicit level")]
    #[test_case("atf_tps=debug", true, None ; "explicit targets ignore verbose")]
    fn log_targets(value: &str, verbose: bool, default: Option<LevelFilter>) {
        let targets = parse_log_targets(value, verbose).expect("valid filter");
        assert_eq!(targets.default_level(), default);
    }

    #[test]
    fn invalid_log_targets() {
        parse_log_targets("atf_tps=loud", false).expect_err("invalid level");
    }

    #[test_case(Level::ERROR, "error")]
    #[test_case(Level::WARN, "warning")]
    #[test_case(Level::TRACE, "trace")]
    fn headings(level: Level, expected: &str) {
        let formatter = HeadingFormatter { colorize: false };
        assert_eq!(formatter.heading(level).0, expected);
    }
}
