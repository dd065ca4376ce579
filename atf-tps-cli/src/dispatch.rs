// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    config::{DefaultConfigWarnings, TpsConfig},
    errors::ExpectedError,
    junit::JunitSink,
    output::{NO_HEADING, OutputContext, OutputOpts, OutputWriter},
    summary::summary_str,
};
use atf_tps::{Diagnostics, EventRecorder, EventSink, TallySink, TpsReader};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use std::io::{BufReader, BufWriter, Write};
use tracing::{debug, warn};

/// Summarize atf-tps test reports and convert them to other formats.
///
/// atf-tps is the report format produced by ATF test program runners. Reports
/// are read error-tolerantly: structural problems are reported as diagnostics
/// and the rest of the report is still used.
#[derive(Debug, Parser)]
#[command(
    version,
    styles = crate::output::clap_styles::style(),
    max_term_width = 100
)]
pub struct AtfTpsApp {
    #[clap(flatten)]
    output: OutputOpts,

    #[clap(flatten)]
    config_opts: ConfigOpts,

    #[clap(subcommand)]
    command: Command,
}

impl AtfTpsApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    pub fn exec(
        self,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32, ExpectedError> {
        let config = self.config_opts.make_config()?;
        debug!(verbose = output.verbose, "loaded config: {config:?}");

        match self.command {
            Command::Summary { input } => input.exec_summary(&config, output, output_writer),
            Command::Junit { input, output_file } => {
                input.exec_junit(&config, output_file.as_deref(), output_writer)
            }
            Command::Events { input } => input.exec_events(&config, output_writer),
        }
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Config options")]
struct ConfigOpts {
    /// Config file [default: .config/atf-tps.toml in the current directory]
    #[arg(long, global = true, value_name = "PATH", env = "ATF_TPS_CONFIG")]
    config_file: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    fn make_config(&self) -> Result<TpsConfig, ExpectedError> {
        let current_dir =
            std::env::current_dir().map_err(|err| ExpectedError::CurrentDirFailed { err })?;
        let current_dir = Utf8PathBuf::try_from(current_dir)
            .map_err(|err| ExpectedError::CurrentDirInvalidUtf8 {
                path: err.into_path_buf(),
            })?;

        let config = TpsConfig::from_sources(
            &current_dir,
            self.config_file.as_deref(),
            &mut DefaultConfigWarnings,
        )?;
        Ok(config)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a per-program summary of a report
    ///
    /// Exits with code 100 if any test case or test program failed, and with
    /// code 101 if the report had parse diagnostics (unless
    /// `report.fail-on-diagnostics` is disabled).
    Summary {
        #[clap(flatten)]
        input: InputOpts,
    },

    /// Convert a report to JUnit XML
    ///
    /// Each test program becomes a test suite. A test program that failed as a
    /// whole is recorded as an extra test case with an error status.
    Junit {
        #[clap(flatten)]
        input: InputOpts,

        /// Write the JUnit report to this file instead of standard output
        #[arg(long, short = 'o', value_name = "PATH")]
        output_file: Option<Utf8PathBuf>,
    },

    /// Print every event in a report as one JSON object per line
    Events {
        #[clap(flatten)]
        input: InputOpts,
    },
}

#[derive(Debug, Args)]
struct InputOpts {
    /// Path to the atf-tps report, or `-` for standard input
    #[arg(value_name = "INPUT")]
    input: Utf8PathBuf,
}

impl InputOpts {
    fn exec_summary(
        &self,
        config: &TpsConfig,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32, ExpectedError> {
        let mut tally = TallySink::new();
        let diagnostics = self.read(config, &mut tally)?;

        let summary = summary_str(&tally, &output.summary_styles());
        let mut writer = output_writer.stdout_writer();
        writer
            .write_all(summary.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|err| ExpectedError::WriteOutputError { err })?;

        self.check_diagnostics(config, diagnostics)?;
        if tally.has_failures() {
            return Err(ExpectedError::TestRunFailed);
        }
        Ok(0)
    }

    fn exec_junit(
        &self,
        config: &TpsConfig,
        output_file: Option<&Utf8Path>,
        output_writer: &mut OutputWriter,
    ) -> Result<i32, ExpectedError> {
        let mut sink = JunitSink::new(config.junit());
        let diagnostics = self.read(config, &mut sink)?;
        let report = sink.finish();
        debug!(
            "JUnit report has {} tests ({} failures, {} errors)",
            report.tests, report.failures, report.errors
        );

        match output_file {
            Some(path) => {
                let file = fs_err::File::create(path.as_std_path()).map_err(|err| {
                    ExpectedError::OutputFileCreateError {
                        path: path.to_owned(),
                        err,
                    }
                })?;
                let mut writer = BufWriter::new(file);
                report
                    .serialize(&mut writer)
                    .map_err(|err| ExpectedError::JunitSerializeError { err: err.into() })?;
                writer
                    .flush()
                    .map_err(|err| ExpectedError::WriteOutputError { err })?;
            }
            None => {
                let mut writer = output_writer.stdout_writer();
                report
                    .serialize(&mut writer)
                    .map_err(|err| ExpectedError::JunitSerializeError { err: err.into() })?;
                writer
                    .write_all(b"\n")
                    .and_then(|()| writer.flush())
                    .map_err(|err| ExpectedError::WriteOutputError { err })?;
            }
        }

        self.check_diagnostics(config, diagnostics)?;
        Ok(0)
    }

    fn exec_events(
        &self,
        config: &TpsConfig,
        output_writer: &mut OutputWriter,
    ) -> Result<i32, ExpectedError> {
        let mut recorder = EventRecorder::new();
        let diagnostics = self.read(config, &mut recorder)?;

        let mut writer = output_writer.stdout_writer();
        for event in recorder.events() {
            serde_json::to_writer(&mut writer, event)
                .map_err(|err| ExpectedError::WriteOutputError { err: err.into() })?;
            writer
                .write_all(b"\n")
                .map_err(|err| ExpectedError::WriteOutputError { err })?;
        }
        writer
            .flush()
            .map_err(|err| ExpectedError::WriteOutputError { err })?;

        self.check_diagnostics(config, diagnostics)?;
        Ok(0)
    }

    fn read<S: EventSink>(
        &self,
        config: &TpsConfig,
        sink: &mut S,
    ) -> Result<Diagnostics, ExpectedError> {
        let options = config.reader_options();
        let result = if self.input.as_str() == "-" {
            TpsReader::with_options(std::io::stdin().lock(), options).read(sink)
        } else {
            let file = fs_err::File::open(self.input.as_std_path())
                .map_err(|err| ExpectedError::input_open_error(self.input.as_str(), err))?;
            TpsReader::with_options(BufReader::new(file), options).read(sink)
        };

        result.map_err(|err| ExpectedError::preamble_error(self.input.as_str(), err))
    }

    fn check_diagnostics(
        &self,
        config: &TpsConfig,
        diagnostics: Diagnostics,
    ) -> Result<(), ExpectedError> {
        if diagnostics.is_empty() {
            return Ok(());
        }

        let count = diagnostics.len();
        for error in diagnostics.into_errors() {
            let report = miette::Report::new(error);
            warn!(target: NO_HEADING, "{report:?}");
        }

        if config.report().fail_on_diagnostics() {
            Err(ExpectedError::parse_diagnostics(self.input.as_str(), count))
        } else {
            warn!(
                "{}: {count} parse {} (ignored because report.fail-on-diagnostics is false)",
                self.input,
                if count == 1 { "diagnostic" } else { "diagnostics" },
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{exit_codes::TpsExitCode, output::Color};
    use camino_tempfile::Utf8TempDir;
    use clap::CommandFactory;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const PASSING: &str = indoc! {r#"
        Content-Type: application/X-atf-tps; version="2"

        info: host, build-01
        tps-count: 1
        tp-start: p1, 2
        tc-start: t1
        tc-so: hello
        tc-end: t1, passed
        tc-start: t2
        tc-end: t2, skipped, requires root
        tp-end: p1
    "#};

    const FAILING: &str = indoc! {r#"
        Content-Type: application/X-atf-tps; version="2"

        tps-count: 1
        tp-start: p1, 1
        tc-start: t1
        tc-end: t1, failed, exit 1
        tp-end: p1
    "#};

    const SHORTFALL: &str = indoc! {r#"
        Content-Type: application/X-atf-tps; version="2"

        tps-count: 2
        tp-start: p1, 1
        tc-start: t1
        tc-end: t1, passed
        tp-end: p1
    "#};

    const BAD_PREAMBLE: &str = indoc! {r#"
        Content-Type: text/plain

        tps-count: 0
    "#};

    struct Fixture {
        dir: Utf8TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: Utf8TempDir::new().expect("created temp dir"),
            }
        }

        fn write(&self, name: &str, contents: &str) -> Utf8PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, contents).expect("wrote file");
            path
        }

        fn run(&self, args: &[&str]) -> (Result<i32, ExpectedError>, String) {
            let config_file = self.dir.path().join("atf-tps.toml");
            if !config_file.exists() {
                std::fs::write(&config_file, "").expect("wrote config");
            }

            let app = AtfTpsApp::try_parse_from(
                ["atf-tps", "--config-file", config_file.as_str()]
                    .into_iter()
                    .chain(args.iter().copied()),
            )
            .expect("valid arguments");
            let output = OutputContext {
                verbose: false,
                color: Color::Never,
            };
            let mut output_writer = OutputWriter::Test { stdout: Vec::new() };
            let result = app.exec(output, &mut output_writer);
            let OutputWriter::Test { stdout } = output_writer else {
                unreachable!("test output writer")
            };
            (result, String::from_utf8(stdout).expect("valid UTF-8"))
        }
    }

    fn exit_code(result: &Result<i32, ExpectedError>) -> i32 {
        match result {
            Ok(code) => *code,
            Err(error) => error.process_exit_code(),
        }
    }

    #[test]
    fn verify_app() {
        AtfTpsApp::command().debug_assert();
    }

    #[test]
    fn argument_parsing() {
        let valid: &[&[&str]] = &[
            &["atf-tps", "summary", "report.tps"],
            &["atf-tps", "summary", "-"],
            &["atf-tps", "--color", "never", "summary", "report.tps"],
            &["atf-tps", "junit", "report.tps", "-o", "junit.xml"],
            &["atf-tps", "junit", "--output-file", "junit.xml", "-"],
            &["atf-tps", "events", "report.tps", "--verbose"],
            &["atf-tps", "events", "--config-file", "c.toml", "report.tps"],
        ];
        for args in valid {
            if let Err(error) = AtfTpsApp::try_parse_from(*args) {
                panic!("{args:?} should have successfully parsed, but didn't: {error}");
            }
        }

        let invalid: &[(&[&str], clap::error::ErrorKind)] = &[
            (
                &["atf-tps", "summary"],
                clap::error::ErrorKind::MissingRequiredArgument,
            ),
            (
                &["atf-tps", "convert", "report.tps"],
                clap::error::ErrorKind::InvalidSubcommand,
            ),
            (
                &["atf-tps", "--color", "sometimes", "summary", "-"],
                clap::error::ErrorKind::InvalidValue,
            ),
        ];
        for (args, kind) in invalid {
            match AtfTpsApp::try_parse_from(*args) {
                Ok(_) => panic!("{args:?} should have errored out but successfully parsed"),
                Err(error) => assert_eq!(error.kind(), *kind, "for {args:?}"),
            }
        }
    }

    #[test_case("summary", PASSING, TpsExitCode::OK ; "summary passing")]
    #[test_case("summary", FAILING, TpsExitCode::TEST_RUN_FAILED ; "summary failing")]
    #[test_case("summary", SHORTFALL, TpsExitCode::PARSE_DIAGNOSTICS ; "summary diagnostics")]
    #[test_case("summary", BAD_PREAMBLE, TpsExitCode::PREAMBLE_ERROR ; "summary bad preamble")]
    #[test_case("junit", FAILING, TpsExitCode::OK ; "junit failing")]
    #[test_case("junit", SHORTFALL, TpsExitCode::PARSE_DIAGNOSTICS ; "junit diagnostics")]
    #[test_case("events", PASSING, TpsExitCode::OK ; "events passing")]
    #[test_case("events", BAD_PREAMBLE, TpsExitCode::PREAMBLE_ERROR ; "events bad preamble")]
    fn exit_codes(command: &str, report: &str, expected: i32) {
        let fixture = Fixture::new();
        let input = fixture.write("report.tps", report);
        let (result, _) = fixture.run(&[command, input.as_str()]);
        assert_eq!(exit_code(&result), expected, "result: {result:?}");
    }

    #[test]
    fn missing_input() {
        let fixture = Fixture::new();
        let input = fixture.dir.path().join("missing.tps");
        let (result, stdout) = fixture.run(&["summary", input.as_str()]);
        assert!(
            matches!(result, Err(ExpectedError::InputOpenError { .. })),
            "result: {result:?}"
        );
        assert_eq!(exit_code(&result), TpsExitCode::SETUP_ERROR);
        assert_eq!(stdout, "");
    }

    #[test]
    fn diagnostics_can_be_ignored() {
        let fixture = Fixture::new();
        fixture.write("atf-tps.toml", "[report]\nfail-on-diagnostics = false\n");
        let input = fixture.write("report.tps", SHORTFALL);
        let (result, _) = fixture.run(&["summary", input.as_str()]);
        assert_eq!(exit_code(&result), TpsExitCode::OK);
    }

    #[test]
    fn summary_output() {
        let fixture = Fixture::new();
        let input = fixture.write("report.tps", PASSING);
        let (result, stdout) = fixture.run(&["summary", input.as_str()]);
        assert_eq!(exit_code(&result), TpsExitCode::OK);
        insta::assert_snapshot!(stdout, @r"
        PASS p1: 1 passed, 0 failed, 1 skipped
        Summary: 1 program run: 1 passed, 0 failed, 1 skipped
        ");
    }

    #[test]
    fn events_output() {
        let fixture = Fixture::new();
        let input = fixture.write("report.tps", FAILING);
        let (result, stdout) = fixture.run(&["events", input.as_str()]);
        assert_eq!(exit_code(&result), TpsExitCode::OK);

        let events: Vec<serde_json::Value> = stdout
            .lines()
            .map(|line| serde_json::from_str(line).expect("valid JSON"))
            .collect();
        assert_eq!(events.len(), 6);
        assert_eq!(
            events[0],
            serde_json::json!({"event": "program-count", "count": 1})
        );
        assert_eq!(events[5], serde_json::json!({"event": "end-of-stream"}));
    }

    #[test]
    fn junit_output_file() {
        let fixture = Fixture::new();
        let input = fixture.write("report.tps", FAILING);
        let output_file = fixture.dir.path().join("junit.xml");
        let (result, stdout) = fixture.run(&["junit", input.as_str(), "-o", output_file.as_str()]);
        assert_eq!(exit_code(&result), TpsExitCode::OK);
        assert_eq!(stdout, "");

        let xml = std::fs::read_to_string(&output_file).expect("JUnit report was written");
        assert!(xml.contains(r#"name="t1""#), "{xml}");
        assert!(xml.contains("exit 1"), "{xml}");
    }
}
