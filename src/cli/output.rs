//! Handles all user-facing output for the CLI.
//!
//! This module is responsible for pretty-printing and colorizing the run
//! summary. Centralizing output logic here keeps the runner free of
//! presentation concerns; external reporters consume the serialized shapes
//! instead.

use crate::runner::SuiteReport;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Picks a color choice based on whether stdout is a terminal.
pub fn color_choice() -> ColorChoice {
    if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

fn write_colored(stdout: &mut StandardStream, text: &str, color: Color) {
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    print!("{text}");
    let _ = stdout.reset();
}

/// Prints the aggregate summary for one run.
pub fn print_summary(report: &SuiteReport) {
    let mut stdout = StandardStream::stdout(color_choice());

    print!(
        "Files: {} tested, {} passed, ",
        report.files_tested, report.files_passed
    );
    if report.files_failed > 0 {
        write_colored(&mut stdout, &report.files_failed.to_string(), Color::Red);
    } else {
        print!("{}", report.files_failed);
    }
    println!(" failed");

    print!("Cases: total {}, ", report.total);
    write_colored(&mut stdout, "passed", Color::Green);
    print!(" {}, ", report.passes);
    write_colored(&mut stdout, "failed", Color::Red);
    print!(" {}, ", report.errors);
    write_colored(&mut stdout, "skipped", Color::Yellow);
    println!(" {}", report.skipped);

    println!("Elapsed: {:.2?}", report.elapsed);

    if report.success {
        write_colored(&mut stdout, "OK", Color::Green);
    } else {
        write_colored(&mut stdout, "FAILED", Color::Red);
    }
    println!();
}

/// Prints the aggregate report as JSON for external reporters.
pub fn print_json(report: &SuiteReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to serialize report: {e}"),
    }
}
