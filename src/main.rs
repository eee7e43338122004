extern crate log;
extern crate pretty_env_logger;

use std::path::{Path, PathBuf};
use std::process::exit;

use clap::{arg, command, value_parser, Command};
use serde::Serialize;

use omr_scan::classify::ScoredQuestion;
use omr_scan::grading::{grade_sheet, write_summary_csv, AnswerKey, GradeReport, SheetSummary};
use omr_scan::interpret::{scan_sheets, SheetWarning};
use omr_scan::options::ScanOptions;
use omr_scan::types::Answer;

#[derive(Serialize)]
#[serde(rename_all = "camelCase", untagged)]
enum SheetReport {
    #[serde(rename_all = "camelCase")]
    Scanned {
        path: PathBuf,
        answers: Vec<Answer>,
        warnings: Vec<SheetWarning>,
        #[serde(skip_serializing_if = "Option::is_none")]
        grade: Option<GradeReport>,
        #[serde(skip_serializing_if = "Option::is_none")]
        questions: Option<Vec<ScoredQuestion>>,
    },
    Failed {
        path: PathBuf,
        error: String,
    },
}

fn main() {
    pretty_env_logger::init_custom_env("LOG");

    let matches = cli().get_matches();
    let debug = matches.get_flag("debug");
    let details = matches.get_flag("details");
    let sheet_paths = matches
        .get_many::<PathBuf>("sheets")
        .expect("at least one sheet path is required")
        .cloned()
        .collect::<Vec<PathBuf>>();

    let mut options = match matches.get_one::<PathBuf>("config") {
        Some(path) => match ScanOptions::from_json_file(path) {
            Ok(options) => options,
            Err(e) => {
                eprintln!("Error: {}", e);
                exit(1);
            }
        },
        None => ScanOptions::default(),
    };
    options.debug = debug;
    if let Some(total_questions) = matches.get_one::<usize>("total-questions") {
        options.layout.total_questions = *total_questions;
    }

    let answer_key = matches
        .get_one::<PathBuf>("key")
        .map(|path| load_answer_key(path, options.layout.total_questions));

    let outcomes = scan_sheets(&sheet_paths, &options);
    let succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();

    let mut summaries = vec![];
    let reports = outcomes
        .into_iter()
        .map(|outcome| match outcome.result {
            Ok(sheet) => {
                let grade = answer_key
                    .as_ref()
                    .map(|key| grade_sheet(&sheet.answers, key));
                if let Some(report) = &grade {
                    summaries.push(SheetSummary::new(&outcome.path, report));
                }
                SheetReport::Scanned {
                    path: outcome.path,
                    grade,
                    answers: sheet.answers,
                    warnings: sheet.warnings,
                    questions: details.then_some(sheet.questions),
                }
            }
            Err(e) => SheetReport::Failed {
                path: outcome.path,
                error: e.to_string(),
            },
        })
        .collect::<Vec<SheetReport>>();

    if let Some(csv_path) = matches.get_one::<PathBuf>("csv") {
        let written = std::fs::File::create(csv_path)
            .map_err(csv::Error::from)
            .and_then(|file| write_summary_csv(file, &summaries));
        if let Err(e) = written {
            eprintln!("Error writing {}: {}", csv_path.display(), e);
            exit(1);
        }
    }

    match serde_json::to_string_pretty(&reports) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing results: {}", e);
            exit(1);
        }
    }

    if succeeded == 0 {
        exit(1);
    }
}

fn load_answer_key(path: &Path, total_questions: usize) -> AnswerKey {
    match AnswerKey::from_json_file(path) {
        Ok(key) => key.normalized(total_questions),
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(1);
        }
    }
}

#[allow(clippy::cognitive_complexity)]
fn cli() -> Command {
    command!()
        .arg(
            arg!(-c --config <PATH> "Path to a JSON file of scan options")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(-k --key <PATH> "Path to a JSON answer key to grade against")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(-n --"total-questions" <N> "Number of questions on the sheet")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            arg!(--csv <PATH> "Write a per-sheet score table as CSV")
                .requires("key")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(arg!(-d --debug "Write debug images next to each sheet"))
        .arg(arg!(--details "Include per-bubble fill ratios in the output"))
        .arg(
            arg!(sheets: <SHEET> ... "Paths to scanned answer sheet images")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn cli_parses_options() {
        let matches = cli()
            .try_get_matches_from(["omr-scan", "-n", "20", "--key", "key.json", "a.png", "b.png"])
            .unwrap();
        assert_eq!(matches.get_one::<usize>("total-questions"), Some(&20));
        assert_eq!(
            matches.get_one::<PathBuf>("key"),
            Some(&PathBuf::from("key.json"))
        );
        assert_eq!(matches.get_many::<PathBuf>("sheets").unwrap().count(), 2);
        assert!(!matches.get_flag("debug"));
    }

    #[test]
    fn csv_summary_needs_a_key() {
        assert!(cli()
            .try_get_matches_from(["omr-scan", "--csv", "scores.csv", "a.png"])
            .is_err());
        let matches = cli()
            .try_get_matches_from(["omr-scan", "-k", "key.json", "--csv", "scores.csv", "a.png"])
            .unwrap();
        assert_eq!(
            matches.get_one::<PathBuf>("csv"),
            Some(&PathBuf::from("scores.csv"))
        );
    }
}
