//! File/suite orchestration tests: sequential and parallel aggregation,
//! load-failure isolation, discovery, and module isolation across files.

use pariksha::engine::results::Failure;
use pariksha::engine::scope::CaseOptions;
use pariksha::errors::ParikshaError;
use pariksha::isolation::cache::ModuleEntry;
use pariksha::runner::registry::SuiteRegistry;
use pariksha::runner::{RunOptions, SuiteRunner};
use std::sync::Arc;
use std::time::Duration;

fn registry() -> Arc<SuiteRegistry> {
    Arc::new(SuiteRegistry::new())
}

fn register_basic_suites(registry: &SuiteRegistry) {
    registry
        .register("spec/pass_spec", |engine, _modules| {
            engine
                .group("passing", |e| {
                    e.case("one", || Ok(())).unwrap();
                    e.case("two", || Ok(())).unwrap();
                })
                .unwrap();
        })
        .unwrap();
    registry
        .register("spec/fail_spec", |engine, _modules| {
            engine
                .group("failing", |e| {
                    e.case("good", || Ok(())).unwrap();
                    e.case("bad", || Err(Failure::assertion("wrong answer")))
                        .unwrap();
                })
                .unwrap();
        })
        .unwrap();
    registry
        .register("spec/skip_spec", |engine, _modules| {
            engine
                .case_with(
                    "disabled",
                    CaseOptions {
                        excluded: true,
                        ..Default::default()
                    },
                    || Ok(()),
                )
                .unwrap();
        })
        .unwrap();
}

#[test]
fn sequential_aggregation_satisfies_the_laws() {
    let registry = registry();
    register_basic_suites(&registry);
    let mut runner = SuiteRunner::new(registry, RunOptions::default());

    let files: Vec<String> = vec![
        "spec/pass_spec".into(),
        "spec/fail_spec".into(),
        "spec/skip_spec".into(),
    ];
    let report = runner.run_tests(&files).unwrap();

    assert_eq!(report.passes, 3);
    assert_eq!(report.errors, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.total, report.passes + report.errors + report.skipped);
    assert_eq!(report.success, report.errors == 0);
    assert_eq!(report.files_tested, 3);
    assert_eq!(report.files_passed, 2);
    assert_eq!(report.files_failed, 1);
}

#[test]
fn parallel_and_sequential_converge_on_the_same_shape() {
    let registry = registry();
    register_basic_suites(&registry);
    let files: Vec<String> = vec![
        "spec/pass_spec".into(),
        "spec/fail_spec".into(),
        "spec/skip_spec".into(),
    ];

    let sequential = SuiteRunner::new(Arc::clone(&registry), RunOptions::default())
        .run_tests(&files)
        .unwrap();
    let parallel = SuiteRunner::new(
        registry,
        RunOptions {
            parallel: true,
            workers: 2,
            timeout: Duration::from_secs(5),
            ..Default::default()
        },
    )
    .run_tests(&files)
    .unwrap();

    assert_eq!(parallel.passes, sequential.passes);
    assert_eq!(parallel.errors, sequential.errors);
    assert_eq!(parallel.skipped, sequential.skipped);
    assert_eq!(parallel.total, sequential.total);
    assert_eq!(parallel.files_passed, sequential.files_passed);
    assert_eq!(parallel.files_failed, sequential.files_failed);
    assert_eq!(parallel.success, sequential.success);
}

#[test]
fn missing_file_is_a_one_error_report_not_a_crash() {
    let registry = registry();
    let mut runner = SuiteRunner::new(registry, RunOptions::default());

    let file_report = runner.run_file("missing-file").unwrap();
    assert!(!file_report.success);
    assert_eq!(file_report.errors, 1);
    assert_eq!(file_report.passes, 0);

    let report = runner.run_tests(&["missing-file".to_string()]).unwrap();
    assert!(!report.success);
    assert_eq!(report.files_failed, 1);
}

#[test]
fn a_failing_file_never_stops_later_files() {
    let registry = registry();
    register_basic_suites(&registry);
    registry
        .register("spec/broken_spec", |_engine, _modules| {
            panic!("top-level explosion");
        })
        .unwrap();

    let mut runner = SuiteRunner::new(registry, RunOptions::default());
    let files: Vec<String> = vec!["spec/broken_spec".into(), "spec/pass_spec".into()];
    let report = runner.run_tests(&files).unwrap();

    assert_eq!(report.files_failed, 1);
    assert_eq!(report.files_passed, 1);
    assert_eq!(report.passes, 2);
    assert!(!report.success);
}

#[test]
fn cases_recorded_before_a_top_level_failure_are_kept() {
    let registry = registry();
    registry
        .register("spec/half_spec", |engine, _modules| {
            engine
                .group("early", |e| {
                    e.case("ran", || Ok(())).unwrap();
                })
                .unwrap();
            panic!("dies after the first group");
        })
        .unwrap();

    let mut runner = SuiteRunner::new(registry, RunOptions::default());
    let report = runner.run_file("spec/half_spec").unwrap();
    assert!(!report.success);
    assert_eq!(report.passes, 1);
    assert_eq!(report.errors, 1);
}

#[test]
fn structural_input_errors_fail_fast() {
    let registry = registry();
    let mut runner = SuiteRunner::new(registry, RunOptions::default());

    assert!(matches!(
        runner.run_tests(&[]),
        Err(ParikshaError::Usage { .. })
    ));
    assert!(matches!(
        runner.run_tests(&[String::new()]),
        Err(ParikshaError::Usage { .. })
    ));
    assert!(matches!(
        runner.run_file(""),
        Err(ParikshaError::Usage { .. })
    ));
}

#[test]
fn bad_name_filter_fails_before_any_execution() {
    let registry = registry();
    register_basic_suites(&registry);
    let mut runner = SuiteRunner::new(
        registry,
        RunOptions {
            name_filter: Some("(".to_string()),
            ..Default::default()
        },
    );
    assert!(matches!(
        runner.run_tests(&["spec/pass_spec".to_string()]),
        Err(ParikshaError::InvalidPattern { .. })
    ));
}

#[test]
fn run_discovered_errors_on_zero_matches() {
    let registry = registry();
    register_basic_suites(&registry);
    let mut runner = SuiteRunner::new(registry, RunOptions::default());

    assert!(matches!(
        runner.run_discovered("elsewhere", None),
        Err(ParikshaError::NoFilesFound { .. })
    ));
}

#[test]
fn run_discovered_honors_dir_and_pattern() {
    let registry = registry();
    register_basic_suites(&registry);
    let mut runner = SuiteRunner::new(registry, RunOptions::default());

    let report = runner.run_discovered("spec", Some("pass_spec$")).unwrap();
    assert_eq!(report.files_tested, 1);
    assert_eq!(report.passes, 2);
    assert!(report.success);
}

#[test]
fn engine_state_never_leaks_between_files() {
    let registry = registry();
    registry
        .register("spec/focused_spec", |engine, _modules| {
            engine
                .case_with(
                    "starred",
                    CaseOptions {
                        focused: true,
                        ..Default::default()
                    },
                    || Ok(()),
                )
                .unwrap();
        })
        .unwrap();
    registry
        .register("spec/plain_spec", |engine, _modules| {
            engine.case("ordinary", || Ok(())).unwrap();
        })
        .unwrap();

    let mut runner = SuiteRunner::new(registry, RunOptions::default());
    let files: Vec<String> = vec!["spec/focused_spec".into(), "spec/plain_spec".into()];
    let report = runner.run_tests(&files).unwrap();

    // A stale focus flag would have skipped the second file's case.
    assert_eq!(report.passes, 2);
    assert_eq!(report.skipped, 0);
}

#[test]
fn module_state_is_purged_between_files() {
    let registry = registry();
    registry
        .register("spec/polluter_spec", |engine, modules| {
            modules.insert("user.state", ModuleEntry::new(Arc::new(42u32), 16));
            engine.case("pollutes", || Ok(())).unwrap();
        })
        .unwrap();
    registry
        .register("spec/checker_spec", |engine, modules| {
            let leaked = modules.contains("user.state");
            engine
                .case("observes a fresh cache", move || {
                    if leaked {
                        Err(Failure::assertion("module state leaked across files"))
                    } else {
                        Ok(())
                    }
                })
                .unwrap();
        })
        .unwrap();

    let files: Vec<String> = vec!["spec/polluter_spec".into(), "spec/checker_spec".into()];

    let report = SuiteRunner::new(Arc::clone(&registry), RunOptions::default())
        .run_tests(&files)
        .unwrap();
    assert!(report.success, "purge between files should hide the leak");

    let leaky = SuiteRunner::new(
        registry,
        RunOptions {
            isolate_modules: false,
            ..Default::default()
        },
    )
    .run_tests(&files)
    .unwrap();
    assert!(!leaky.success, "without isolation the leak is observable");
    assert_eq!(leaky.errors, 1);
}

#[test]
fn parallel_timeout_records_a_failed_file() {
    let registry = registry();
    registry
        .register("spec/hang_spec", |engine, _modules| {
            engine
                .case("sleeps", || {
                    std::thread::sleep(Duration::from_millis(500));
                    Ok(())
                })
                .unwrap();
        })
        .unwrap();
    registry
        .register("spec/quick_spec", |engine, _modules| {
            engine.case("returns", || Ok(())).unwrap();
        })
        .unwrap();

    let mut runner = SuiteRunner::new(
        registry,
        RunOptions {
            parallel: true,
            workers: 1,
            timeout: Duration::from_millis(50),
            ..Default::default()
        },
    );
    let files: Vec<String> = vec!["spec/hang_spec".into(), "spec/quick_spec".into()];
    let report = runner.run_tests(&files).unwrap();

    assert_eq!(report.files_failed, 1);
    assert_eq!(report.files_passed, 1);
    assert!(!report.success);
}

#[test]
fn suite_report_serializes_for_external_reporters() {
    let registry = registry();
    register_basic_suites(&registry);
    let mut runner = SuiteRunner::new(registry, RunOptions::default());
    let report = runner
        .run_tests(&["spec/pass_spec".to_string()])
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["passes"], 2);
    assert_eq!(json["success"], true);
    assert!(json.get("elapsed").is_some());
    assert!(json.get("files_tested").is_some());
}
