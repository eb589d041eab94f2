use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use crucible::engine::{Phase, ProgressSink, ProgressUpdate};
use crucible::{CallContext, Engine, EngineConfig, ExecFailure};

fn engine() -> Engine {
    Engine::new(EngineConfig::default())
}

fn engine_with(config: EngineConfig) -> Engine {
    Engine::new(config)
}

fn ctx(caller: &str) -> CallContext {
    CallContext::for_caller(caller)
}

#[tokio::test]
async fn test_denylist_blocks_and_reports_every_match() {
    let engine = engine();
    let caller = ctx("blocked");

    let report = engine.execute("exec(os.thing)", "", &caller).await;
    match report.failure {
        Some(ExecFailure::Validation(matches)) => {
            assert_eq!(matches, vec!["os.".to_string(), "exec(".to_string()]);
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
    assert!(report.output.is_empty());
    // no attempt happened, so the counter is untouched
    assert_eq!(report.count, 0);

    let clean = engine.execute("x = 1", "", &caller).await;
    assert!(clean.failure.is_none());
    assert_eq!(clean.count, 1);
}

#[tokio::test]
async fn test_sandbox_off_allows_denylisted_text() {
    let engine = engine_with(EngineConfig {
        sandbox_mode: false,
        ..EngineConfig::default()
    });
    let report = engine
        .execute("s = \"exec(os.thing)\"\nprint(s)", "", &ctx("open"))
        .await;
    assert!(report.failure.is_none());
    assert_eq!(report.output, "exec(os.thing)\n");
}

#[tokio::test]
async fn test_output_capture_and_truncation() {
    let engine = engine_with(EngineConfig {
        max_output_chars: 100,
        ..EngineConfig::default()
    });
    let caller = ctx("printer");

    let short = engine.run("print(\"hello\")", "", &caller).await;
    assert!(short.contains("hello"));
    assert!(!short.contains("truncated"));

    let long_snippet = "s = \"\"\nfor i in range(150) { s = s + \"x\" }\nprint(s)";
    let long = engine.run(long_snippet, "", &caller).await;
    assert!(long.contains("... truncated (150 total chars)"));
}

#[tokio::test]
async fn test_persistence_is_selective() {
    let engine = engine();
    let caller = ctx("saver");

    let report = engine.execute("x = 1; y = 2", "x", &caller).await;
    assert!(report.failure.is_none());
    assert_eq!(report.saved, vec!["x".to_string()]);

    let later = engine.execute("print(x)", "", &caller).await;
    assert!(later.failure.is_none());
    assert_eq!(later.output, "1\n");

    let missing = engine.execute("print(y)", "", &caller).await;
    match missing.failure {
        Some(ExecFailure::Runtime(diagnostic)) => {
            assert!(diagnostic.contains("undefined variable `y`"), "{}", diagnostic);
        }
        other => panic!("expected runtime failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_underscore_names_never_persist() {
    let engine = engine();
    let caller = ctx("underscore");

    let report = engine.execute("a = 1\n_b = 2", "a,_b", &caller).await;
    assert_eq!(report.saved, vec!["a".to_string()]);
    assert!(!engine.view_state(&caller).contains("_b"));
}

#[tokio::test]
async fn test_callers_are_isolated() {
    let engine = engine();
    let alice = ctx("alice");
    let bob = ctx("bob");

    engine
        .execute("secret = \"s3cr3t\"", "secret", &alice)
        .await;

    assert_eq!(engine.view_state(&bob), "No saved variables.");
    let report = engine.execute("print(secret)", "", &bob).await;
    assert!(matches!(report.failure, Some(ExecFailure::Runtime(_))));
    assert!(engine.view_state(&alice).contains("secret"));
}

#[tokio::test]
async fn test_reset_is_idempotent() {
    let engine = engine();
    let caller = ctx("resetter");

    engine.execute("x = 1", "x", &caller).await;
    assert_eq!(engine.reset(&caller), 1);
    assert_eq!(engine.reset(&caller), 0);

    let report = engine.execute("y = 2", "", &caller).await;
    // counter restarted from zero after the reset
    assert_eq!(report.count, 1);
}

#[tokio::test]
async fn test_timeout_reports_and_skips_persistence() {
    let engine = engine_with(EngineConfig {
        max_execution_secs: 1,
        ..EngineConfig::default()
    });
    let caller = ctx("spinner");

    let report = engine
        .execute("n = 1\nwhile true { n = n + 0 }", "n", &caller)
        .await;
    assert_eq!(
        report.failure,
        Some(ExecFailure::Timeout(Duration::from_secs(1)))
    );
    assert!(report.saved.is_empty());
    assert_eq!(report.count, 1);
    assert_eq!(engine.view_state(&caller), "No saved variables.");
}

#[tokio::test]
async fn test_runtime_failure_keeps_earlier_bindings_persistable() {
    let engine = engine();
    let caller = ctx("partial");

    let report = engine.execute("x = 41\ny = 1 / 0", "x", &caller).await;
    assert!(matches!(report.failure, Some(ExecFailure::Runtime(_))));
    assert_eq!(report.saved, vec!["x".to_string()]);

    let later = engine.execute("print(x)", "", &caller).await;
    assert_eq!(later.output, "41\n");
}

#[tokio::test]
async fn test_quick_stats_property() {
    let engine = engine();
    let caller = ctx("stats");

    let snippet = concat!(
        "s = quick_stats([1, 2, 3, 4])\n",
        "print(s[\"count\"], s[\"sum\"], s[\"mean\"], s[\"min\"], s[\"max\"], s[\"median\"])\n",
        "print(len(quick_stats([])))",
    );
    let report = engine.execute(snippet, "", &caller).await;
    assert!(report.failure.is_none(), "{:?}", report.failure);
    assert_eq!(report.output, "4 10 2.5 1 4 2.5\n0\n");
}

#[tokio::test]
async fn test_as_table_property() {
    let engine = engine();
    let caller = ctx("tables");

    let report = engine
        .execute("as_table([{\"a\": 1, \"b\": 2}])", "", &caller)
        .await;
    assert!(report.failure.is_none(), "{:?}", report.failure);
    let lines: Vec<&str> = report.output.trim_end().lines().collect();
    assert_eq!(lines, vec!["| a | b |", "| - | - |", "| 1 | 2 |"]);

    let empty = engine
        .execute("print(as_table([]))", "", &caller)
        .await;
    assert_eq!(empty.output, "(empty)\n");
}

#[tokio::test]
async fn test_no_output_success_message() {
    let engine = engine();
    let rendered = engine.run("x = 1", "", &ctx("quiet")).await;
    assert!(rendered.contains("Executed successfully (no output)."));
}

#[tokio::test]
async fn test_timing_line_preference() {
    let engine = engine();
    let caller = ctx("timing");

    let rendered = engine.run("x = 1", "", &caller).await;
    assert!(rendered.contains("Execution #1"));

    engine.set_show_timing(&caller, false);
    let rendered = engine.run("x = 2", "", &caller).await;
    assert!(!rendered.contains("Execution #2"));
}

#[derive(Default)]
struct RecordingSink {
    updates: Mutex<Vec<ProgressUpdate>>,
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn notify(&self, update: ProgressUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}

#[tokio::test]
async fn test_progress_event_ordering() {
    let engine = engine();
    let sink = Arc::new(RecordingSink::default());
    let caller = CallContext {
        caller: Some("events".to_string()),
        progress: Some(sink.clone()),
    };

    engine.execute("print(1)", "", &caller).await;
    {
        let updates = sink.updates.lock().unwrap();
        let phases: Vec<(Phase, bool)> =
            updates.iter().map(|u| (u.phase, u.finished)).collect();
        assert_eq!(
            phases,
            vec![
                (Phase::Validating, false),
                (Phase::Running, false),
                (Phase::Done, true),
            ]
        );
    }

    sink.updates.lock().unwrap().clear();
    engine.execute("exec(x)", "", &caller).await;
    {
        let updates = sink.updates.lock().unwrap();
        let phases: Vec<(Phase, bool)> =
            updates.iter().map(|u| (u.phase, u.finished)).collect();
        assert_eq!(
            phases,
            vec![(Phase::Validating, false), (Phase::Blocked, true)]
        );
    }
}

#[tokio::test]
async fn test_state_snapshot_rendering() {
    let engine = engine();
    let caller = ctx("viewer");

    engine
        .execute("total = 42\nxs = [1, 2, 3]", "total,xs", &caller)
        .await;
    let rendered = engine.view_state(&caller);
    assert!(rendered.contains("| name"));
    assert!(rendered.contains("total"));
    assert!(rendered.contains("int"));
    assert!(rendered.contains("[1, 2, 3]"));
}
