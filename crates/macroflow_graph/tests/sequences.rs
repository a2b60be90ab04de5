//! Integration tests for legacy action sequences and script libraries.

mod test_utils;

use macroflow_adapters::{BBox, Detection, DetectionSnapshot, Frame};
use macroflow_graph::prelude::*;
use serde_json::json;
use test_utils::*;

const GREEN: [u8; 3] = [0, 255, 0];

fn green_square_snapshot() -> DetectionSnapshot {
    let frame = Frame::filled(64, 64, [0, 0, 0]).with_rect(BBox::new(20, 20, 30, 30), GREEN);
    DetectionSnapshot::new(vec![Detection::new("ICON", BBox::new(20, 20, 30, 30), 0.9)])
        .with_frame(frame)
}

fn params(value: serde_json::Value) -> Params {
    Params::from_json(value)
}

// ═══════════════════════════════════════════════════════════════════════════════
// ACTION SEQUENCES
// ═══════════════════════════════════════════════════════════════════════════════

/// Actions run in order, and a failing action does not stop the rest.
#[tokio::test]
async fn sequence_runs_every_action() {
    let text = r#"{
        "name": "warmup",
        "actions": [
            {"type": "key", "params": {"key": "a"}},
            {"params": {"bbox": [0, 0, 10, 10]}},
            {"type": "click", "params": {"mode": "label", "label": "MISSING"}},
            {"type": "sleep", "params": {"seconds": 0}},
            {"type": "loop", "params": {"count": 3}}
        ]
    }"#;
    let sequence = ActionSequence::from_json(text).unwrap();
    assert_eq!(sequence.actions[1].kind, NodeKind::Click);

    let actuator = RecordingActuator::new();
    let results = engine(&actuator)
        .run_sequence(&sequence, &DetectionSnapshot::empty())
        .await;

    assert_eq!(results, [true, true, false, true, false]);
    assert_eq!(actuator.calls(), ["down a", "up a", "move 5 5", "click left"]);
}

/// `find_color` clicks the first matching region unless told not to.
#[tokio::test]
async fn find_color_action_clicks_first_region() {
    let range = json!({"bgr_min": [0, 200, 0], "bgr_max": [50, 255, 50]});
    let mut no_click = range.clone();
    no_click["click"] = json!(false);

    let sequence = ActionSequence::new("colors")
        .with_action(NodeKind::FindColor, params(range))
        .with_action(NodeKind::FindColor, params(no_click));

    let actuator = RecordingActuator::new();
    let results = engine(&actuator)
        .run_sequence(&sequence, &green_square_snapshot())
        .await;

    assert_eq!(results, [true, true]);
    assert_eq!(actuator.calls(), ["move 25 25", "click left"]);
}

/// `verify_image_color` checks the pixel area around a detection without clicking.
#[tokio::test]
async fn verify_image_color_action() {
    let check = |offset: i32| {
        params(json!({
            "template_name": "ICON",
            "offset_x": offset,
            "radius": 2,
            "bgr_min": [0, 200, 0],
            "bgr_max": [50, 255, 50],
        }))
    };
    let sequence = ActionSequence::new("verify")
        .with_action(NodeKind::VerifyImageColor, check(0))
        .with_action(NodeKind::VerifyImageColor, check(20));

    let actuator = RecordingActuator::new();
    let results = engine(&actuator)
        .run_sequence(&sequence, &green_square_snapshot())
        .await;

    assert_eq!(results, [true, false]);
    assert!(actuator.is_untouched());
}

/// Markdown export lists every action.
#[test]
fn sequence_exports_markdown() {
    let sequence = ActionSequence::new("Daily | login")
        .with_action(NodeKind::Key, params(json!({"key": "enter"})))
        .with_action(NodeKind::Sleep, params(json!({"seconds": 1.5})));
    let markdown = sequence.to_markdown().unwrap();

    assert!(markdown.starts_with("# Action Sequence: Daily | login\n"));
    assert!(markdown.contains("| 1 | `key` | `{\"key\":\"enter\"}` |"));
    assert!(markdown.contains("| 2 | `sleep` |"));
    assert!(markdown.contains("```json"));
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCRIPT LIBRARIES
// ═══════════════════════════════════════════════════════════════════════════════

/// A library loaded from disk runs the script it names.
#[tokio::test]
async fn library_scripts_run_after_reload() {
    let mut library = ScriptLibrary::new();
    let mut accept = Graph::new("s1", "accept");
    accept
        .add_node(condition("c", "OK", "k", ""))
        .add_node(key("k", "enter"));
    library.insert(accept);
    library.insert(chain(&["x", "y"]));

    let path = std::env::temp_dir().join(format!("macroflow-lib-{}.json", std::process::id()));
    library.save(&path).unwrap();
    let reloaded = ScriptLibrary::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(reloaded.names().collect::<Vec<_>>(), ["accept", "chain"]);
    let script = reloaded.get("accept").unwrap();
    let actuator = RecordingActuator::new();
    let report = engine(&actuator)
        .execute(script, snapshot_with(&["OK"]), RunOptions::new())
        .await
        .unwrap();
    assert_eq!(ids(&report.visited), ["c", "k"]);
}

/// Duplicating a library script renumbers its nodes and keeps it runnable.
#[tokio::test]
async fn duplicated_library_script_is_valid() {
    let mut library = ScriptLibrary::new();
    let mut graph = loop_graph(2);
    graph.name = "farm".into();
    library.insert(graph);

    let copy = library.duplicate("farm", "farm copy").unwrap().clone();
    assert!(copy.validate().is_ok());
    assert_eq!(library.len(), 2);

    let actuator = RecordingActuator::new();
    let report = engine(&actuator)
        .execute(&copy, DetectionSnapshot::empty(), RunOptions::new())
        .await
        .unwrap();
    assert_eq!(report.steps, 6);
}
