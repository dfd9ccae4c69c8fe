use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use toolbind::{
    ErrorKind, FunctionDoc, InvokeError, Json, RegistrationError, RegistryConfig, Scope,
    StaticDocs, ToolArg, ToolRegistry, tool, tool_id,
};

static CALLS: AtomicUsize = AtomicUsize::new(0);

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

/// A point on the plane.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, ToolArg)]
struct Point {
    /// Horizontal offset
    x: i32,
    /// Vertical offset
    y: i32,
    #[serde(rename = "tag")]
    label: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, ToolArg)]
#[serde(rename_all = "snake_case")]
enum Direction {
    North,
    SouthWest,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, ToolArg)]
enum Mode {
    #[tool_arg(rename = "fast")]
    Quick,
    Slow,
}

#[derive(Debug, Deserialize, ToolArg)]
struct Job {
    id: u32,
    mode: Mode,
}

#[derive(Debug, Deserialize, ToolArg)]
struct Node {
    name: String,
    children: Vec<Node>,
}

#[derive(Debug)]
struct Refused;

impl fmt::Display for Refused {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("refused")
    }
}

impl std::error::Error for Refused {}

/// Adds two numbers
/// a: the first number
/// b: the second number
#[tool]
fn add(a: i64, b: i64) -> i64 {
    CALLS.fetch_add(1, Ordering::SeqCst);
    a + b
}

/// Moves a point one step
/// point: where to start
/// direction: which way to go
#[tool]
fn step(point: Point, direction: Direction) -> Json<Point> {
    let (dx, dy) = match direction {
        Direction::North => (0, 1),
        Direction::SouthWest => (-1, -1),
    };
    Json(Point {
        x: point.x + dx,
        y: point.y + dy,
        ..point
    })
}

/// Sums the corners of a triangle
/// corners: exactly three values
#[tool]
fn triangle(corners: [u8; 3]) -> u32 {
    corners.iter().map(|&c| u32::from(c)).sum()
}

/// Fails on request
/// fail: whether to refuse
#[tool]
fn maybe(fail: bool) -> Result<String, Refused> {
    if fail { Err(Refused) } else { Ok("done".into()) }
}

/// Records nothing
/// note: ignored
#[tool]
fn record(note: String) -> Result<(), Refused> {
    drop(note);
    Ok(())
}

/// Schedules a job
/// job: what to run
/// fallback: mode for the next job
#[tool]
fn schedule(job: Job, fallback: Mode) -> String {
    format!("{}:{:?}:{:?}", job.id, job.mode, fallback)
}

fn registry() -> ToolRegistry {
    let mut registry = ToolRegistry::from_inventory(Scope::new());
    registry.add(tool_id!(add), add).unwrap();
    registry.add(tool_id!(step), step).unwrap();
    registry.add(tool_id!(triangle), triangle).unwrap();
    registry.add(tool_id!(maybe), maybe).unwrap();
    registry.add(tool_id!(record), record).unwrap();
    registry.add(tool_id!(schedule), schedule).unwrap();
    registry
}

#[test]
fn string_arguments_are_coerced_to_parameter_types() {
    let registry = registry();
    let out = registry
        .invoke(None, "add", args(json!({ "a": "3", "b": 4 })))
        .unwrap();
    assert_eq!(out, Some(json!(7)));
}

#[test]
fn schema_uses_doc_comments() {
    let registry = registry();
    let schema = registry.get("step").unwrap().schema();
    let json = serde_json::to_value(schema).unwrap();

    assert_eq!(json["function"]["description"], "Moves a point one step");
    let parameters = &json["function"]["parameters"];
    assert_eq!(parameters["required"], json!(["point", "direction"]));
    assert_eq!(
        parameters["properties"]["point"],
        json!({
            "type": "object",
            "description": "where to start",
            "properties": {
                "x": { "type": "integer", "description": "Horizontal offset" },
                "y": { "type": "integer", "description": "Vertical offset" },
                "tag": { "type": "string" }
            }
        })
    );
    assert_eq!(
        parameters["properties"]["direction"],
        json!({
            "type": "string",
            "description": "which way to go",
            "enum": ["north", "south_west"]
        })
    );
}

#[test]
fn structs_and_enums_convert_from_loose_input() {
    let registry = registry();
    let out = registry
        .invoke(
            None,
            "step",
            args(json!({
                "point": { "x": "2", "tag": "home" },
                "direction": "south_west"
            })),
        )
        .unwrap();
    assert_eq!(out, Some(json!({ "x": 1, "y": -1, "tag": "home" })));

    let err = registry
        .invoke(
            None,
            "step",
            args(json!({ "point": {}, "direction": "east" })),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn unknown_struct_keys_are_rejected() {
    let registry = registry();
    let err = registry
        .invoke(
            None,
            "step",
            args(json!({ "point": { "x": 1, "extra": true }, "direction": "north" })),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedArgument);
    assert!(err.to_string().contains("extra"), "{err}");
}

#[test]
fn missing_and_unexpected_arguments_never_reach_the_function() {
    let registry = registry();
    let before = CALLS.load(Ordering::SeqCst);

    let err = registry
        .invoke(None, "add", args(json!({ "a": 1 })))
        .unwrap_err();
    assert!(matches!(err, InvokeError::MissingArgument { ref name } if name == "b"));

    let err = registry
        .invoke(None, "add", args(json!({ "a": 1, "b": 2, "c": 3 })))
        .unwrap_err();
    assert!(matches!(err, InvokeError::UnexpectedArgument { ref name } if name == "c"));
    assert!(err.is_caller_error());

    assert_eq!(CALLS.load(Ordering::SeqCst), before);
}

#[test]
fn fixed_length_arrays_check_their_length() {
    let registry = registry();
    assert_eq!(
        registry
            .invoke(None, "triangle", args(json!({ "corners": [1, "2", 3] })))
            .unwrap(),
        Some(json!(6))
    );

    let err = registry
        .invoke(None, "triangle", args(json!({ "corners": [1, 2] })))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LengthMismatch);
}

#[test]
fn function_errors_surface_as_execution_failures() {
    let registry = registry();
    assert_eq!(
        registry
            .invoke(None, "maybe", args(json!({ "fail": "false" })))
            .unwrap(),
        Some(json!("done"))
    );

    let err = registry
        .invoke(None, "maybe", args(json!({ "fail": true })))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(err.to_string(), "refused");
    assert!(!err.is_caller_error());

    assert_eq!(
        registry
            .invoke(None, "record", args(json!({ "note": "hi" })))
            .unwrap(),
        None
    );
}

#[test]
fn non_string_map_keys_fail_registration() {
    let mut registry = ToolRegistry::new(Scope::new(), StaticDocs::new());
    let err = registry
        .add_documented(
            "lookup",
            &FunctionDoc::new("Looks up by number").param("table", ""),
            |table: HashMap<i64, String>| table.len(),
        )
        .unwrap_err();
    assert!(
        matches!(
            err,
            RegistrationError::Parameter { ref parameter, ref source, .. }
                if parameter == "table"
                    && matches!(**source, RegistrationError::NonStringMapKey { .. })
        ),
        "{err}"
    );
    assert!(registry.is_empty());
}

#[test]
fn groups_qualify_names() {
    let mut registry = ToolRegistry::from_inventory(Scope::new())
        .with_config(RegistryConfig::new().with_group_separator("_"))
        .unwrap();
    registry.group("math").add(tool_id!(add), add).unwrap();

    assert!(registry.contains("math_add"));
    let json = registry.schema_json().unwrap();
    assert_eq!(json[0]["function"]["name"], "math_add");
    assert_eq!(
        registry
            .invoke(None, "math_add", args(json!({ "a": 2, "b": 2 })))
            .unwrap(),
        Some(json!(4))
    );
}

#[test]
fn renamed_variants_convert_inside_structs() {
    let registry = registry();
    let json = serde_json::to_value(registry.get("schedule").unwrap().schema()).unwrap();
    assert_eq!(
        json["function"]["parameters"]["properties"]["fallback"]["enum"],
        json!(["fast", "Slow"])
    );

    let out = registry
        .invoke(
            None,
            "schedule",
            args(json!({ "job": { "id": 1, "mode": "fast" }, "fallback": "fast" })),
        )
        .unwrap();
    assert_eq!(out, Some(json!("1:Quick:Quick")));

    let out = registry
        .invoke(
            None,
            "schedule",
            args(json!({ "job": { "id": "2" }, "fallback": "Slow" })),
        )
        .unwrap();
    assert_eq!(out, Some(json!("2:Quick:Slow")));

    let err = registry
        .invoke(
            None,
            "schedule",
            args(json!({ "job": { "id": 3, "mode": "Quick" }, "fallback": "fast" })),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn self_referential_types_fail_registration() {
    let mut registry = ToolRegistry::new(Scope::new(), StaticDocs::new());
    let err = registry
        .add_documented(
            "walk",
            &FunctionDoc::new("Walks a tree").param("root", ""),
            |root: Node| format!("{}:{}", root.name, root.children.len()),
        )
        .unwrap_err();
    assert!(
        matches!(
            err,
            RegistrationError::Parameter { ref source, .. }
                if matches!(**source, RegistrationError::UnsupportedType { kind: "recursive", .. })
        ),
        "{err}"
    );
    assert!(registry.is_empty());
}
