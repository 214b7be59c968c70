// CLI integration tests for convert, inspect, and browse flows.
use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};

use serde_json::{Value, json};

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_platestream");
    Command::new(exe)
}

fn parse_json(value: &str) -> Value {
    serde_json::from_str(value).expect("valid json")
}

fn parse_json_line(output: &[u8]) -> Value {
    let text = String::from_utf8_lossy(output);
    let line = text.lines().next().expect("json line");
    parse_json(line)
}

fn plates_json() -> String {
    (0..3)
        .map(|n| {
            json!({
                "kind": "plate",
                "label": format!("Plate1-{n}"),
                "rows": 2,
                "columns": 3,
                "children": [
                    {"kind": "well", "index": {"row": 0, "column": 1}, "values": [n as f64 + 0.5]},
                    {"kind": "well", "index": {"row": 1, "column": 3}, "values": [-1.0]}
                ]
            })
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn convert_json_to_plate_map_and_back() {
    let temp = tempfile::tempdir().expect("tempdir");
    let input = temp.path().join("plates.json");
    let grid = temp.path().join("plates.txt");
    let back = temp.path().join("back.json");
    fs::write(&input, plates_json()).expect("write input");

    let convert = cmd()
        .args(["convert", input.to_str().unwrap(), "--to", "plate-map"])
        .args(["--out-delimiter", "semicolon", "-o", grid.to_str().unwrap()])
        .output()
        .expect("convert");
    assert!(convert.status.success(), "{}", String::from_utf8_lossy(&convert.stderr));
    let text = fs::read_to_string(&grid).expect("grid");
    assert!(text.starts_with("Plate1-0\n;1;2;3\nA;0.5;-;-\nB;-;-;-1\n\nPlate1-1\n"));

    let convert = cmd()
        .args(["convert", grid.to_str().unwrap(), "--from", "plate-map"])
        .args(["--in-delimiter", "semicolon", "--to", "json", "-o", back.to_str().unwrap()])
        .output()
        .expect("convert back");
    assert!(convert.status.success());
    let original: Vec<Value> = plates_json().lines().map(parse_json).collect();
    let round: Vec<Value> = fs::read_to_string(&back)
        .expect("back")
        .lines()
        .map(parse_json)
        .collect();
    assert_eq!(round.len(), 3);
    for (round, original) in round.iter().zip(&original) {
        assert_eq!(round["label"], original["label"]);
        assert_eq!(round["children"], original["children"]);
        assert_eq!(round["type"], "6");
    }
}

#[test]
fn convert_reads_stdin_and_writes_stdout() {
    let mut child = cmd()
        .args(["convert", "-", "--from", "result-table", "--to", "xml"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"TestLabel\nA1\t1.5\nB2\t3\n")
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "<set label=\"TestLabel\"><well row=\"0\" column=\"1\"><value>1.5</value></well>\
         <well row=\"1\" column=\"2\"><value>3</value></well></set>\n"
    );
}

#[test]
fn inspect_summarizes_records() {
    let temp = tempfile::tempdir().expect("tempdir");
    let input = temp.path().join("plates.json");
    fs::write(&input, plates_json()).expect("write input");

    let inspect = cmd()
        .args(["inspect", input.to_str().unwrap()])
        .output()
        .expect("inspect");
    assert!(inspect.status.success());
    let summary = parse_json_line(&inspect.stdout);
    assert_eq!(summary["format"], "json");
    assert_eq!(summary["kind"], "plate");
    assert_eq!(summary["count"], 3);
    assert_eq!(summary["records"][2]["label"], "Plate1-2");
    assert_eq!(summary["records"][0]["wells"], 2);
}

#[test]
fn browse_walks_forward_then_back() {
    let temp = tempfile::tempdir().expect("tempdir");
    let input = temp.path().join("plates.json");
    fs::write(&input, plates_json()).expect("write input");

    let browse = cmd()
        .args(["browse", input.to_str().unwrap(), "--reverse"])
        .output()
        .expect("browse");
    assert!(browse.status.success());
    let lines: Vec<String> = String::from_utf8_lossy(&browse.stdout)
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(
        lines,
        [
            "Plate1-0", "Plate1-1", "Plate1-2", "Plate1-2", "Plate1-1", "Plate1-0"
        ]
    );
}

#[test]
fn empty_input_converts_to_nothing() {
    let temp = tempfile::tempdir().expect("tempdir");
    let input = temp.path().join("empty.xml");
    fs::write(&input, "<?xml version=\"1.0\"?>\n").expect("write input");
    let convert = cmd()
        .args(["convert", input.to_str().unwrap(), "--to", "json"])
        .output()
        .expect("convert");
    assert!(convert.status.success());
    assert!(convert.stdout.is_empty());
}

#[test]
fn malformed_input_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let input = temp.path().join("grid.txt");
    fs::write(&input, "\t1\t2\nA\t1\nB\t1\t2\n").expect("write input");

    let output = cmd()
        .args(["inspect", input.to_str().unwrap(), "--from", "plate-map"])
        .output()
        .expect("inspect");
    assert_eq!(output.status.code(), Some(4));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Malformed");
    assert_eq!(err["error"]["line"], 2);
    assert!(
        err["error"]["path"]
            .as_str()
            .unwrap()
            .ends_with("grid.txt")
    );
}

#[test]
fn missing_input_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let input = temp.path().join("nope.json");
    let output = cmd()
        .args(["inspect", input.to_str().unwrap()])
        .output()
        .expect("inspect");
    assert_eq!(output.status.code(), Some(3));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Io");
    assert!(err["error"]["hint"].as_str().is_some());
}

#[test]
fn usage_exit_code() {
    let output = cmd()
        .args(["convert", "grid.txt", "--to", "json"])
        .output()
        .expect("convert");
    assert_eq!(output.status.code(), Some(2));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
    assert!(err["error"]["message"].as_str().unwrap().contains("grid.txt"));

    let output = cmd()
        .args(["convert", "a.json", "--to", "bogus"])
        .output()
        .expect("convert");
    assert_eq!(output.status.code(), Some(2));

    let temp = tempfile::tempdir().expect("tempdir");
    let input = temp.path().join("stack.json");
    fs::write(&input, "{\"kind\":\"stack\",\"rows\":1,\"columns\":1}").expect("write input");
    let output = cmd()
        .args(["convert", input.to_str().unwrap(), "--to", "plate-map"])
        .output()
        .expect("convert");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn integers_flag_keeps_large_values_exact() {
    let temp = tempfile::tempdir().expect("tempdir");
    let input = temp.path().join("results.txt");
    fs::write(&input, "big\nA1\t9007199254740993\n").expect("write input");

    let output = cmd()
        .args(["convert", input.to_str().unwrap(), "--from", "result-table"])
        .args(["--to", "result-table", "--integers"])
        .output()
        .expect("convert");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "big\nA1\t9007199254740993\n"
    );

    let output = cmd()
        .args(["inspect", input.to_str().unwrap(), "--from", "result-table", "--integers"])
        .output()
        .expect("inspect");
    assert!(output.status.success());
    assert_eq!(parse_json_line(&output.stdout)["records"][0]["wells"], 1);

    fs::write(&input, "A1\t1.5\n").expect("write input");
    let output = cmd()
        .args(["convert", input.to_str().unwrap(), "--from", "result-table"])
        .args(["--to", "json", "--integers"])
        .output()
        .expect("convert");
    assert_eq!(output.status.code(), Some(4));
}
