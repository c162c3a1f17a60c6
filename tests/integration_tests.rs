//! Integration tests for terraspec
//!
//! These tests drive the complete pipeline, from case discovery to rendered
//! report, against the scripted engine.

use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use terraspec::{
    find_cases, parse_spec, render_report, run_all, run_case, validate, AttrType, BlockSchema,
    DataSourceAddress, Diagnostic, Engine, Nesting, Plan, PlanAccessor, ResourceAddress, RunOptions,
    SchemaRegistry, Script, ScriptedEngine, Severity, Stage, Value,
};

fn schemas() -> SchemaRegistry {
    SchemaRegistry::new()
        .with_resource(
            "aws_instance",
            BlockSchema::new()
                .attribute("ami", AttrType::String)
                .attribute("instance_type", AttrType::String)
                .attribute("cpu_core_count", AttrType::Number)
                .attribute("user_data", AttrType::String)
                .attribute("tags", AttrType::map(AttrType::String))
                .block(
                    "ebs_block_device",
                    Nesting::Set,
                    BlockSchema::new()
                        .attribute("device_name", AttrType::String)
                        .attribute("volume_size", AttrType::Number),
                ),
        )
        .with_data_source("aws_ami", BlockSchema::new().attribute("id", AttrType::String))
}

fn web() -> ResourceAddress {
    ResourceAddress::new("aws_instance", "web")
}

fn ubuntu() -> DataSourceAddress {
    DataSourceAddress::new("aws_ami", "ubuntu")
}

fn web_value() -> Value {
    Value::map([
        ("instance_type", Value::string("t3.micro")),
        ("cpu_core_count", Value::number(5)),
        ("user_data", Value::string("05")),
        ("tags", Value::map([("env", Value::string("prod"))])),
        (
            "ebs_block_device",
            Value::BlockSet(vec![
                [
                    ("device_name".to_string(), Value::string("/dev/sdb")),
                    ("volume_size".to_string(), Value::number(10)),
                ]
                .into_iter()
                .collect(),
                [
                    ("device_name".to_string(), Value::string("/dev/sdc")),
                    ("volume_size".to_string(), Value::number(20)),
                ]
                .into_iter()
                .collect(),
            ]),
        ),
    ])
}

fn script() -> Script {
    Script::new(schemas())
        .resource(web(), web_value())
        .data_source(ubuntu(), None)
        .bind(web(), "ami", ubuntu(), "id")
        .output("public_ip", Value::string("10.0.0.1"))
}

fn plan() -> Plan {
    let mut plan = Plan::new();
    let mut value = web_value();
    if let Value::Map(map) = &mut value {
        map.insert("ami".to_string(), Value::string("ami-123"));
    }
    plan.insert_resource(web(), value);
    plan.insert_output("public_ip", Value::string("10.0.0.1"));
    plan
}

/// Validate spec source against the fixed plan, rendering each diagnostic
/// as `severity path detail`
fn check(source: &str) -> Vec<String> {
    let registry = schemas().with_output("public_ip");
    let (spec, parse_diags) = parse_spec(source, None, &registry);
    assert!(parse_diags.is_empty(), "unexpected parse diagnostics: {:?}", parse_diags);
    let plan = plan();
    validate(&spec, &PlanAccessor::new(&plan, &registry))
        .iter()
        .map(|d| {
            let path = d.path.as_ref().map(|p| p.to_string()).unwrap_or_default();
            format!("{} {} {}", d.severity, path, d.detail)
        })
        .collect()
}

fn write_case(root: &Path, name: &str, spec: &str, vars: bool) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{}.tfspec", name)), spec).unwrap();
    if vars {
        fs::write(dir.join(format!("{}.tfvars", name)), "instance_type = \"t3.micro\"\n").unwrap();
    }
}

const WEB_SPEC: &str = r#"
mock "aws_ami" "ubuntu" {
  id = "ami-123"
}

assert "aws_instance" "web" {
  ami           = "ami-123"
  instance_type = "t3.micro"
}

assert "output" "public_ip" {
  value = "10.0.0.1"
}
"#;

// --- Matching properties ---

#[test]
fn test_empty_expectation_always_passes() {
    assert_eq!(check("assert \"aws_instance\" \"web\" {}\n"), Vec::<String>::new());
}

#[test]
fn test_single_attribute_match_and_mismatch() {
    assert_eq!(
        check("assert \"aws_instance\" \"web\" {\n  ami = \"ami-123\"\n}\n"),
        vec!["info ami \"ami-123\""]
    );
    assert_eq!(
        check("assert \"aws_instance\" \"web\" {\n  ami = \"ami-999\"\n}\n"),
        vec!["error ami Expected value \"ami-999\" but got \"ami-123\""]
    );
}

#[test]
fn test_numbers_compare_by_declared_type() {
    let diags = check("assert \"aws_instance\" \"web\" {\n  cpu_core_count = \"5\"\n  user_data = \"5\"\n}\n");
    assert_eq!(diags.len(), 2);
    assert!(diags[0].starts_with("info cpu_core_count"));
    assert!(diags[1].starts_with("error user_data"));
}

#[test]
fn test_block_length_mismatch_is_reported_once() {
    let diags = check(
        r#"
assert "aws_instance" "web" {
  ebs_block_device {
    volume_size = 10
  }
}
"#,
    );
    assert_eq!(diags, vec!["error ebs_block_device Expected 1 elements but got 2"]);
}

#[test]
fn test_nested_block_paths() {
    let diags = check(
        r#"
assert "aws_instance" "web" {
  ebs_block_device {
    volume_size = 10
  }
  ebs_block_device {
    volume_size = 30
  }
  tags = {
    env = "prod"
  }
}
"#,
    );
    assert_eq!(
        diags,
        vec![
            "info ebs_block_device[0].volume_size 10",
            "error ebs_block_device[1].volume_size Expected value 30 but got 20",
            "info tags.env \"prod\"",
        ]
    );
}

#[test]
fn test_missing_resource_is_one_error_at_root() {
    let diags = check("assert \"aws_instance\" \"missing\" {\n  ami = \"x\"\n}\n");
    assert_eq!(diags, vec!["error  aws_instance.missing is not present in the plan"]);
}

#[test]
fn test_validation_is_repeatable() {
    let source = "assert \"aws_instance\" \"web\" {\n  ami = \"ami-999\"\n  instance_type = \"t3.micro\"\n}\n";
    assert_eq!(check(source), check(source));
}

// --- Pipeline ---

#[test]
fn test_case_report_renders() {
    let root = tempfile::tempdir().unwrap();
    write_case(root.path(), "web", WEB_SPEC, false);
    let cases = find_cases(root.path()).unwrap();
    assert_eq!(cases.len(), 1);

    let report = run_case(&ScriptedEngine::new(script()), &cases[0], &RunOptions::default());
    assert_eq!(report.stage, Stage::Validated);
    assert_eq!(
        render_report(&report),
        "🏷  web\n \
         ✔  aws_instance.web.ami = \"ami-123\"\n \
         ✔  aws_instance.web.instance_type = \"t3.micro\"\n \
         ✔  output.public_ip.value = \"10.0.0.1\"\n"
    );
}

#[test]
fn test_display_plan_includes_rendered_text() {
    let root = tempfile::tempdir().unwrap();
    write_case(root.path(), "web", WEB_SPEC, false);
    let cases = find_cases(root.path()).unwrap();
    let options = RunOptions {
        display_plan: true,
        ..RunOptions::default()
    };
    let report = run_case(&ScriptedEngine::new(script()), &cases[0], &options);
    let rendered = render_report(&report);
    assert!(rendered.contains("# aws_instance.web will be created"));
    assert!(rendered.contains("Changes to Outputs:"));
}

#[test]
fn test_mock_value_reaches_plan() {
    let root = tempfile::tempdir().unwrap();
    let spec = WEB_SPEC.replace("id = \"ami-123\"", "id = \"ami-456\"");
    write_case(root.path(), "web", &spec, false);
    let cases = find_cases(root.path()).unwrap();
    let report = run_case(&ScriptedEngine::new(script()), &cases[0], &RunOptions::default());
    let errors: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.detail.clone())
        .collect();
    assert_eq!(errors, vec!["Expected value \"ami-123\" but got \"ami-456\""]);
}

#[test]
fn test_unknown_attribute_suggests_name() {
    let root = tempfile::tempdir().unwrap();
    let spec = r#"
assert "aws_instance" "web" {
  amis = "x"

  mock "aws_ami" "ubuntu" {
    id = "ami-123"
  }
}
"#;
    write_case(root.path(), "typo", spec, false);
    let cases = find_cases(root.path()).unwrap();
    let report = run_case(&ScriptedEngine::new(script()), &cases[0], &RunOptions::default());
    assert_eq!(report.stage, Stage::Validated);
    assert!(report.has_errors());
    let rendered = render_report(&report);
    assert!(rendered.contains("unknown attribute amis (did you mean 'ami'?)"), "{}", rendered);
}

#[tokio::test]
async fn test_failing_case_does_not_hide_passing_case() {
    let root = tempfile::tempdir().unwrap();
    write_case(root.path(), "broken", WEB_SPEC, true);
    write_case(root.path(), "working", WEB_SPEC, false);

    let engine: Arc<dyn Engine> = Arc::new(ScriptedEngine::new(script()).with_vars(
        "broken.tfvars",
        script().fail_plan(Diagnostic::error("Invalid reference", "var.size is not declared")),
    ));
    let cases = find_cases(root.path()).unwrap();

    let mut printed = Vec::new();
    let summary = run_all(engine, cases, Arc::new(RunOptions::default()), |report| {
        printed.push(render_report(report))
    })
    .await
    .unwrap();

    assert_eq!(summary.exit_code(), 1);
    assert_eq!(printed.len(), 2);

    let mut by_name: Vec<_> = summary.reports.iter().map(|r| (r.name.as_str(), r.has_errors())).collect();
    by_name.sort();
    assert_eq!(by_name, vec![("broken", true), ("working", false)]);

    let broken = summary.reports.iter().find(|r| r.name == "broken").unwrap();
    assert_eq!(broken.stage, Stage::Refreshed);
    assert_eq!(broken.diagnostics.len(), 1);
    assert!(printed.iter().any(|p| p.contains("Invalid reference : var.size is not declared")));
}

#[tokio::test]
async fn test_all_passing_run_succeeds() {
    let root = tempfile::tempdir().unwrap();
    write_case(root.path(), "a", WEB_SPEC, false);
    write_case(root.path(), "b", WEB_SPEC, false);
    fs::write(root.path().join("root.tfspec"), WEB_SPEC).unwrap();

    let cases = find_cases(root.path()).unwrap();
    assert_eq!(cases.len(), 3);
    let summary = run_all(
        Arc::new(ScriptedEngine::new(script())),
        cases,
        Arc::new(RunOptions::default()),
        |_| {},
    )
    .await
    .unwrap();
    assert_eq!(summary.reports.len(), 3);
    assert_eq!(summary.exit_code(), 0);
}
