//! Console rendering of test reports.

use crate::diagnostics::{Diagnostic, Severity};
use crate::runner::TestReport;
use crate::value::{AttributePath, PathStep};

/// Render one case: header, optional plan text, then one line per diagnostic
pub fn render_report(report: &TestReport) -> String {
    let mut output = format!("🏷  {}\n", report.name);
    if let Some(plan) = &report.plan {
        output.push_str(plan);
        if !plan.ends_with('\n') {
            output.push('\n');
        }
    }
    for diagnostic in &report.diagnostics {
        output.push_str(&render_diagnostic(diagnostic));
        output.push('\n');
    }
    output
}

/// Render a single diagnostic line, without the trailing newline
pub fn render_diagnostic(diagnostic: &Diagnostic) -> String {
    if let Some(path) = &diagnostic.path {
        let full = full_path(&diagnostic.summary, path);
        let (marker, separator) = match diagnostic.severity {
            Severity::Info => ("✔", "="),
            Severity::Warning => ("⚠", ":"),
            Severity::Error => ("❌", ":"),
        };
        return if full.is_empty() {
            format!(" {}  {}", marker, diagnostic.detail)
        } else {
            format!(" {}  {} {} {}", marker, full, separator, diagnostic.detail)
        };
    }

    let mut line = match diagnostic.severity {
        Severity::Warning => String::from(" ⚠  "),
        _ => String::new(),
    };
    if let Some(location) = &diagnostic.location {
        line.push_str(&format!("{} : ", location));
    }
    if !diagnostic.summary.is_empty() {
        line.push_str(&format!("{} : ", diagnostic.summary));
    }
    line.push_str(&diagnostic.detail);
    line
}

/// `target.path`, with index steps attached directly to the target
fn full_path(target: &str, path: &AttributePath) -> String {
    match path.steps().first() {
        None => target.to_string(),
        Some(_) if target.is_empty() => path.to_string(),
        Some(PathStep::Index(_)) => format!("{}{}", target, path),
        Some(PathStep::Attr(_)) => format!("{}.{}", target, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::token::SourceLocation;
    use crate::runner::Stage;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn path() -> AttributePath {
        AttributePath::root().attr("rule").index(2).attr("tags").attr("env")
    }

    #[test]
    fn test_info_and_error_lines() {
        let ok = Diagnostic::matched(AttributePath::root().attr("ami"), "ami-123")
            .with_summary("aws_instance.web");
        assert_eq!(render_diagnostic(&ok), " ✔  aws_instance.web.ami = ami-123");

        let bad = Diagnostic::mismatch(path(), "Expected value prod but got dev")
            .with_summary("aws_security_group.sg");
        assert_eq!(
            render_diagnostic(&bad),
            " ❌  aws_security_group.sg.rule[2].tags.env : Expected value prod but got dev"
        );
    }

    #[test]
    fn test_root_and_index_paths() {
        let missing = Diagnostic::mismatch(AttributePath::root(), "aws_instance.missing is not present in the plan")
            .with_summary("aws_instance.missing");
        assert_eq!(
            render_diagnostic(&missing),
            " ❌  aws_instance.missing : aws_instance.missing is not present in the plan"
        );

        let indexed = Diagnostic::matched(AttributePath::root().index(0), "80").with_summary("output.ports");
        assert_eq!(render_diagnostic(&indexed), " ✔  output.ports[0] = 80");

        let bare = Diagnostic::matched(AttributePath::root(), "x");
        assert_eq!(render_diagnostic(&bare), " ✔  x");
    }

    #[test]
    fn test_located_diagnostic() {
        let location = SourceLocation::new(Some(PathBuf::from("spec/web/web.tfspec")), 3, 5, 0, 1);
        let diag = Diagnostic::error("Unsupported argument", "an argument named \"amis\" is not expected here")
            .with_location(location);
        assert_eq!(
            render_diagnostic(&diag),
            "spec/web/web.tfspec#3,5 : Unsupported argument : an argument named \"amis\" is not expected here"
        );
        assert_eq!(render_diagnostic(&Diagnostic::error("", "boom")), "boom");
    }

    #[test]
    fn test_warning_without_path_keeps_marker() {
        let location = SourceLocation::new(Some(PathBuf::from("web.tfspec")), 7, 1, 0, 4);
        let diag = Diagnostic::warning("Duplicate mock", "data.aws_ami.x is mocked more than once; the last declaration wins")
            .with_location(location);
        assert_eq!(
            render_diagnostic(&diag),
            " ⚠  web.tfspec#7,1 : Duplicate mock : data.aws_ami.x is mocked more than once; the last declaration wins"
        );
    }

    #[test]
    fn test_render_report() {
        let report = TestReport {
            name: "web".to_string(),
            diagnostics: vec![
                Diagnostic::warning("Unused mock", "mock for data.aws_ami.x is not used by the configuration"),
                Diagnostic::matched(AttributePath::root().attr("ami"), "ami-123").with_summary("aws_instance.web"),
            ],
            plan: Some("Terraform will perform the following actions:".to_string()),
            stage: Stage::Validated,
        };
        assert_eq!(
            render_report(&report),
            "🏷  web\n\
             Terraform will perform the following actions:\n \
             ⚠  Unused mock : mock for data.aws_ami.x is not used by the configuration\n \
             ✔  aws_instance.web.ami = ami-123\n"
        );
    }
}
