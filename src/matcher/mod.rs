//! Partial matching of expected values against a plan.
//!
//! Only what an assertion names is checked: every leaf it mentions yields
//! exactly one diagnostic, `Info` on match and `Error` otherwise, addressed by
//! the [`AttributePath`] from the assertion root. Keys present only in the
//! plan are never visited.

use std::borrow::Cow;
use std::fmt;

use crate::diagnostics::Diagnostic;
use crate::errors::did_you_mean;
use crate::plan::PlanAccessor;
use crate::schema::{AttrType, SchemaNode};
use crate::spec::{Assertion, SpecFile};
use crate::value::{AttributePath, Scalar, Value};

/// Check every assertion of a spec file, in order
pub fn validate(spec: &SpecFile, accessor: &PlanAccessor<'_>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for assertion in &spec.assertions {
        validate_assertion(assertion, accessor, &mut diagnostics);
    }
    diagnostics
}

/// Check a single assertion, appending to `out`
pub fn validate_assertion(
    assertion: &Assertion,
    accessor: &PlanAccessor<'_>,
    out: &mut Vec<Diagnostic>,
) {
    let target = assertion.target.to_string();
    let mut walk = Walk {
        target: &target,
        out,
    };

    let Some(actual) = accessor.resolve(&assertion.target) else {
        walk.error(
            AttributePath::root(),
            format!("{} is not present in the plan", target),
        );
        return;
    };
    let node = accessor.schema_for(&assertion.target);
    walk.compare(&assertion.expected, Some(&*actual), node, &AttributePath::root());
}

struct Walk<'a> {
    target: &'a str,
    out: &'a mut Vec<Diagnostic>,
}

impl Walk<'_> {
    fn info(&mut self, path: AttributePath, actual: impl fmt::Display) {
        self.out
            .push(Diagnostic::matched(path, actual).with_summary(self.target));
    }

    fn error(&mut self, path: AttributePath, detail: String) {
        self.out
            .push(Diagnostic::mismatch(path, detail).with_summary(self.target));
    }

    fn compare(
        &mut self,
        expected: &Value,
        actual: Option<&Value>,
        node: SchemaNode<'_>,
        path: &AttributePath,
    ) {
        if matches!(expected, Value::Map(m) if m.is_empty()) {
            return;
        }

        match (expected, actual) {
            (Value::Null, None | Some(Value::Null)) => self.info(path.clone(), Value::Null),
            (Value::Null, Some(actual)) => self.error(
                path.clone(),
                format!("Expected value null but got {}", actual),
            ),
            (expected, None | Some(Value::Null)) => self.error(
                path.clone(),
                format!("Expected value {} but got null", expected),
            ),
            (Value::Scalar(e), Some(Value::Scalar(a))) => {
                if scalars_equal(e, a, node.primitive()) {
                    self.info(path.clone(), a);
                } else {
                    self.error(
                        path.clone(),
                        format!("Expected value {} but got {}", e, a),
                    );
                }
            }
            (Value::Map(expected), Some(Value::Map(actual))) => {
                for (key, value) in expected {
                    let key_path = path.attr(key);
                    let Some(child) = node.child(key) else {
                        self.error(
                            key_path,
                            format!(
                                "unknown attribute {}{}",
                                key,
                                did_you_mean(key, &node.key_names())
                            ),
                        );
                        continue;
                    };
                    match actual.get(key) {
                        None if !node.defines_keys() => {
                            self.error(key_path, format!("key {} not present", key));
                        }
                        found => self.compare(value, found, child, &key_path),
                    }
                }
            }
            (expected, Some(actual)) => match (elements(expected), elements(actual)) {
                (Some(e), Some(a)) => {
                    if e.len() != a.len() {
                        self.error(
                            path.clone(),
                            format!("Expected {} elements but got {}", e.len(), a.len()),
                        );
                        return;
                    }
                    for (i, (e, a)) in e.iter().zip(a.iter()).enumerate() {
                        self.compare(e, Some(&**a), node.element(i), &path.index(i));
                    }
                }
                _ => self.error(
                    path.clone(),
                    format!(
                        "Expected a {} but got a {}",
                        expected.type_name(),
                        actual.type_name()
                    ),
                ),
            },
        }
    }
}

/// Elements of a list or block set, so the two compare alike
fn elements(value: &Value) -> Option<Vec<Cow<'_, Value>>> {
    match value {
        Value::List(items) => Some(items.iter().map(Cow::Borrowed).collect()),
        Value::BlockSet(blocks) => Some(
            blocks
                .iter()
                .map(|b| Cow::Owned(Value::Map(b.clone())))
                .collect(),
        ),
        _ => None,
    }
}

/// Compare two scalars by the declared type of the attribute
fn scalars_equal(expected: &Scalar, actual: &Scalar, declared: Option<&AttrType>) -> bool {
    match declared {
        Some(AttrType::Number) => match (expected.to_number(), actual.to_number()) {
            (Some(e), Some(a)) => e == a,
            _ => false,
        },
        Some(AttrType::Bool) => match (expected.to_bool(), actual.to_bool()) {
            (Some(e), Some(a)) => e == a,
            _ => false,
        },
        Some(AttrType::String) => expected.to_plain_string() == actual.to_plain_string(),
        _ => match (expected, actual) {
            (Scalar::Number(e), Scalar::Number(a)) => e == a,
            _ => {
                expected.type_name() == actual.type_name()
                    && expected.to_plain_string() == actual.to_plain_string()
            }
        },
    }
}
