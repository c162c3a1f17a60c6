//! Attribute paths: the structural address of a value inside a nested tree.

use std::fmt;

/// One step of an [`AttributePath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// `.name`
    Attr(String),
    /// `[n]`
    Index(usize),
}

/// An ordered sequence of steps from an assertion root down to a value.
///
/// Paths are never mutated in place: descending returns an extended copy, so
/// sibling branches of a comparison cannot see each other's steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AttributePath {
    steps: Vec<PathStep>,
}

impl AttributePath {
    /// The empty path, addressing the assertion root
    pub fn root() -> Self {
        Self::default()
    }

    /// A copy of this path extended with a named-attribute step
    pub fn attr(&self, name: impl Into<String>) -> Self {
        let mut steps = self.steps.clone();
        steps.push(PathStep::Attr(name.into()));
        Self { steps }
    }

    /// A copy of this path extended with an index step
    pub fn index(&self, index: usize) -> Self {
        let mut steps = self.steps.clone();
        steps.push(PathStep::Index(index));
        Self { steps }
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Attr(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                PathStep::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl FromIterator<PathStep> for AttributePath {
    fn from_iter<I: IntoIterator<Item = PathStep>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_renders_empty() {
        assert_eq!(AttributePath::root().to_string(), "");
        assert!(AttributePath::root().is_empty());
    }

    #[test]
    fn test_nested_block_path() {
        let path = AttributePath::root().attr("rule").index(2).attr("tags").attr("env");
        assert_eq!(path.to_string(), "rule[2].tags.env");
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn test_leading_index() {
        let path = AttributePath::root().index(0).attr("name");
        assert_eq!(path.to_string(), "[0].name");
    }

    #[test]
    fn test_extending_does_not_touch_parent() {
        let parent = AttributePath::root().attr("ingress");
        let first = parent.index(0);
        let second = parent.index(1);
        assert_eq!(parent.to_string(), "ingress");
        assert_eq!(first.to_string(), "ingress[0]");
        assert_eq!(second.to_string(), "ingress[1]");
    }
}
