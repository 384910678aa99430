//! Control words and the fragments they are assembled from.

use std::collections::BTreeMap;
use std::ops::BitOr;

use crate::error::{CompileError, Result, RowRef};
use crate::value::{Row, Value};

/// A partial control word: the field assignments one helper contributes to a cycle.
/// Fragments combine with `|`; disagreements are only detected when the combined fragment
/// is turned into a [`ControlWord`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    assignments: Vec<(String, Value)>,
}

impl Fragment {
    /// An empty fragment, which leaves every field at zero.
    pub fn new() -> Self {
        Default::default()
    }

    /// A fragment with a single assignment.
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().with(field, value)
    }

    /// Add an assignment.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignments.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Assignments in the order they were made, repeats included.
    pub fn assignments(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.assignments.iter().map(|(f, v)| (f.as_str(), v))
    }
}

impl<T: Into<Fragment>> BitOr<T> for Fragment {
    type Output = Fragment;

    fn bitor(mut self, rhs: T) -> Fragment {
        self.assignments.extend(rhs.into().assignments);
        self
    }
}

impl FromIterator<(String, Value)> for Fragment {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Fragment {
            assignments: iter.into_iter().collect(),
        }
    }
}

/// A complete control word: the union of a cycle's fragments, at most one value per field.
/// Unset fields are zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlWord {
    fields: BTreeMap<String, Value>,
}

impl ControlWord {
    pub fn new() -> Self {
        Default::default()
    }

    /// Union the fragment's assignments. Assigning a field a second, different value is a
    /// [`CompileError::ControlWordConflict`] attributed to `row`.
    pub fn from_fragment(fragment: &Fragment, row: &RowRef) -> Result<Self> {
        let mut word = ControlWord::new();
        for (field, value) in fragment.assignments() {
            word.merge(field, value.clone(), row)?;
        }
        Ok(word)
    }

    /// Set a field, failing if it already holds a different value.
    pub fn merge(&mut self, field: &str, value: Value, row: &RowRef) -> Result<()> {
        match self.fields.get(field) {
            Some(existing) if !existing.same_as(&value) => Err(CompileError::ControlWordConflict {
                row: row.clone(),
                field: field.to_owned(),
                first: existing.clone(),
                second: value,
            }),
            Some(_) => Ok(()),
            None => {
                self.fields.insert(field.to_owned(), value);
                Ok(())
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(f, v)| (f.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The word's assignments as a table row.
    pub fn as_row(&self) -> &Row {
        &self.fields
    }

    pub fn into_row(self) -> Row {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_of_fragments() {
        let fragment = Fragment::set("aluop", "SUM") | Fragment::set("load", 1u64);
        let word = ControlWord::from_fragment(&fragment, &RowRef::step("ADD", 0)).unwrap();
        assert_eq!(word.len(), 2);
        assert_eq!(word.get("aluop"), Some(&Value::symbol("SUM")));
        assert_eq!(word.get("load"), Some(&Value::Int(1)));
    }

    #[test]
    fn repeated_equal_assignment_is_fine() {
        let fragment = Fragment::set("abs", "SP").with("aout", 1u64) | Fragment::set("abs", "SP");
        let word = ControlWord::from_fragment(&fragment, &RowRef::step("POP", 0)).unwrap();
        assert_eq!(word.get("abs"), Some(&Value::symbol("SP")));
    }

    #[test]
    fn numeric_symbols_match_integers() {
        let fragment = Fragment::set("cis", 0u64) | Fragment::set("cis", "0");
        let word = ControlWord::from_fragment(&fragment, &RowRef::step("CALL", 1)).unwrap();
        assert_eq!(word.get("cis"), Some(&Value::Int(0)));

        let fragment = Fragment::set("cis", 1u64) | Fragment::set("cis", "0");
        assert!(ControlWord::from_fragment(&fragment, &RowRef::step("CALL", 1)).is_err());
        assert!(!Value::Int(2).same_as(&Value::symbol("02")));
        assert!(!Value::symbol("0").same_as(&Value::Range([0, 0])));
    }

    #[test]
    fn conflicting_assignment_is_an_error() {
        let fragment = Fragment::set("aluop", "SUM") | Fragment::set("aluop", "SUB");
        match ControlWord::from_fragment(&fragment, &RowRef::step("BAD", 2)) {
            Err(CompileError::ControlWordConflict {
                row,
                field,
                first,
                second,
            }) => {
                assert_eq!(row, RowRef::step("BAD", 2));
                assert_eq!(field, "aluop");
                assert_eq!(first, Value::symbol("SUM"));
                assert_eq!(second, Value::symbol("SUB"));
            }
            other => panic!("expected a conflict, got {:?}", other),
        }
    }
}
