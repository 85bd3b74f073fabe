//! Tracking of source-level variable assignments during stepping.

use crate::abi::VmType;
use crate::value::Value;
use ministack_vm::StackItem;
use std::collections::{BTreeMap, HashMap};

/// A named assignment registered at a bytecode offset by the source
/// mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub name: String,
    pub ty: VmType,
}

/// A tracked variable with its last observed value.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub value: Value,
    pub ty: VmType,
}

/// Maps bytecode offsets to assignments and names to current values.
#[derive(Debug, Default)]
pub struct VariableTracker {
    assignments: BTreeMap<u32, Assignment>,
    variables: HashMap<String, Variable>,
}

impl VariableTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_assignment(&mut self, offset: u32, name: impl Into<String>, ty: VmType) {
        self.assignments.insert(
            offset,
            Assignment {
                name: name.into(),
                ty,
            },
        );
    }

    pub fn assignment_at(&self, offset: u32) -> Option<&Assignment> {
        self.assignments.get(&offset)
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Record a variable's current value. A declared `Unknown` type
    /// inherits the type last known for that name, when there is one.
    pub fn record(&mut self, name: &str, item: &StackItem, declared: VmType) {
        let ty = if declared == VmType::Unknown {
            self.variables
                .get(name)
                .map(|v| v.ty)
                .unwrap_or(VmType::Unknown)
        } else {
            declared
        };
        let value = Value::from_stack_item(item, ty);
        self.variables.insert(name.to_string(), Variable { value, ty });
    }

    /// Drop both the static assignments and the observed values.
    pub fn clear_assignments(&mut self) {
        self.assignments.clear();
        self.variables.clear();
    }

    /// Drop only the observed values; assignments survive a session
    /// reset.
    pub fn clear_variables(&mut self) {
        self.variables.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_get() {
        let mut tracker = VariableTracker::new();
        tracker.record("n", &StackItem::from_int(5), VmType::Integer);

        let var = tracker.get("n").unwrap();
        assert_eq!(var.value, Value::Integer(5.into()));
        assert_eq!(var.ty, VmType::Integer);
        assert!(tracker.get("m").is_none());
    }

    #[test]
    fn test_unknown_type_inherits_previous() {
        let mut tracker = VariableTracker::new();
        tracker.record("n", &StackItem::from_int(5), VmType::Integer);
        tracker.record("n", &StackItem::from_bytes(vec![7]), VmType::Unknown);

        let var = tracker.get("n").unwrap();
        assert_eq!(var.ty, VmType::Integer);
        assert_eq!(var.value, Value::Integer(7.into()));
    }

    #[test]
    fn test_inheritance_does_not_survive_clear() {
        let mut tracker = VariableTracker::new();
        tracker.record("n", &StackItem::from_int(5), VmType::Integer);
        tracker.clear_variables();
        tracker.record("n", &StackItem::from_bytes(vec![7]), VmType::Unknown);

        assert_eq!(tracker.get("n").unwrap().ty, VmType::Unknown);
    }

    #[test]
    fn test_assignments() {
        let mut tracker = VariableTracker::new();
        tracker.register_assignment(12, "total", VmType::Integer);

        assert_eq!(tracker.assignment_at(12).unwrap().name, "total");
        assert!(tracker.assignment_at(13).is_none());

        tracker.clear_assignments();
        assert!(tracker.assignment_at(12).is_none());
    }
}
