//! Contract ABI types consumed by the emulator.
//!
//! Parsing an ABI file is the front-end's job; these are just the shapes
//! the emulator needs to seed entry-point variables and decode values.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Declared type of an ABI input or a tracked variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VmType {
    #[default]
    Unknown,
    String,
    Boolean,
    Integer,
    Array,
    ByteArray,
}

impl VmType {
    /// Map an ABI type name; anything unrecognized is `Unknown`.
    pub fn parse(name: &str) -> VmType {
        match name {
            "String" => VmType::String,
            "Boolean" => VmType::Boolean,
            "Integer" => VmType::Integer,
            "Array" => VmType::Array,
            "ByteArray" => VmType::ByteArray,
            _ => VmType::Unknown,
        }
    }
}

/// A typed entry-point input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiInput {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: VmType,
}

/// A callable contract function.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AbiFunction {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiInput>,
    #[serde(default, rename = "returntype")]
    pub return_type: VmType,
}

impl AbiFunction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, ty: VmType) -> Self {
        self.inputs.push(AbiInput {
            name: name.into(),
            ty,
        });
        self
    }
}

/// The contract's declared interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abi {
    pub entry_point: AbiFunction,
    #[serde(default)]
    pub functions: HashMap<String, AbiFunction>,
}

impl Abi {
    /// An ABI with a single entry point and no other functions.
    pub fn with_entry_point(entry_point: AbiFunction) -> Self {
        Self {
            entry_point,
            functions: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_names() {
        assert_eq!(VmType::parse("Integer"), VmType::Integer);
        assert_eq!(VmType::parse("ByteArray"), VmType::ByteArray);
        assert_eq!(VmType::parse("Whatever"), VmType::Unknown);
    }

    #[test]
    fn test_builder() {
        let abi = Abi::with_entry_point(
            AbiFunction::new("transfer")
                .with_input("from", VmType::ByteArray)
                .with_input("amount", VmType::Integer),
        );
        assert_eq!(abi.entry_point.inputs.len(), 2);
        assert_eq!(abi.entry_point.inputs[1].ty, VmType::Integer);
    }

    #[test]
    fn test_deserialize_from_json() {
        let abi: Abi = serde_json::from_str(
            r#"{
                "entry_point": {
                    "name": "Main",
                    "inputs": [{"name": "n", "type": "Integer"}],
                    "returntype": "Integer"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(abi.entry_point.name, "Main");
        assert_eq!(abi.entry_point.inputs[0].ty, VmType::Integer);
        assert!(abi.functions.is_empty());
    }
}
