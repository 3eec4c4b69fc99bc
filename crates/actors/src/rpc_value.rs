// SPDX-License-Identifier: MIT

//! Dev-time structured-clone validator for stub RPC arguments and return
//! values (spec §4.8.8). In this in-process emulator values are passed by
//! reference with no real serialization boundary, so this module exists
//! purely to warn about values that would not survive the real platform's
//! structured-clone algorithm.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneWarning {
    Symbol,
    CustomClassInstance(String),
    Promise,
    WeakCollection,
    SharedArrayBuffer,
    Blob,
    Cycle,
}

impl std::fmt::Display for CloneWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloneWarning::Symbol => write!(f, "symbol values do not survive structured clone"),
            CloneWarning::CustomClassInstance(tag) => write!(f, "custom class instance {tag:?} is cloned as a plain object, losing its prototype"),
            CloneWarning::Promise => write!(f, "promises cannot be structured-cloned"),
            CloneWarning::WeakCollection => write!(f, "WeakMap/WeakSet cannot be structured-cloned"),
            CloneWarning::SharedArrayBuffer => write!(f, "SharedArrayBuffer cannot cross the stub RPC boundary"),
            CloneWarning::Blob => write!(f, "Blob is not part of the structured-clone extension set used here"),
            CloneWarning::Cycle => write!(f, "cyclic reference detected"),
        }
    }
}

/// A minimal tagged-variant model of values flowing over a stub call. Real
/// in-process values are `serde_json::Value`; this enum exists only to let
/// callers flag the extension/non-cloneable kinds that JSON can't represent
/// before they ever reach the JSON boundary.
#[derive(Debug, Clone)]
pub enum RpcValue {
    Json(Value),
    Symbol,
    CustomClassInstance(String),
    Promise,
    WeakCollection,
    SharedArrayBuffer,
    Blob,
    Array(Vec<RpcValue>),
    Object(Vec<(String, RpcValue)>),
}

/// Walks the value tree (bounded by a depth guard standing in for cycle
/// detection, since `RpcValue` here is a tree, not a graph, and a real
/// cycle can only arise once this models actual object references) and
/// collects every non-cloneable construct found.
pub fn validate(value: &RpcValue) -> Vec<CloneWarning> {
    let mut warnings = Vec::new();
    walk(value, 0, &mut warnings);
    warnings
}

const MAX_DEPTH: usize = 64;

fn walk(value: &RpcValue, depth: usize, warnings: &mut Vec<CloneWarning>) {
    if depth > MAX_DEPTH {
        warnings.push(CloneWarning::Cycle);
        return;
    }
    match value {
        RpcValue::Json(_) => {}
        RpcValue::Symbol => warnings.push(CloneWarning::Symbol),
        RpcValue::CustomClassInstance(tag) => warnings.push(CloneWarning::CustomClassInstance(tag.clone())),
        RpcValue::Promise => warnings.push(CloneWarning::Promise),
        RpcValue::WeakCollection => warnings.push(CloneWarning::WeakCollection),
        RpcValue::SharedArrayBuffer => warnings.push(CloneWarning::SharedArrayBuffer),
        RpcValue::Blob => warnings.push(CloneWarning::Blob),
        RpcValue::Array(items) => {
            for item in items {
                walk(item, depth + 1, warnings);
            }
        }
        RpcValue::Object(entries) => {
            for (_, v) in entries {
                walk(v, depth + 1, warnings);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        symbol = { RpcValue::Symbol, vec![CloneWarning::Symbol] },
        promise = { RpcValue::Promise, vec![CloneWarning::Promise] },
        weak = { RpcValue::WeakCollection, vec![CloneWarning::WeakCollection] },
        blob = { RpcValue::Blob, vec![CloneWarning::Blob] },
        shared_buffer = { RpcValue::SharedArrayBuffer, vec![CloneWarning::SharedArrayBuffer] },
    )]
    fn flags_each_non_cloneable_kind(value: RpcValue, expected: Vec<CloneWarning>) {
        assert_eq!(validate(&value), expected);
    }

    #[test]
    fn plain_json_has_no_warnings() {
        let value = RpcValue::Object(vec![("a".to_string(), RpcValue::Json(Value::from(1)))]);
        assert!(validate(&value).is_empty());
    }

    #[test]
    fn warning_surfaces_from_inside_a_nested_array() {
        let value = RpcValue::Array(vec![RpcValue::Json(Value::from(1)), RpcValue::Symbol]);
        assert_eq!(validate(&value), vec![CloneWarning::Symbol]);
    }

    #[test]
    fn custom_class_instance_carries_its_tag() {
        let value = RpcValue::CustomClassInstance("MyClass".to_string());
        assert_eq!(validate(&value), vec![CloneWarning::CustomClassInstance("MyClass".to_string())]);
    }
}
