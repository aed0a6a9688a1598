// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dotted-path lookups into decoded JSON
//!
//! Tool output is schema-less from the tracker's point of view. Behaviors
//! name the interesting fields with dotted paths such as `data.run.id`;
//! these helpers walk the tree and report absence instead of failing.
//!
//! Splitting ignores empty segments, so `.a..b.` is the same path as `a.b`
//! and the empty path refers to the root value.

use serde_json::Value;

/// Iterate the non-empty segments of a dotted path
fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|segment| !segment.is_empty())
}

/// Look up the value at `path`, or `None` if any segment is missing or a
/// non-object is reached before the last segment.
pub fn lookup<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(tree, |node, segment| node.as_object()?.get(segment))
}

/// Owned copy of the value at `path`
pub fn lookup_raw(tree: &Value, path: &str) -> Option<Value> {
    lookup(tree, path).cloned()
}

/// String at `path`; any other value kind counts as absent
pub fn lookup_str<'a>(tree: &'a Value, path: &str) -> Option<&'a str> {
    lookup(tree, path)?.as_str()
}

/// Integer at `path`, coerced from any finite JSON number.
///
/// Unsigned values beyond `i64::MAX` saturate; floats are truncated toward
/// zero (and saturate at the `i64` bounds).
pub fn lookup_i64(tree: &Value, path: &str) -> Option<i64> {
    let Value::Number(number) = lookup(tree, path)? else {
        return None;
    };
    if let Some(n) = number.as_i64() {
        return Some(n);
    }
    if number.as_u64().is_some() {
        return Some(i64::MAX);
    }
    let f = number.as_f64()?;
    f.is_finite().then(|| f.trunc() as i64)
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
