//! Ops files: ordered `replace`, `remove` and `test` operations addressed by
//! pointer paths such as `/instance_groups/name=web/jobs/-`.
//!
//! Path tokens:
//! - `key`: a map key;
//! - `3` or `-1`: an array index (negative counts from the end);
//! - `-`: the position after the last array element;
//! - `name=web`: the single array element whose `name` is `web`.
//!
//! Index and match tokens take `:prev` and `:next` modifiers, which step to
//! the neighbouring element, and a final `:before` or `:after`, which makes a
//! replace insert next to the element instead of overwriting it.
//!
//! A token suffixed with `?` is optional, and so is every token after it:
//! a replace creates missing maps and arrays along the way, and a remove of
//! something absent is a no-op. `~1` and `~0` escape `/` and `~`.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use super::document::parse_document;
use crate::error::EngineError;

/// Positional modifier of an index or match token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// The element before.
    Prev,
    /// The element after.
    Next,
    /// Insert before the element.
    Before,
    /// Insert after the element.
    After,
}

impl Modifier {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "prev" => Some(Self::Prev),
            "next" => Some(Self::Next),
            "before" => Some(Self::Before),
            "after" => Some(Self::After),
            _ => None,
        }
    }
}

/// One step of a pointer path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Map key.
    Key {
        /// Key name.
        key: String,
        /// Missing keys are tolerated.
        optional: bool,
    },
    /// Array index; negative values count from the end.
    Index {
        /// Written index.
        index: i64,
        /// Modifiers, in written order.
        modifiers: Vec<Modifier>,
    },
    /// The slot after the last element of an array.
    Append,
    /// Array element whose `key` field equals `value`.
    Match {
        /// Field name.
        key: String,
        /// Expected field value.
        value: String,
        /// A missing element is tolerated.
        optional: bool,
        /// Modifiers, in written order.
        modifiers: Vec<Modifier>,
    },
}

impl Token {
    fn parse(part: &str, optional: &mut bool) -> Result<Self, String> {
        let mut base = strip_optional(part, optional);
        let mut modifiers = Vec::new();
        while let Some((head, name)) = base.rsplit_once(':') {
            let Some(modifier) = Modifier::from_name(name) else { break };
            modifiers.push(modifier);
            base = head;
        }
        modifiers.reverse();
        let base = strip_optional(base, optional).replace("~1", "/").replace("~0", "~");

        if base == "-" {
            return if modifiers.is_empty() {
                Ok(Self::Append)
            } else {
                Err(format!("'-' does not take modifiers, found '{part}'"))
            };
        }
        if let Ok(index) = base.parse::<i64>() {
            return Ok(Self::Index { index, modifiers });
        }
        if let Some((key, value)) = base.split_once('=') {
            return Ok(Self::Match { key: key.to_string(), value: value.to_string(), optional: *optional, modifiers });
        }
        if modifiers.is_empty() {
            Ok(Self::Key { key: base, optional: *optional })
        } else {
            Err(format!("modifiers are only allowed on index and match tokens, found '{part}'"))
        }
    }
}

fn strip_optional<'p>(part: &'p str, optional: &mut bool) -> &'p str {
    match part.strip_suffix('?') {
        Some(stripped) => {
            *optional = true;
            stripped
        }
        None => part,
    }
}

/// A parsed pointer path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pointer {
    raw: String,
    tokens: Vec<Token>,
}

impl Pointer {
    /// Parses a pointer path. The empty path addresses the whole document.
    ///
    /// # Errors
    ///
    /// Returns an error message if a non-empty path does not start with `/`
    /// or a token carries modifiers it cannot take.
    pub fn parse(path: &str) -> Result<Self, String> {
        if path.is_empty() {
            return Ok(Self { raw: String::new(), tokens: Vec::new() });
        }
        let Some(rest) = path.strip_prefix('/') else {
            return Err(format!("expected path '{path}' to start with '/'"));
        };

        let mut optional = false;
        let tokens = rest.split('/').map(|part| Token::parse(part, &mut optional)).collect::<Result<_, _>>()?;
        Ok(Self { raw: path.to_string(), tokens })
    }

    /// The path as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed tokens, root first.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

/// One patch operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Sets the value at `path`.
    Replace {
        /// Target location.
        path: Pointer,
        /// New value.
        value: Value,
    },
    /// Deletes the value at `path`.
    Remove {
        /// Target location.
        path: Pointer,
    },
    /// Checks the value at `path` without changing the document.
    Test {
        /// Checked location.
        path: Pointer,
        /// Expected value; `None` expects the path to be absent.
        expected: Option<Value>,
    },
}

#[derive(Deserialize)]
struct OpDefinition {
    #[serde(rename = "type")]
    kind: String,
    path: Option<String>,
    value: Option<Value>,
    #[serde(default)]
    absent: bool,
}

impl Op {
    fn from_definition(def: OpDefinition) -> Result<Self, String> {
        let path = Pointer::parse(def.path.as_deref().unwrap_or_default())?;
        let absent = def.absent;
        if absent && def.kind != "test" {
            return Err(format!("{} at '{}' cannot specify absent", def.kind, path.as_str()));
        }
        match (def.kind.as_str(), def.value) {
            ("replace", Some(value)) => Ok(Self::Replace { path, value }),
            ("replace", None) => Err(format!("replace at '{}' is missing a value", path.as_str())),
            ("remove", None) => Ok(Self::Remove { path }),
            ("remove", Some(_)) => {
                Err(format!("remove at '{}' cannot specify a value", path.as_str()))
            }
            ("test", Some(_)) if absent => {
                Err(format!("test at '{}' cannot specify both a value and absent", path.as_str()))
            }
            ("test", None) if absent => Ok(Self::Test { path, expected: None }),
            ("test", Some(value)) => Ok(Self::Test { path, expected: Some(value) }),
            ("test", None) => Err(format!("test at '{}' is missing a value", path.as_str())),
            (other, _) => Err(format!("unknown operation type '{other}'")),
        }
    }

    /// Applies this operation to `doc`.
    ///
    /// # Errors
    ///
    /// Returns an error message when a non-optional part of the path is
    /// missing, an index is out of range, a match is ambiguous, a token
    /// meets a value of the wrong shape, or a test does not hold.
    pub fn apply(&self, doc: &mut Value) -> Result<(), String> {
        match self {
            Self::Replace { path, value } => {
                if path.tokens.is_empty() {
                    *doc = value.clone();
                    return Ok(());
                }
                replace_in(doc, &path.tokens, value)
                    .map_err(|e| format!("{e} (path '{}')", path.as_str()))
            }
            Self::Remove { path } => {
                if path.tokens.is_empty() {
                    return Err("cannot remove the entire document".to_string());
                }
                remove_in(doc, &path.tokens).map_err(|e| format!("{e} (path '{}')", path.as_str()))
            }
            Self::Test { path, expected } => match (expected, find(doc, &path.tokens)) {
                (None, Ok(None) | Err(_)) => Ok(()),
                (None, Ok(Some(_))) => Err(format!("expected not to find '{}'", path.as_str())),
                (Some(expected), Ok(found)) => {
                    if found.map_or(expected.is_null(), |v| v == expected) {
                        Ok(())
                    } else {
                        Err(format!("found value does not match expected value (path '{}')", path.as_str()))
                    }
                }
                (Some(_), Err(e)) => Err(format!("{e} (path '{}')", path.as_str())),
            },
        }
    }
}

/// Parses an ops file: a YAML list of `{type, path, value}` definitions.
///
/// # Errors
///
/// Returns [`EngineError::Parse`] if the document is not a list of valid
/// operations.
pub fn parse_ops(name: &str, content: &str) -> Result<Vec<Op>, EngineError> {
    let context = || format!("ops file '{name}'");
    let doc = parse_document(content).map_err(|e| EngineError::parse(context(), e))?;
    let defs: Option<Vec<OpDefinition>> =
        serde_yaml::from_value(doc).map_err(|e| EngineError::parse(context(), e))?;
    defs.unwrap_or_default()
        .into_iter()
        .map(Op::from_definition)
        .collect::<Result<_, _>>()
        .map_err(|e| EngineError::parse(context(), e))
}

/// Applies `ops` in order.
///
/// # Errors
///
/// Returns the first failing operation's message.
pub fn apply_all(doc: &mut Value, ops: &[Op]) -> Result<(), String> {
    ops.iter().try_for_each(|op| op.apply(doc))
}

fn scalar_eq(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => b.to_string() == expected,
        _ => false,
    }
}

/// Where an index or match token lands once its modifiers are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// An existing element.
    At(usize),
    /// An insertion point.
    Insert(usize),
}

fn normalize(index: i64, len: usize) -> Result<i64, String> {
    let len = i64::try_from(len).map_err(|e| e.to_string())?;
    Ok(if index < 0 { len + index } else { index })
}

fn slot(start: i64, modifiers: &[Modifier], len: usize, last: bool) -> Result<Slot, String> {
    let mut idx = start;
    let mut insert = None;
    for (n, modifier) in modifiers.iter().enumerate() {
        match modifier {
            Modifier::Prev => idx -= 1,
            Modifier::Next => idx += 1,
            Modifier::Before | Modifier::After => {
                if n + 1 != modifiers.len() {
                    return Err("'before' and 'after' must be the last modifier".to_string());
                }
                if !last {
                    return Err("'before' and 'after' are only allowed on the last path token".to_string());
                }
                insert = Some(*modifier);
            }
        }
    }
    let at = usize::try_from(idx)
        .ok()
        .filter(|at| *at < len)
        .ok_or_else(|| format!("index {idx} out of range for array of length {len}"))?;
    Ok(match insert {
        Some(Modifier::Before) => Slot::Insert(at),
        Some(_) => Slot::Insert(at + 1),
        None => Slot::At(at),
    })
}

fn index_slot(index: i64, modifiers: &[Modifier], len: usize, last: bool) -> Result<Slot, String> {
    slot(normalize(index, len)?, modifiers, len, last)
}

fn match_slot(found: usize, modifiers: &[Modifier], len: usize, last: bool) -> Result<Slot, String> {
    slot(i64::try_from(found).map_err(|e| e.to_string())?, modifiers, len, last)
}

fn matching(seq: &[Value], key: &str, value: &str) -> Result<Option<usize>, String> {
    let found: Vec<usize> = seq
        .iter()
        .enumerate()
        .filter(|(_, item)| item.get(key).is_some_and(|v| scalar_eq(v, value)))
        .map(|(idx, _)| idx)
        .collect();
    match found.as_slice() {
        [] => Ok(None),
        [one] => Ok(Some(*one)),
        many => Err(format!("expected one element matching '{key}={value}', found {}", many.len())),
    }
}

fn container_for(next: &Token) -> Value {
    match next {
        Token::Key { .. } => Value::Mapping(Mapping::new()),
        Token::Index { .. } | Token::Append | Token::Match { .. } => Value::Sequence(Vec::new()),
    }
}

fn replace_at(seq: &mut Vec<Value>, slot: Slot, rest: &[Token], value: &Value) -> Result<(), String> {
    match slot {
        Slot::At(idx) => replace_in(&mut seq[idx], rest, value),
        Slot::Insert(idx) => {
            seq.insert(idx, value.clone());
            Ok(())
        }
    }
}

fn replace_in(node: &mut Value, tokens: &[Token], value: &Value) -> Result<(), String> {
    let Some((token, rest)) = tokens.split_first() else {
        *node = value.clone();
        return Ok(());
    };
    let last = rest.is_empty();

    match token {
        Token::Key { key, optional } => {
            let map = node.as_mapping_mut().ok_or_else(|| format!("expected a map at key '{key}'"))?;
            let k = Value::String(key.clone());
            if !map.contains_key(&k) {
                if !optional {
                    return Err(format!("expected to find map key '{key}'"));
                }
                let fresh = rest.first().map_or(Value::Null, container_for);
                map.insert(k.clone(), fresh);
            }
            match map.get_mut(&k) {
                Some(child) => replace_in(child, rest, value),
                None => Err(format!("expected to find map key '{key}'")),
            }
        }
        Token::Index { index, modifiers } => {
            let seq = node.as_sequence_mut().ok_or_else(|| format!("expected an array at index {index}"))?;
            let slot = index_slot(*index, modifiers, seq.len(), last)?;
            replace_at(seq, slot, rest, value)
        }
        Token::Append => {
            if !last {
                return Err("'-' must be the last path token".to_string());
            }
            let seq = node.as_sequence_mut().ok_or("expected an array for '-'")?;
            seq.push(value.clone());
            Ok(())
        }
        Token::Match { key, value: expected, optional, modifiers } => {
            let seq = node
                .as_sequence_mut()
                .ok_or_else(|| format!("expected an array at '{key}={expected}'"))?;
            if let Some(found) = matching(seq, key, expected)? {
                let slot = match_slot(found, modifiers, seq.len(), last)?;
                return replace_at(seq, slot, rest, value);
            }
            if !optional {
                return Err(format!("expected to find an element matching '{key}={expected}'"));
            }
            if last {
                seq.push(value.clone());
                return Ok(());
            }
            let mut fresh = Mapping::new();
            fresh.insert(Value::String(key.clone()), Value::String(expected.clone()));
            seq.push(Value::Mapping(fresh));
            let idx = seq.len() - 1;
            replace_in(&mut seq[idx], rest, value)
        }
    }
}

fn remove_at(seq: &mut Vec<Value>, slot: Slot, rest: &[Token]) -> Result<(), String> {
    match slot {
        Slot::At(idx) if rest.is_empty() => {
            seq.remove(idx);
            Ok(())
        }
        Slot::At(idx) => remove_in(&mut seq[idx], rest),
        Slot::Insert(_) => Err("cannot remove with 'before' or 'after'".to_string()),
    }
}

fn remove_in(node: &mut Value, tokens: &[Token]) -> Result<(), String> {
    let Some((token, rest)) = tokens.split_first() else {
        return Ok(());
    };
    let last = rest.is_empty();

    match token {
        Token::Key { key, optional } => {
            let map = node.as_mapping_mut().ok_or_else(|| format!("expected a map at key '{key}'"))?;
            let k = Value::String(key.clone());
            if last {
                return match map.remove(&k) {
                    Some(_) => Ok(()),
                    None if *optional => Ok(()),
                    None => Err(format!("expected to find map key '{key}'")),
                };
            }
            match map.get_mut(&k) {
                Some(child) => remove_in(child, rest),
                None if *optional => Ok(()),
                None => Err(format!("expected to find map key '{key}'")),
            }
        }
        Token::Index { index, modifiers } => {
            let seq = node.as_sequence_mut().ok_or_else(|| format!("expected an array at index {index}"))?;
            let slot = index_slot(*index, modifiers, seq.len(), last)?;
            remove_at(seq, slot, rest)
        }
        Token::Append => Err("cannot remove with '-'".to_string()),
        Token::Match { key, value, optional, modifiers } => {
            let seq =
                node.as_sequence_mut().ok_or_else(|| format!("expected an array at '{key}={value}'"))?;
            match matching(seq, key, value)? {
                Some(found) => {
                    let slot = match_slot(found, modifiers, seq.len(), last)?;
                    remove_at(seq, slot, rest)
                }
                None if *optional => Ok(()),
                None => Err(format!("expected to find an element matching '{key}={value}'")),
            }
        }
    }
}

/// Looks up the value at `tokens`. `Ok(None)` means an optional part is
/// missing.
fn find<'v>(node: &'v Value, tokens: &[Token]) -> Result<Option<&'v Value>, String> {
    let Some((token, rest)) = tokens.split_first() else {
        return Ok(Some(node));
    };
    let last = rest.is_empty();

    let child = match token {
        Token::Key { key, optional } => {
            let map = node.as_mapping().ok_or_else(|| format!("expected a map at key '{key}'"))?;
            match map.get(&Value::String(key.clone())) {
                Some(child) => child,
                None if *optional => return Ok(None),
                None => return Err(format!("expected to find map key '{key}'")),
            }
        }
        Token::Index { index, modifiers } => {
            let seq = node.as_sequence().ok_or_else(|| format!("expected an array at index {index}"))?;
            match index_slot(*index, modifiers, seq.len(), last)? {
                Slot::At(idx) => &seq[idx],
                Slot::Insert(_) => return Err("cannot test with 'before' or 'after'".to_string()),
            }
        }
        Token::Append => return Err("cannot test with '-'".to_string()),
        Token::Match { key, value, optional, modifiers } => {
            let seq = node.as_sequence().ok_or_else(|| format!("expected an array at '{key}={value}'"))?;
            match matching(seq, key, value)? {
                Some(found) => match match_slot(found, modifiers, seq.len(), last)? {
                    Slot::At(idx) => &seq[idx],
                    Slot::Insert(_) => return Err("cannot test with 'before' or 'after'".to_string()),
                },
                None if *optional => return Ok(None),
                None => return Err(format!("expected to find an element matching '{key}={value}'")),
            }
        }
    };
    find(child, rest)
}
