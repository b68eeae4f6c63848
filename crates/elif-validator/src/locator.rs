//! Field paths and their resolution against request data
//!
//! A [`FieldPath`] is parsed once when a chain is built. Wildcard segments
//! are expanded lazily by [`resolve`], against whatever containers the
//! record actually holds at execution time.

use crate::error::ConfigurationError;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::{Chars, FromStr};

/// One segment of a parsed field path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object key (or array index when the container is an array and the key is numeric)
    Key(String),
    /// Bracketed array index, e.g. `tags[0]`
    Index(usize),
    /// `*`: every key or index of the container reached so far
    Wildcard,
}

/// A field path such as `user.addresses[*].city`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Parse a field path.
    ///
    /// Accepts dot-separated keys, bracketed indices, bracketed quoted keys
    /// (`meta["a.b"]`) and `*` wildcards either as a dot segment or
    /// bracketed. The empty string addresses the whole location.
    pub fn parse(raw: &str) -> Result<Self, ConfigurationError> {
        let malformed = |reason: &str| ConfigurationError::MalformedLocator {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = raw.chars();
        let mut after_bracket = false;
        let mut after_dot = false;

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if current.is_empty() && !after_bracket {
                        return Err(malformed("empty path segment"));
                    }
                    if !current.is_empty() {
                        segments.push(key_segment(std::mem::take(&mut current)));
                    }
                    after_bracket = false;
                    after_dot = true;
                }
                '[' => {
                    if !current.is_empty() {
                        segments.push(key_segment(std::mem::take(&mut current)));
                    } else if after_dot {
                        return Err(malformed("empty path segment"));
                    }
                    segments.push(parse_bracket(&mut chars).map_err(malformed)?);
                    after_bracket = true;
                    after_dot = false;
                }
                ']' => return Err(malformed("unexpected `]`")),
                other => {
                    if after_bracket {
                        return Err(malformed("expected `.` or `[` after `]`"));
                    }
                    current.push(other);
                    after_dot = false;
                }
            }
        }

        if after_dot {
            return Err(malformed("trailing `.`"));
        }
        if !current.is_empty() {
            segments.push(key_segment(current));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn has_wildcard(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Wildcard))
    }

    /// Lower-cased copy, used for header lookups
    pub fn to_lowercase(&self) -> Self {
        Self {
            raw: self.raw.to_lowercase(),
            segments: self
                .segments
                .iter()
                .map(|segment| match segment {
                    Segment::Key(key) => Segment::Key(key.to_lowercase()),
                    other => other.clone(),
                })
                .collect(),
        }
    }

    /// The concrete path reported when nothing matched, wildcards kept as `*`
    pub fn unmatched_path(&self) -> ConcretePath {
        ConcretePath(
            self.segments
                .iter()
                .map(|segment| match segment {
                    Segment::Key(key) => PathElement::Key(key.clone()),
                    Segment::Index(index) => PathElement::Index(*index),
                    Segment::Wildcard => PathElement::Wildcard,
                })
                .collect(),
        )
    }
}

impl FromStr for FieldPath {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn key_segment(key: String) -> Segment {
    if key == "*" {
        Segment::Wildcard
    } else {
        Segment::Key(key)
    }
}

fn parse_bracket(chars: &mut Chars<'_>) -> Result<Segment, &'static str> {
    let mut content = String::new();
    match chars.next() {
        Some(quote @ ('"' | '\'')) => {
            loop {
                match chars.next() {
                    Some(c) if c == quote => break,
                    Some(c) => content.push(c),
                    None => return Err("unterminated quoted key"),
                }
            }
            match chars.next() {
                Some(']') => Ok(Segment::Key(content)),
                _ => Err("expected `]` after quoted key"),
            }
        }
        Some(mut c) => {
            while c != ']' {
                content.push(c);
                c = chars.next().ok_or("unclosed `[`")?;
            }
            if content == "*" {
                Ok(Segment::Wildcard)
            } else if !content.is_empty() && content.bytes().all(|b| b.is_ascii_digit()) {
                content.parse().map(Segment::Index).map_err(|_| "index out of range")
            } else {
                Err("brackets must hold an index, `*` or a quoted key")
            }
        }
        None => Err("unclosed `[`"),
    }
}

/// One step of a concrete (wildcard-free) path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathElement {
    Key(String),
    Index(usize),
    /// Only appears in the path of an instance for a wildcard that matched nothing
    Wildcard,
}

/// A concrete location inside a record, rendered as `users[0].name`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConcretePath(Vec<PathElement>);

impl ConcretePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    fn child(&self, element: PathElement) -> Self {
        let mut elements = self.0.clone();
        elements.push(element);
        Self(elements)
    }
}

impl fmt::Display for ConcretePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, element) in self.0.iter().enumerate() {
            match element {
                PathElement::Key(key) if is_plain_key(key) => {
                    if position > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
                PathElement::Key(key) => write!(f, "[\"{}\"]", key.replace('"', "\\\""))?,
                PathElement::Index(index) => write!(f, "[{}]", index)?,
                PathElement::Wildcard => {
                    if position > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str("*")?;
                }
            }
        }
        Ok(())
    }
}

impl Serialize for ConcretePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty() && key != "*" && !key.contains(['.', '[', ']', '"', '\''])
}

/// A concrete path together with the value found there (`None` when absent)
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<'a> {
    pub path: ConcretePath,
    pub value: Option<&'a Value>,
}

/// Resolve a field path against a value.
///
/// Literal segments always produce exactly one entry (with `value: None`
/// when anything along the way is missing). Wildcards fan out over the
/// keys or indices of the container in its natural order and drop the
/// entry entirely when there is no container to expand.
pub fn resolve<'a>(root: &'a Value, field: &FieldPath) -> Vec<Resolved<'a>> {
    let mut matches = vec![Resolved {
        path: ConcretePath::root(),
        value: Some(root),
    }];

    for segment in field.segments() {
        let mut next = Vec::with_capacity(matches.len());

        for Resolved { path, value } in matches {
            match segment {
                Segment::Key(key) => {
                    let (element, child) = match value {
                        Some(Value::Object(map)) => (PathElement::Key(key.clone()), map.get(key)),
                        Some(Value::Array(items)) => match array_index(key) {
                            Some(index) => (PathElement::Index(index), items.get(index)),
                            None => (PathElement::Key(key.clone()), None),
                        },
                        _ => (PathElement::Key(key.clone()), None),
                    };
                    next.push(Resolved {
                        path: path.child(element),
                        value: child,
                    });
                }
                Segment::Index(index) => {
                    let child = match value {
                        Some(Value::Array(items)) => items.get(*index),
                        Some(Value::Object(map)) => map.get(&index.to_string()),
                        _ => None,
                    };
                    next.push(Resolved {
                        path: path.child(PathElement::Index(*index)),
                        value: child,
                    });
                }
                Segment::Wildcard => match value {
                    Some(Value::Array(items)) => {
                        next.extend(items.iter().enumerate().map(|(index, item)| Resolved {
                            path: path.child(PathElement::Index(index)),
                            value: Some(item),
                        }));
                    }
                    Some(Value::Object(map)) => {
                        next.extend(map.iter().map(|(key, item)| Resolved {
                            path: path.child(PathElement::Key(key.clone())),
                            value: Some(item),
                        }));
                    }
                    _ => {}
                },
            }
        }

        matches = next;
    }

    matches
}

fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}
