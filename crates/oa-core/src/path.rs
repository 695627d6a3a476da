//! # Field Paths
//!
//! A `FieldPath` addresses one node in a JSON tree. Paths render in the
//! familiar `issuers[0].name` form and parse back from it; the rendered form
//! is what goes into leaf digests and salt lists, so rendering must stay
//! stable.
//!
//! A key that is empty or contains `.`, `[`, `]`, `"` or `\` renders in
//! bracket form as a JSON string, e.g. `a["b.c"]`, so no two distinct paths
//! share a rendering.

use serde_json::Value;

use crate::error::PathError;

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// Object member.
    Key(String),
    /// Array element.
    Index(usize),
}

/// A path from the root of a JSON value to one of its nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// The empty path (the root itself).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// A new path extended by an object key.
    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.to_string()));
        Self(segments)
    }

    /// A new path extended by an array index.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    /// The segments of this path, root first.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Returns true for the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Split into the parent path and the last segment.
    pub fn split_last(&self) -> Option<(FieldPath, &PathSegment)> {
        let (last, parent) = self.0.split_last()?;
        Some((Self(parent.to_vec()), last))
    }

    /// Returns true if `self` equals `prefix` or lies underneath it.
    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// A new path with every segment of `suffix` appended.
    pub fn join(&self, suffix: &FieldPath) -> Self {
        let mut segments = self.0.clone();
        segments.extend(suffix.0.iter().cloned());
        Self(segments)
    }

    /// Parse the `a.b[0].c` form, including quoted keys like `a["b.c"]`.
    ///
    /// # Errors
    ///
    /// Returns `PathError::Malformed` for empty bare keys, unterminated or
    /// non-numeric brackets, bad quoted keys and the empty string.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let malformed = |reason: &str| PathError::Malformed {
            path: input.to_string(),
            reason: reason.to_string(),
        };
        if input.is_empty() {
            return Err(malformed("empty path"));
        }

        let mut segments = Vec::new();
        let mut chars = input.chars().peekable();
        let mut key = String::new();
        // After a `]` only `.` or `[` may follow.
        let mut after_index = false;

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if key.is_empty() && !after_index {
                        return Err(malformed("empty key"));
                    }
                    if !key.is_empty() {
                        segments.push(PathSegment::Key(std::mem::take(&mut key)));
                    }
                    after_index = false;
                    if chars.peek().is_none() {
                        return Err(malformed("trailing '.'"));
                    }
                }
                '[' => {
                    if !key.is_empty() {
                        segments.push(PathSegment::Key(std::mem::take(&mut key)));
                    }
                    if chars.peek() == Some(&'"') {
                        let quoted = take_quoted(&mut chars)
                            .ok_or_else(|| malformed("unterminated quoted key"))?;
                        let k: String = serde_json::from_str(&quoted)
                            .map_err(|_| malformed("invalid quoted key"))?;
                        if chars.next() != Some(']') {
                            return Err(malformed("expected ']' after quoted key"));
                        }
                        segments.push(PathSegment::Key(k));
                        after_index = true;
                        continue;
                    }
                    let mut digits = String::new();
                    loop {
                        match chars.next() {
                            Some(']') => break,
                            Some(d) if d.is_ascii_digit() => digits.push(d),
                            Some(_) => return Err(malformed("non-numeric index")),
                            None => return Err(malformed("unterminated '['")),
                        }
                    }
                    let index = digits
                        .parse::<usize>()
                        .map_err(|_| malformed("empty or oversized index"))?;
                    segments.push(PathSegment::Index(index));
                    after_index = true;
                }
                ']' => return Err(malformed("unexpected ']'")),
                '"' | '\\' => return Err(malformed("quote or backslash in bare key")),
                other => {
                    if after_index {
                        return Err(malformed("expected '.' or '[' after index"));
                    }
                    key.push(other);
                }
            }
        }
        if !key.is_empty() {
            segments.push(PathSegment::Key(key));
        }
        Ok(Self(segments))
    }

    /// Look up the node this path addresses.
    pub fn get<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.0.iter().try_fold(root, |node, segment| match segment {
            PathSegment::Key(k) => node.as_object()?.get(k),
            PathSegment::Index(i) => node.as_array()?.get(*i),
        })
    }

    /// Mutable lookup of the node this path addresses.
    pub fn get_mut<'a>(&self, root: &'a mut Value) -> Option<&'a mut Value> {
        self.0.iter().try_fold(root, |node, segment| match segment {
            PathSegment::Key(k) => node.as_object_mut()?.get_mut(k),
            PathSegment::Index(i) => node.as_array_mut()?.get_mut(*i),
        })
    }
}

/// Read a JSON string literal, quotes included, from `chars`.
fn take_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<String> {
    let mut literal = String::new();
    literal.push(chars.next()?);
    loop {
        let c = chars.next()?;
        literal.push(c);
        match c {
            '\\' => literal.push(chars.next()?),
            '"' => return Some(literal),
            _ => {}
        }
    }
}

fn is_bare_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(['.', '[', ']', '"', '\\'])
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(k) if !is_bare_key(k) => {
                    let quoted = serde_json::to_string(k).map_err(|_| std::fmt::Error)?;
                    write!(f, "[{quoted}]")?
                }
                PathSegment::Key(k) if i == 0 => f.write_str(k)?,
                PathSegment::Key(k) => write!(f, ".{k}")?,
                PathSegment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
