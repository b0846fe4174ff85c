//! Unknown-field bookkeeping for strict decoding.

use std::{
    collections::HashSet,
    error::Error,
    fmt::{self, Display},
};

use crate::value::Map;

/// A source key that no destination field consumed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct UnknownFieldError {
    path: String,
}

impl UnknownFieldError {
    /// Full path of the unknown key from the decode root, e.g. `spec.containers[0].extra`.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Display for UnknownFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown field \"{}\"", self.path)
    }
}

impl Error for UnknownFieldError {}

/// Every unknown field found by one strict decode, ordered by rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrictDecodingError {
    errors: Vec<UnknownFieldError>,
}

impl StrictDecodingError {
    pub(crate) fn new(mut errors: Vec<UnknownFieldError>) -> Self {
        errors.sort_by_cached_key(|e| e.to_string());
        Self { errors }
    }

    /// The individual unknown-field errors.
    pub fn errors(&self) -> &[UnknownFieldError] {
        &self.errors
    }
}

impl Display for StrictDecodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("strict decoding error: ")?;
        for (i, err) in self.errors.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl Error for StrictDecodingError {}

/// Tracks, for one top-level decode, which keys each open struct level consumed
/// and where in the source tree the decoder currently is.
///
/// When disabled every operation is a no-op, so the non-strict path pays nothing
/// beyond a branch.
#[derive(Debug, Default)]
pub(crate) struct StrictContext {
    enabled: bool,
    inlined: bool,
    matched_keys: Vec<HashSet<String>>,
    path: String,
    unknown: Vec<UnknownFieldError>,
}

impl StrictContext {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }

    /// Current rendered path, used for trace output.
    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    /// Length marker to restore the path to after leaving a scope.
    pub(crate) fn mark(&self) -> usize {
        self.path.len()
    }

    pub(crate) fn truncate(&mut self, mark: usize) {
        self.path.truncate(mark);
    }

    pub(crate) fn push_key(&mut self, key: &str) {
        if !self.enabled {
            return;
        }
        if !self.path.is_empty() {
            self.path.push('.');
        }
        self.path.push_str(key);
    }

    pub(crate) fn push_index(&mut self, index: usize) {
        if !self.enabled {
            return;
        }
        self.path.push('[');
        self.path.push_str(&index.to_string());
        self.path.push(']');
    }

    pub(crate) fn is_inlined(&self) -> bool {
        self.inlined
    }

    /// Sets the inlined flag, returning the previous value.
    pub(crate) fn set_inlined(&mut self, inlined: bool) -> bool {
        std::mem::replace(&mut self.inlined, inlined)
    }

    pub(crate) fn push_matched_key_tracker(&mut self) {
        if !self.enabled {
            return;
        }
        self.matched_keys.push(HashSet::new());
    }

    pub(crate) fn record_matched_key(&mut self, key: &str) {
        if !self.enabled {
            return;
        }
        if let Some(current) = self.matched_keys.last_mut() {
            current.insert(key.to_owned());
        }
    }

    /// Closes the current struct level, recording every key of `source` that
    /// was not matched.
    pub(crate) fn pop_and_verify_matched_keys(&mut self, source: &Map) {
        if !self.enabled {
            return;
        }
        let Some(matched) = self.matched_keys.pop() else {
            return;
        };
        for key in source.keys() {
            if !matched.contains(key) {
                self.record_unknown_field(key);
            }
        }
    }

    fn record_unknown_field(&mut self, key: &str) {
        let mark = self.mark();
        self.push_key(key);
        log::trace!("Recording unknown field at {}", self.path);
        self.unknown.push(UnknownFieldError {
            path: self.path.clone(),
        });
        self.truncate(mark);
    }

    /// Consumes the context, yielding the composite error if any unknown field was seen.
    pub(crate) fn finish(self) -> Option<StrictDecodingError> {
        if !self.enabled || self.unknown.is_empty() {
            return None;
        }
        Some(StrictDecodingError::new(self.unknown))
    }
}
