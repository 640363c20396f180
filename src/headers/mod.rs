//! Case insensitive header multimap.
use fnv::FnvHashMap;

mod name;

pub use name::standard;
use name::{Key, Uncased};

#[derive(Debug, Clone)]
struct Field {
    name: String,
    values: Vec<String>,
}

/// Ordered, case insensitive multimap of header fields.
///
/// Names keep the casing of their first insertion. Values of one name keep their
/// insertion order, and names iterate in the order they were first added.
#[derive(Clone, Default)]
pub struct HeaderTable {
    fields: Vec<Field>,
    index: FnvHashMap<Key, usize>,
    len: usize,
}

impl HeaderTable {
    /// Create new empty [`HeaderTable`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
            index: FnvHashMap::with_capacity_and_hasher(capacity, Default::default()),
            len: 0,
        }
    }

    /// Returns the number of values across all names.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.index.get(Uncased::new(name)).copied()
    }

    /// Add a value, keeping existing values of the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        self.len += 1;
        match self.position(&name) {
            Some(at) => self.fields[at].values.push(value),
            None => {
                self.index.insert(Key::new(&name), self.fields.len());
                self.fields.push(Field {
                    name,
                    values: vec![value],
                });
            }
        }
    }

    /// Replace every value of `name` with `value`, returning the previous values.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<Vec<String>> {
        let name = name.into();
        match self.position(&name) {
            Some(at) => {
                let field = &mut self.fields[at];
                let previous = std::mem::replace(&mut field.values, vec![value.into()]);
                self.len = self.len + 1 - previous.len();
                Some(previous)
            }
            None => {
                self.append(name, value);
                None
            }
        }
    }

    /// Returns the first value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// Returns every value of `name` in insertion order.
    pub fn get_all(&self, name: &str) -> &[String] {
        match self.position(name) {
            Some(at) => &self.fields[at].values,
            None => &[],
        }
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Returns `true` if any value of `name` contains `needle`, ignoring ASCII case.
    pub fn contains_ignore_case(&self, name: &str, needle: &str) -> bool {
        self.get_all(name)
            .iter()
            .any(|value| contains_ignore_case(value, needle))
    }

    /// Returns `true` if any comma separated element of `name` equals `token`,
    /// ignoring ASCII case.
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.get_all(name).iter().any(|value| {
            value
                .split(',')
                .any(|element| element.trim().eq_ignore_ascii_case(token))
        })
    }

    /// Remove every value of `name`.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        let at = self.index.remove(Uncased::new(name))?;
        let field = self.fields.remove(at);
        for position in self.index.values_mut() {
            if *position > at {
                *position -= 1;
            }
        }
        self.len -= field.values.len();
        Some(field.values)
    }

    pub fn clear(&mut self) {
        self.fields.clear();
        self.index.clear();
        self.len = 0;
    }

    /// Iterate `(name, value)` pairs, grouped by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().flat_map(|field| {
            field
                .values
                .iter()
                .map(|value| (field.name.as_str(), value.as_str()))
        })
    }
}

impl std::fmt::Debug for HeaderTable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// ASCII case insensitive substring search.
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.as_bytes();
    if needle.is_empty() {
        return true;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod test;
