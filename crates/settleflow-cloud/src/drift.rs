//! Field-by-field drift detection between desired and observed settings
//!
//! Both sides must already be normalized by the same flatten logic used for
//! Read. The comparator only decides equality per field.

/// Comparison rules for a settings block
///
/// Implementations should destructure `self` exhaustively so that a new
/// field cannot be added without choosing a rule for it.
pub trait Settle {
    fn compare(&self, observed: &Self, drift: &mut Drift);
}

/// Mismatched field paths collected during one comparison
#[derive(Debug, Default, Clone)]
pub struct Drift {
    prefix: String,
    fields: Vec<String>,
}

impl Drift {
    pub fn new() -> Self {
        Self::default()
    }

    fn path(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.prefix, name)
        }
    }

    /// Record `name` as drifted unless `matched`
    pub fn check(&mut self, name: &str, matched: bool) {
        if !matched {
            let path = self.path(name);
            self.fields.push(path);
        }
    }

    pub fn exact<T: PartialEq + ?Sized>(&mut self, name: &str, desired: &T, observed: &T) {
        self.check(name, desired == observed);
    }

    /// Enumerations the backend may echo back in a different case
    pub fn case_insensitive(&mut self, name: &str, desired: &str, observed: &str) {
        self.check(name, desired.eq_ignore_ascii_case(observed));
    }

    /// Fields the backend never returns; always treated as settled
    pub fn write_only(&mut self, name: &str) {
        tracing::trace!("skipping write-only field {}", self.path(name));
    }

    /// Optional sub-block: presence is checked before any field is compared
    pub fn nested<T: Settle>(&mut self, name: &str, desired: Option<&T>, observed: Option<&T>) {
        match (desired, observed) {
            (None, None) => {}
            (Some(desired), Some(observed)) => {
                let mut inner = Drift {
                    prefix: self.path(name),
                    fields: Vec::new(),
                };
                desired.compare(observed, &mut inner);
                self.fields.append(&mut inner.fields);
            }
            _ => self.check(name, false),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// Compare two blocks and return the drifted field paths
pub fn diff<T: Settle>(desired: &T, observed: &T) -> Drift {
    let mut drift = Drift::new();
    desired.compare(observed, &mut drift);
    drift
}
