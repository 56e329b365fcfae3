/// Result of an idempotent operation.
///
/// `NoChange` carries the human-readable reason the write was skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Applied(T),
    NoChange(String),
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn is_no_change(&self) -> bool {
        matches!(self, Self::NoChange(_))
    }

    /// The applied value, if a write happened.
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(v) => Some(v),
            Self::NoChange(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Applied(v) => Outcome::Applied(f(v)),
            Self::NoChange(reason) => Outcome::NoChange(reason),
        }
    }

    pub(crate) fn no_change(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::debug!(%reason, "skipping write");
        Self::NoChange(reason)
    }
}
