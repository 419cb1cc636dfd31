use std::fmt;
use std::sync::Arc;

/// One message parameter.
///
/// `Shared` avoids copying strings that many messages repeat (a channel
/// name, a quit reason). `Placeholder` reserves a position to be filled by
/// [`Message::replace_param`](super::Message::replace_param) later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Owned(String),
    Shared(Arc<str>),
    Placeholder,
}

impl Param {
    /// The text, or `None` for an unfilled placeholder.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Param::Owned(s) => Some(s),
            Param::Shared(s) => Some(s),
            Param::Placeholder => None,
        }
    }

    #[inline]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Param::Placeholder)
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Param::Owned(s)
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Param::Owned(s.to_string())
    }
}

impl From<Arc<str>> for Param {
    fn from(s: Arc<str>) -> Self {
        Param::Shared(s)
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or("*"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_and_shared_read_the_same() {
        let shared: Arc<str> = Arc::from("#rust");
        assert_eq!(Param::from("#rust").as_str(), Param::from(shared).as_str());
    }

    #[test]
    fn test_placeholder_has_no_text() {
        assert_eq!(Param::Placeholder.as_str(), None);
        assert!(Param::Placeholder.is_placeholder());
        assert_eq!(Param::Placeholder.to_string(), "*");
    }
}
