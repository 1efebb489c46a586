//! Uniform result of a repository call as seen by a screen

/// Loading, a value, or a message ready to show the user
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Loading,
    Success(T),
    Error(String),
}

impl<T> Outcome<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Outcome::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// The value, if successful
    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Loading | Outcome::Error(_) => None,
        }
    }

    /// The error message, if failed
    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Error(message) => Some(message),
            Outcome::Loading | Outcome::Success(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Loading => Outcome::Loading,
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Error(message) => Outcome::Error(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let ok: Outcome<u8> = Outcome::Success(3);
        assert!(ok.is_success());
        assert_eq!(ok.clone().success(), Some(3));
        assert_eq!(ok.error(), None);

        let failed: Outcome<u8> = Outcome::Error("Invalid credentials".to_string());
        assert_eq!(failed.error(), Some("Invalid credentials"));
        assert_eq!(failed.success(), None);

        assert!(Outcome::<u8>::Loading.is_loading());
    }

    #[test]
    fn test_map_keeps_errors() {
        let failed: Outcome<u8> = Outcome::Error("boom".to_string());
        assert_eq!(failed.map(|v| v * 2), Outcome::Error("boom".to_string()));
        assert_eq!(Outcome::Success(2).map(|v| v * 2), Outcome::Success(4));
    }
}
