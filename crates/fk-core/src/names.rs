//! Strongly-typed table and column names.
//!
//! Both wrappers share one invariant (non-empty) and one set of trait impls,
//! generated by [`define_name`].

macro_rules! define_name {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "String", into = "String")]
        $vis struct $Name(String);

        impl $Name {
            /// Create a new name, panicking if it is empty.
            ///
            /// Prefer [`try_new`](Self::try_new) for names read from a database or a file.
            pub fn new(name: impl Into<String>) -> Self {
                let s = name.into();
                assert!(!s.is_empty(), concat!(stringify!($Name), " must not be empty"));
                Self(s)
            }

            /// Try to create a new name, returning `None` if it is empty.
            pub fn try_new(name: impl Into<String>) -> Option<Self> {
                let s = name.into();
                if s.is_empty() { None } else { Some(Self(s)) }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $Name {
            fn as_ref(&self) -> &str { &self.0 }
        }

        impl std::ops::Deref for $Name {
            type Target = str;
            fn deref(&self) -> &str { &self.0 }
        }

        impl std::borrow::Borrow<str> for $Name {
            fn borrow(&self) -> &str { &self.0 }
        }

        impl TryFrom<String> for $Name {
            type Error = String;
            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::try_new(s).ok_or_else(|| concat!(stringify!($Name), " must not be empty").to_string())
            }
        }

        impl From<$Name> for String {
            fn from(name: $Name) -> String { name.0 }
        }

        impl PartialEq<str> for $Name {
            fn eq(&self, other: &str) -> bool { self.0 == other }
        }

        impl PartialEq<&str> for $Name {
            fn eq(&self, other: &&str) -> bool { self.0 == *other }
        }
    };
}

define_name! {
    /// Name of a table in the database schema.
    pub struct TableName;
}

define_name! {
    /// Name of a column in the database schema.
    ///
    /// Dataset column names stay plain `String`s; only names that were
    /// checked against the schema are wrapped.
    pub struct ColumnName;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_new_rejects_empty() {
        assert!(TableName::try_new("").is_none());
        assert_eq!(TableName::try_new("orders").unwrap(), "orders");
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut names = vec![TableName::new("b"), TableName::new("a"), TableName::new("c")];
        names.sort();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_deserialize_rejects_empty() {
        let result: Result<ColumnName, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
        let name: ColumnName = serde_json::from_str("\"amount\"").unwrap();
        assert_eq!(name.as_str(), "amount");
    }
}
