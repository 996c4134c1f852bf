pub use self::regex::RegexPattern;

pub mod regex {
    use std::{fmt, ops::Deref};

    use ::lazy_regex::Regex;
    use ::serde::{
        de::{self, Visitor},
        Deserialize, Serialize,
    };

    /// A compiled regular expression that (de)serializes as its source string.
    #[derive(Debug, Clone)]
    pub struct RegexPattern(Regex);

    impl RegexPattern {
        pub fn parse(pattern: &str) -> Result<Self, impl std::error::Error> {
            Regex::new(pattern).map(Self)
        }
    }

    impl Deref for RegexPattern {
        type Target = Regex;

        fn deref(&self) -> &Self::Target {
            &self.0
        }
    }

    impl PartialEq for RegexPattern {
        fn eq(&self, other: &Self) -> bool {
            self.0.as_str() == other.0.as_str()
        }
    }

    impl Eq for RegexPattern {}

    impl fmt::Display for RegexPattern {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0.as_str())
        }
    }

    impl Serialize for RegexPattern {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            serializer.serialize_str(self.0.as_str())
        }
    }

    impl<'de> Deserialize<'de> for RegexPattern {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            struct RegexPatternVisitor;

            impl<'de> Visitor<'de> for RegexPatternVisitor {
                type Value = RegexPattern;

                fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    write!(f, "a regular expression string")
                }

                fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Self::Value::parse(v).map_err(de::Error::custom)
                }
            }

            deserializer.deserialize_str(RegexPatternVisitor)
        }
    }

}
