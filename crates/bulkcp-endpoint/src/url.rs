//! Endpoint URLs
//!
//! A light scheme/path split, not a full URL parser. Syntax validation is
//! the business of the endpoint that eventually opens the URL; strings
//! without a scheme are treated as local file paths.

use std::fmt;

/// URL identifying an object on a storage endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointUrl {
    raw: String,
    scheme: String,
    path: String,
}

impl EndpointUrl {
    /// Parse a URL string
    ///
    /// `"file:///a/b"` splits into scheme `file` and path `/a/b`; a bare
    /// path like `"/a/b"` coerces to the `file` scheme.
    pub fn parse(input: &str) -> Self {
        match input.split_once("://") {
            Some((scheme, rest)) => Self {
                raw: input.to_string(),
                scheme: scheme.to_string(),
                path: rest.to_string(),
            },
            None => Self {
                raw: input.to_string(),
                scheme: "file".to_string(),
                path: input.to_string(),
            },
        }
    }

    /// The URL scheme, lowercase by convention
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The part after the scheme separator
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The original string
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for EndpointUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl From<&str> for EndpointUrl {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for EndpointUrl {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("file:///tmp/a", "file", "/tmp/a")]
    #[case("mem://bucket/key", "mem", "bucket/key")]
    #[case("/var/data/x", "file", "/var/data/x")]
    #[case("relative/path", "file", "relative/path")]
    fn test_parse(#[case] input: &str, #[case] scheme: &str, #[case] path: &str) {
        let url = EndpointUrl::parse(input);
        assert_eq!(url.scheme(), scheme);
        assert_eq!(url.path(), path);
        assert_eq!(url.as_str(), input);
    }
}
