use std::fmt::Display;

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Segment {
    Field(String),
    Index(usize),
    Key(String),
}

/// Location of a field inside a source object, e.g. `VirtualService.spec.http[0].match[1].headers[x-foo]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn new(root: &str) -> Self {
        Self { segments: vec![Segment::Field(root.to_owned())] }
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        self.push(Segment::Field(name.to_owned()))
    }

    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.push(Segment::Index(index))
    }

    #[must_use]
    pub fn key(&self, key: &str) -> Self {
        self.push(Segment::Key(key.to_owned()))
    }

    fn push(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Field(name) if i == 0 => write!(f, "{name}")?,
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
                Segment::Key(key) => write!(f, "[{key}]")?,
            }
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("{path}: Invalid value: {value:?}: {detail}")]
    Invalid { path: FieldPath, value: String, detail: String },
    #[error("{path}: Required value: {detail}")]
    Required { path: FieldPath, detail: String },
    #[error("{path}: Unsupported value: {value:?}: supported values: {}", .supported.join(", "))]
    NotSupported { path: FieldPath, value: String, supported: Vec<String> },
}

impl FieldError {
    pub fn invalid(path: FieldPath, value: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Invalid { path, value: value.into(), detail: detail.into() }
    }

    pub fn required(path: FieldPath, detail: impl Into<String>) -> Self {
        Self::Required { path, detail: detail.into() }
    }

    pub fn not_supported(path: FieldPath, value: impl Into<String>, supported: &[&str]) -> Self {
        Self::NotSupported {
            path,
            value: value.into(),
            supported: supported.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

/// Every field error collected while converting. Nothing aborts on the first problem.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorList(Vec<FieldError>);

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }
}

impl Display for ErrorList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self.0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
        write!(f, "{joined}")
    }
}

impl std::error::Error for ErrorList {}

impl Extend<FieldError> for ErrorList {
    fn extend<T: IntoIterator<Item = FieldError>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl FromIterator<FieldError> for ErrorList {
    fn from_iter<T: IntoIterator<Item = FieldError>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ErrorList {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_field_path_rendering() {
        let path = FieldPath::new("VirtualService").child("spec").child("http").index(0).child("match").index(1).child("headers").key("x-foo");
        assert_eq!(path.to_string(), "VirtualService.spec.http[0].match[1].headers[x-foo]");
    }

    #[test]
    pub fn test_error_list_joins_every_error() {
        let root = FieldPath::new("Gateway").child("spec").child("servers");
        let mut errors = ErrorList::new();
        assert!(errors.is_empty());
        errors.push(FieldError::required(root.index(0).child("port"), "port is required"));
        errors.push(FieldError::not_supported(root.index(1).child("port").child("protocol"), "FTP", &["HTTP", "HTTPS"]));

        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors.to_string(),
            "Gateway.spec.servers[0].port: Required value: port is required; Gateway.spec.servers[1].port.protocol: Unsupported value: \"FTP\": supported values: HTTP, HTTPS"
        );
    }
}
