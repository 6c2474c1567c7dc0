use crate::view::{
    ViewError,
    escape::{ReservedKeywords, format_qualified_name},
};
use std::fmt;

///
/// MemberPath
///
/// Non-empty dotted path to a member of a row, e.g. `Address.City`.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MemberPath(Vec<String>);

impl MemberPath {
    pub fn new<I, S>(parts: I) -> Result<Self, ViewError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts: Vec<String> = parts.into_iter().map(Into::into).collect();
        if parts.is_empty() || parts.iter().any(String::is_empty) {
            return Err(ViewError::InvalidMemberPath {
                path: parts.join("."),
            });
        }

        Ok(Self(parts))
    }

    /// Single-member path.
    pub fn member(name: impl Into<String>) -> Result<Self, ViewError> {
        Self::new([name.into()])
    }

    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Column alias used when this member is projected: parts joined by `_`.
    #[must_use]
    pub fn field_alias(&self) -> String {
        self.0.join("_")
    }

    /// `<row>.<part>.<part>` with every segment escaped.
    pub(crate) fn render(&self, row: &str, keywords: &dyn ReservedKeywords) -> String {
        format_qualified_name(
            std::iter::once(row).chain(self.0.iter().map(String::as_str)),
            keywords,
        )
    }
}

impl fmt::Display for MemberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

///
/// OutputMember
///
/// What one projected column stands for: a member of the view's result
/// type, or a boolean "row came from fragment n" flag.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum OutputMember {
    Member(MemberPath),
    Flag(usize),
}

impl OutputMember {
    #[must_use]
    pub fn field_alias(&self) -> String {
        match self {
            Self::Member(path) => path.field_alias(),
            Self::Flag(index) => format!("_from{index}"),
        }
    }
}

impl From<MemberPath> for OutputMember {
    fn from(path: MemberPath) -> Self {
        Self::Member(path)
    }
}

///
/// ExtentRef
///
/// An extent addressed by its container: `<container>.<extent>`.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ExtentRef {
    container: String,
    name: String,
}

impl ExtentRef {
    pub fn new(container: impl Into<String>, name: impl Into<String>) -> Result<Self, ViewError> {
        let container = container.into();
        let name = name.into();
        if container.is_empty() || name.is_empty() {
            return Err(ViewError::InvalidExtent {
                extent: format!("{container}.{name}"),
            });
        }

        Ok(Self { container, name })
    }

    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lookup name used by the query layer.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.container, self.name)
    }

    pub(crate) fn render(&self, keywords: &dyn ReservedKeywords) -> String {
        format_qualified_name([self.container.as_str(), self.name.as_str()], keywords)
    }
}

impl fmt::Display for ExtentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.container, self.name)
    }
}
