//! Parameter-shape tokens used as cache key identity fields.

use crate::{cache::KeyError, view::escape::is_simple_identifier};
use derive_more::{Deref, Display};
use std::{collections::BTreeSet, fmt::Write as _};

const TOKEN_PREFIX: &str = "@@";

///
/// Parameter
///
/// One named, typed query parameter as seen at the call site.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Parameter {
    name: String,
    type_name: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Result<Self, KeyError> {
        let name = name.into();
        let type_name = type_name.into();

        if !is_simple_identifier(&name) {
            return Err(KeyError::InvalidParameterName { name });
        }
        if type_name.is_empty() {
            return Err(KeyError::EmptyParameterType { name });
        }

        Ok(Self { name, type_name })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

///
/// ParameterShape
///
/// Ordered parameter list whose token participates in key identity.
/// Order is significant: `(a, b)` and `(b, a)` are different shapes.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParameterShape {
    parameters: Vec<Parameter>,
}

impl ParameterShape {
    /// Shape with no parameters.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    /// Build a shape from ordered parameters, rejecting duplicate names.
    pub fn new(parameters: impl IntoIterator<Item = Parameter>) -> Result<Self, KeyError> {
        let parameters: Vec<Parameter> = parameters.into_iter().collect();
        let mut seen = BTreeSet::new();
        for parameter in &parameters {
            if !seen.insert(parameter.name.as_str()) {
                return Err(KeyError::DuplicateParameter {
                    name: parameter.name.clone(),
                });
            }
        }

        Ok(Self { parameters })
    }

    /// Build a shape from `(name, type)` pairs.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, KeyError> {
        let parameters = pairs
            .into_iter()
            .map(|(name, type_name)| Parameter::new(name, type_name))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(parameters)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.parameters.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Render the shape token.
    ///
    /// The token always opens with the parameter count, so the empty shape
    /// renders as the explicit `@@0` sentinel and a one-parameter shape can
    /// never coincide with a multi-parameter one. Type names are length
    /// prefixed because they may contain any character.
    #[must_use]
    pub fn token(&self) -> ShapeToken {
        let mut out = String::with_capacity(8 + self.parameters.len() * 24);
        let _ = write!(out, "{TOKEN_PREFIX}{}", self.parameters.len());
        for parameter in &self.parameters {
            let _ = write!(
                out,
                ";{}:{}:{}",
                parameter.name,
                parameter.type_name.len(),
                parameter.type_name
            );
        }

        ShapeToken(out)
    }
}

///
/// ShapeToken
///
/// Rendered parameter shape; compared ordinally.
///

#[derive(Clone, Debug, Deref, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ShapeToken(String);

impl ShapeToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parameter count embedded in the token.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.0[TOKEN_PREFIX.len()..]
            .split(';')
            .next()
            .and_then(|count| count.parse().ok())
            .unwrap_or(0)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_shape_uses_explicit_sentinel() {
        let token = ParameterShape::empty().token();

        assert_eq!(token.as_str(), "@@0");
        assert_eq!(token.parameter_count(), 0);
    }

    #[test]
    fn token_embeds_count_and_order() {
        let ab = ParameterShape::from_pairs([("a", "Edm.Int32"), ("b", "Edm.String")])
            .expect("valid shape");
        let ba = ParameterShape::from_pairs([("b", "Edm.String"), ("a", "Edm.Int32")])
            .expect("valid shape");

        assert_eq!(ab.token().parameter_count(), 2);
        assert_ne!(ab.token(), ba.token());
    }

    #[test]
    fn single_and_multi_parameter_tokens_do_not_collide() {
        // A type name that contains what would otherwise look like a second parameter.
        let single = ParameterShape::from_pairs([("a", "T;b:1:U")]).expect("valid shape");
        let multi = ParameterShape::from_pairs([("a", "T"), ("b", "U")]).expect("valid shape");

        assert_ne!(single.token(), multi.token());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = ParameterShape::from_pairs([("a", "Edm.Int32"), ("a", "Edm.Int64")])
            .expect_err("duplicate names must fail");

        assert!(matches!(err, KeyError::DuplicateParameter { name } if name == "a"));
    }

    #[test]
    fn invalid_names_and_types_fail_fast() {
        assert!(matches!(
            Parameter::new("", "Edm.Int32"),
            Err(KeyError::InvalidParameterName { .. })
        ));
        assert!(matches!(
            Parameter::new("has space", "Edm.Int32"),
            Err(KeyError::InvalidParameterName { .. })
        ));
        assert!(matches!(
            Parameter::new("p", ""),
            Err(KeyError::EmptyParameterType { .. })
        ));
    }
}
