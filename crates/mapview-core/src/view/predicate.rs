//! Row predicates with textual and structural rendering.

use crate::view::{
    escape::{ReservedKeywords, format_identifier, format_qualified_name},
    expr::Expr,
    literal::Literal,
    member::MemberPath,
};
use std::fmt;

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }

    pub(crate) const fn tag(self) -> u8 {
        match self {
            Self::Eq => 0x01,
            Self::Ne => 0x02,
            Self::Lt => 0x03,
            Self::Lte => 0x04,
            Self::Gt => 0x05,
            Self::Gte => 0x06,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

///
/// Predicate
///
/// Boolean condition over one row. `True` is the trivial sentinel: blocks
/// compare against it by equality to decide whether to emit a filter.
///

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum Predicate {
    #[default]
    True,
    False,
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare {
        member: MemberPath,
        op: CompareOp,
        value: Literal,
    },
    IsNull(MemberPath),
    IsNotNull(MemberPath),
    IsOf {
        type_name: String,
        only: bool,
    },
}

impl Predicate {
    #[must_use]
    pub fn compare(member: MemberPath, op: CompareOp, value: impl Into<Literal>) -> Self {
        Self::Compare {
            member,
            op,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn equals(member: MemberPath, value: impl Into<Literal>) -> Self {
        Self::compare(member, CompareOp::Eq, value)
    }

    /// Conjunction that drops `True` operands and flattens nested `And`s.
    #[must_use]
    pub fn and(operands: impl IntoIterator<Item = Self>) -> Self {
        let mut flat = Vec::new();
        for operand in operands {
            match operand {
                Self::True => {}
                Self::And(children) => flat.extend(children),
                other => flat.push(other),
            }
        }

        match flat.len() {
            0 => Self::True,
            1 => flat.remove(0),
            _ => Self::And(flat),
        }
    }

    /// Disjunction that drops `False` operands and flattens nested `Or`s.
    #[must_use]
    pub fn or(operands: impl IntoIterator<Item = Self>) -> Self {
        let mut flat = Vec::new();
        for operand in operands {
            match operand {
                Self::False => {}
                Self::Or(children) => flat.extend(children),
                other => flat.push(other),
            }
        }

        match flat.len() {
            0 => Self::False,
            1 => flat.remove(0),
            _ => Self::Or(flat),
        }
    }

    /// Rebuild connectives bottom-up: an empty `And` becomes `True`, an
    /// empty `Or` becomes `False`, single operands are unwrapped.
    #[must_use]
    pub fn normalized(self) -> Self {
        match self {
            Self::And(children) => Self::and(children.into_iter().map(Self::normalized)),
            Self::Or(children) => Self::or(children.into_iter().map(Self::normalized)),
            Self::Not(inner) => Self::Not(Box::new(inner.normalized())),
            other => other,
        }
    }

    #[must_use]
    pub fn is_trivially_true(&self) -> bool {
        *self == Self::True
    }

    /// Textual form evaluated against the row named `row`.
    #[must_use]
    pub fn render(&self, row: &str, keywords: &dyn ReservedKeywords) -> String {
        match self {
            Self::True => Literal::Bool(true).to_string(),
            Self::False => Literal::Bool(false).to_string(),
            Self::And(children) if children.is_empty() => Literal::Bool(true).to_string(),
            Self::Or(children) if children.is_empty() => Literal::Bool(false).to_string(),
            Self::And(children) => render_connective(children, " AND ", row, keywords),
            Self::Or(children) => render_connective(children, " OR ", row, keywords),
            Self::Not(inner) => format!("NOT ({})", inner.render(row, keywords)),
            Self::Compare { member, op, value } => {
                format!("{} {op} {value}", member.render(row, keywords))
            }
            Self::IsNull(member) => format!("{} IS NULL", member.render(row, keywords)),
            Self::IsNotNull(member) => format!("{} IS NOT NULL", member.render(row, keywords)),
            Self::IsOf { type_name, only } => format!(
                "{} IS OF ({}{})",
                format_identifier(row, keywords),
                if *only { "ONLY " } else { "" },
                format_qualified_name(type_name.split('.'), keywords)
            ),
        }
    }

    /// Structural form evaluated against `row`.
    #[must_use]
    pub fn to_expr(&self, row: &Expr) -> Expr {
        match self {
            Self::True => Expr::Constant(Literal::Bool(true)),
            Self::False => Expr::Constant(Literal::Bool(false)),
            Self::And(children) if children.is_empty() => Expr::Constant(Literal::Bool(true)),
            Self::Or(children) if children.is_empty() => Expr::Constant(Literal::Bool(false)),
            Self::And(children) => Expr::And(children.iter().map(|c| c.to_expr(row)).collect()),
            Self::Or(children) => Expr::Or(children.iter().map(|c| c.to_expr(row)).collect()),
            Self::Not(inner) => Expr::Not(Box::new(inner.to_expr(row))),
            Self::Compare { member, op, value } => Expr::Compare {
                op: *op,
                left: Box::new(row.member(member)),
                right: Box::new(Expr::Constant(value.clone())),
            },
            Self::IsNull(member) => Expr::IsNull(Box::new(row.member(member))),
            Self::IsNotNull(member) => {
                Expr::Not(Box::new(Expr::IsNull(Box::new(row.member(member)))))
            }
            Self::IsOf { type_name, only } => Expr::IsOf {
                input: Box::new(row.clone()),
                type_name: type_name.clone(),
                only: *only,
            },
        }
    }
}

fn render_connective(
    children: &[Predicate],
    separator: &str,
    row: &str,
    keywords: &dyn ReservedKeywords,
) -> String {
    children
        .iter()
        .map(|child| match child {
            Predicate::And(_) | Predicate::Or(_) => format!("({})", child.render(row, keywords)),
            _ => child.render(row, keywords),
        })
        .collect::<Vec<_>>()
        .join(separator)
}

///
/// TESTS
///
