//! Structural (expression-tree) form of a compiled view.
//!
//! Built from primitive operators only; carries no textual escaping.

use crate::view::{
    JoinKind,
    literal::Literal,
    member::{ExtentRef, MemberPath},
    predicate::CompareOp,
};
use std::fmt;

///
/// Binding
///
/// An input expression bound to a row variable.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Binding {
    pub expr: Expr,
    pub var: String,
}

impl Binding {
    #[must_use]
    pub fn new(expr: Expr, var: impl Into<String>) -> Self {
        Self {
            expr,
            var: var.into(),
        }
    }
}

///
/// Expr
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Expr {
    // relational
    Scan(ExtentRef),
    Filter {
        input: Box<Binding>,
        predicate: Box<Self>,
    },
    Project {
        input: Box<Binding>,
        columns: Vec<(String, Self)>,
    },
    Distinct(Box<Self>),
    Join {
        kind: JoinKind,
        left: Box<Binding>,
        right: Box<Binding>,
        on: Box<Self>,
    },
    UnionAll(Box<Self>, Box<Self>),

    // scalar
    Var(String),
    Property {
        instance: Box<Self>,
        name: String,
    },
    Constant(Literal),
    Compare {
        op: CompareOp,
        left: Box<Self>,
        right: Box<Self>,
    },
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    IsNull(Box<Self>),
    IsOf {
        input: Box<Self>,
        type_name: String,
        only: bool,
    },
    Case {
        whens: Vec<(Self, Self)>,
        otherwise: Box<Self>,
    },
}

impl Expr {
    #[must_use]
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    #[must_use]
    pub fn property(self, name: impl Into<String>) -> Self {
        Self::Property {
            instance: Box::new(self),
            name: name.into(),
        }
    }

    /// Walk a member path starting at this row.
    #[must_use]
    pub fn member(&self, path: &MemberPath) -> Self {
        path.parts()
            .iter()
            .fold(self.clone(), |acc, part| acc.property(part.as_str()))
    }

    /// Column names of the rows this expression produces, when it is a
    /// relational operator.
    #[must_use]
    pub fn output_columns(&self) -> Option<Vec<&str>> {
        match self {
            Self::Project { columns, .. } => {
                Some(columns.iter().map(|(name, _)| name.as_str()).collect())
            }
            Self::Distinct(inner) | Self::UnionAll(inner, _) => inner.output_columns(),
            Self::Filter { input, .. } => input.expr.output_columns(),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scan(extent) => write!(f, "Scan({extent})"),
            Self::Filter { input, predicate } => {
                write!(f, "Filter({} := {}, {predicate})", input.var, input.expr)
            }
            Self::Project { input, columns } => {
                write!(f, "Project({} := {}, [", input.var, input.expr)?;
                for (i, (name, expr)) in columns.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name} := {expr}")?;
                }
                f.write_str("])")
            }
            Self::Distinct(inner) => write!(f, "Distinct({inner})"),
            Self::Join {
                kind,
                left,
                right,
                on,
            } => write!(
                f,
                "{kind:?}({} := {}, {} := {}, {on})",
                left.var, left.expr, right.var, right.expr
            ),
            Self::UnionAll(left, right) => write!(f, "UnionAll({left}, {right})"),
            Self::Var(name) => f.write_str(name),
            Self::Property { instance, name } => write!(f, "{instance}.{name}"),
            Self::Constant(literal) => write!(f, "{literal}"),
            Self::Compare { op, left, right } => write!(f, "({left} {op} {right})"),
            Self::And(children) => write_connective(f, children, " AND "),
            Self::Or(children) => write_connective(f, children, " OR "),
            Self::Not(inner) => write!(f, "NOT {inner}"),
            Self::IsNull(inner) => write!(f, "({inner} IS NULL)"),
            Self::IsOf {
                input,
                type_name,
                only,
            } => write!(
                f,
                "({input} IS OF ({}{type_name}))",
                if *only { "ONLY " } else { "" }
            ),
            Self::Case { whens, otherwise } => {
                f.write_str("CASE")?;
                for (when, then) in whens {
                    write!(f, " WHEN {when} THEN {then}")?;
                }
                write!(f, " ELSE {otherwise} END")
            }
        }
    }
}

fn write_connective(f: &mut fmt::Formatter<'_>, children: &[Expr], separator: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{child}")?;
    }
    f.write_str(")")
}
