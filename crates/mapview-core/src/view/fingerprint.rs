//! Deterministic fingerprint of a mapping cell tree.
#![allow(clippy::cast_possible_truncation)]

use crate::view::{
    block::{ColumnRef, ExtentColumn, ExtentSpec, OnClause},
    literal::Literal,
    member::{ExtentRef, MemberPath},
    model::CellTree,
    predicate::Predicate,
};
use sha2::{Digest, Sha256};

///
/// MappingFingerprint
///
/// Stable, deterministic fingerprint of a mapping shape.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MappingFingerprint([u8; 32]);

impl MappingFingerprint {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn as_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            use std::fmt::Write as _;
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl std::fmt::Display for MappingFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_hex())
    }
}

impl CellTree {
    /// Compute a stable fingerprint for this mapping shape.
    #[must_use]
    pub fn fingerprint(&self) -> MappingFingerprint {
        let mut hasher = Sha256::new();
        hasher.update(b"mapfp:v1");
        hash_cell(&mut hasher, self);
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        MappingFingerprint(out)
    }
}

fn hash_cell(hasher: &mut Sha256, cell: &CellTree) {
    match cell {
        CellTree::Fragment(spec) => {
            write_tag(hasher, 0x10);
            hash_extent_spec(hasher, spec);
        }
        CellTree::Join { kind, children, on } => {
            write_tag(hasher, 0x11);
            write_tag(hasher, kind.tag());
            write_u32(hasher, children.len() as u32);
            for child in children {
                hash_cell(hasher, child);
            }
            write_u32(hasher, on.len() as u32);
            for clause in on {
                hash_on_clause(hasher, clause);
            }
        }
        CellTree::Union(children) => {
            write_tag(hasher, 0x12);
            write_u32(hasher, children.len() as u32);
            for child in children {
                hash_cell(hasher, child);
            }
        }
    }
}

fn hash_extent_spec(hasher: &mut Sha256, spec: &ExtentSpec) {
    hash_extent(hasher, &spec.extent);
    write_tag(hasher, u8::from(spec.distinct));

    write_u32(hasher, spec.columns.len() as u32);
    for column in &spec.columns {
        hash_column(hasher, column);
    }

    hash_predicate(hasher, &spec.predicate);
}

fn hash_extent(hasher: &mut Sha256, extent: &ExtentRef) {
    write_str(hasher, extent.container());
    write_str(hasher, extent.name());
}

fn hash_column(hasher: &mut Sha256, column: &ExtentColumn) {
    match column {
        ExtentColumn::Member { member, output } => {
            write_tag(hasher, 0x20);
            hash_member(hasher, member);
            hash_member(hasher, output);
        }
        ExtentColumn::Constant { value, output } => {
            write_tag(hasher, 0x21);
            hash_literal(hasher, value);
            hash_member(hasher, output);
        }
        ExtentColumn::Flag { index, condition } => {
            write_tag(hasher, 0x22);
            write_u32(hasher, *index as u32);
            hash_predicate(hasher, condition);
        }
        ExtentColumn::Case {
            output,
            whens,
            otherwise,
        } => {
            write_tag(hasher, 0x23);
            hash_member(hasher, output);
            write_u32(hasher, whens.len() as u32);
            for (when, then) in whens {
                write_str(hasher, when);
                write_str(hasher, then);
            }
            match otherwise {
                Some(column) => {
                    write_tag(hasher, 0x01);
                    write_str(hasher, column);
                }
                None => write_tag(hasher, 0x00),
            }
        }
    }
}

fn hash_on_clause(hasher: &mut Sha256, clause: &OnClause) {
    write_u32(hasher, clause.pairs.len() as u32);
    for (left, right) in &clause.pairs {
        hash_column_ref(hasher, left);
        hash_column_ref(hasher, right);
    }
}

fn hash_column_ref(hasher: &mut Sha256, column: &ColumnRef) {
    write_u32(hasher, column.child as u32);
    write_str(hasher, &column.column);
}

fn hash_predicate(hasher: &mut Sha256, predicate: &Predicate) {
    match predicate {
        Predicate::True => write_tag(hasher, 0x30),
        Predicate::False => write_tag(hasher, 0x31),
        Predicate::And(children) => {
            write_tag(hasher, 0x32);
            write_u32(hasher, children.len() as u32);
            for child in children {
                hash_predicate(hasher, child);
            }
        }
        Predicate::Or(children) => {
            write_tag(hasher, 0x33);
            write_u32(hasher, children.len() as u32);
            for child in children {
                hash_predicate(hasher, child);
            }
        }
        Predicate::Not(inner) => {
            write_tag(hasher, 0x34);
            hash_predicate(hasher, inner);
        }
        Predicate::Compare { member, op, value } => {
            write_tag(hasher, 0x35);
            hash_member(hasher, member);
            write_tag(hasher, op.tag());
            hash_literal(hasher, value);
        }
        Predicate::IsNull(member) => {
            write_tag(hasher, 0x36);
            hash_member(hasher, member);
        }
        Predicate::IsNotNull(member) => {
            write_tag(hasher, 0x37);
            hash_member(hasher, member);
        }
        Predicate::IsOf { type_name, only } => {
            write_tag(hasher, 0x38);
            write_str(hasher, type_name);
            write_tag(hasher, u8::from(*only));
        }
    }
}

fn hash_member(hasher: &mut Sha256, member: &MemberPath) {
    write_u32(hasher, member.parts().len() as u32);
    for part in member.parts() {
        write_str(hasher, part);
    }
}

fn hash_literal(hasher: &mut Sha256, literal: &Literal) {
    match literal {
        Literal::Null => write_tag(hasher, 0x40),
        Literal::Bool(value) => {
            write_tag(hasher, 0x41);
            write_tag(hasher, u8::from(*value));
        }
        Literal::Int(value) => {
            write_tag(hasher, 0x42);
            hasher.update(value.to_be_bytes());
        }
        Literal::Text(value) => {
            write_tag(hasher, 0x43);
            write_str(hasher, value);
        }
    }
}

fn write_str(hasher: &mut Sha256, value: &str) {
    write_u32(hasher, value.len() as u32);
    hasher.update(value.as_bytes());
}

fn write_u32(hasher: &mut Sha256, value: u32) {
    hasher.update(value.to_be_bytes());
}

fn write_tag(hasher: &mut Sha256, tag: u8) {
    hasher.update([tag]);
}

///
/// TESTS
///
