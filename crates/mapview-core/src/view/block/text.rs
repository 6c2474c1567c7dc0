//! Textual emission: an indented query string per block.

use super::{Block, BlockId, BlockKind, OnColumn, ViewTree};
use crate::view::{
    escape::{ReservedKeywords, format_identifier, format_qualified_name},
    literal::Literal,
    member::OutputMember,
    slot::{Slot, SlotColumn, SlotId},
};

const INDENT: &str = "    ";

impl ViewTree {
    /// Query text for the whole tree, identifiers escaped with `keywords`.
    #[must_use]
    pub fn to_text(&self, keywords: &dyn ReservedKeywords) -> String {
        let mut writer = TextWriter {
            tree: self,
            keywords,
            out: String::new(),
        };
        writer.block(self.root, 0);

        let len = writer.out.trim_end().len();
        writer.out.truncate(len);
        writer.out
    }
}

///
/// TextWriter
///

struct TextWriter<'a> {
    tree: &'a ViewTree,
    keywords: &'a dyn ReservedKeywords,
    out: String,
}

impl TextWriter<'_> {
    fn block(&mut self, id: BlockId, depth: usize) {
        let tree = self.tree;
        let block = tree.node(id);
        match block.kind() {
            BlockKind::Extent { extent, distinct } => {
                self.select_list(block, *distinct, depth);
                let from = format!(
                    "FROM {} AS {}",
                    extent.render(self.keywords),
                    format_identifier(block.alias(), self.keywords)
                );
                self.line(depth, &from);
                if !block.predicate().is_trivially_true() {
                    let filter = block.predicate().render(block.alias(), self.keywords);
                    self.line(depth, &format!("WHERE {filter}"));
                }
            }
            BlockKind::Join { kind, on } => {
                self.select_list(block, false, depth);
                for (index, &child) in block.children().iter().enumerate() {
                    let opener = if index == 0 {
                        "FROM (".to_string()
                    } else {
                        format!("{} (", kind.keyword())
                    };
                    self.line(depth, &opener);
                    self.block(child, depth + 1);
                    let closer = format!(
                        ") AS {}",
                        format_identifier(tree.node(child).alias(), self.keywords)
                    );
                    self.line(depth, &closer);

                    if let Some(pairs) = index.checked_sub(1).and_then(|step| on.get(step)) {
                        let condition = pairs
                            .iter()
                            .map(|(left, right)| {
                                format!(
                                    "{} = {}",
                                    self.on_column(block, *left),
                                    self.on_column(block, *right)
                                )
                            })
                            .collect::<Vec<_>>()
                            .join(" AND ");
                        self.line(depth + 1, &format!("ON {condition}"));
                    }
                }
            }
            BlockKind::Union => {
                for (index, &child) in block.children().iter().enumerate() {
                    if index > 0 {
                        self.line(depth, "UNION ALL");
                    }
                    self.line(depth, "(");
                    self.block(child, depth + 1);
                    self.line(depth, ")");
                }
            }
        }
    }

    fn select_list(&mut self, block: &Block, distinct: bool, depth: usize) {
        self.line(depth, if distinct { "SELECT DISTINCT" } else { "SELECT" });

        let last = block.columns().len().saturating_sub(1);
        for (index, info) in block.columns().iter().enumerate() {
            let expr = self.slot(info.slot, &info.output, block.alias());
            let separator = if index == last { "" } else { "," };
            let column = format!(
                "{expr} AS {}{separator}",
                format_identifier(&info.alias(), self.keywords)
            );
            self.line(depth + 1, &column);
        }
    }

    /// Expression for `slot` projected as `output`, leaves read from `row`.
    fn slot(&self, slot: SlotId, output: &OutputMember, row: &str) -> String {
        match self.tree.slots.get(slot) {
            Some(Slot::Member(path)) => path.render(row, self.keywords),
            Some(Slot::Constant(value)) => value.to_string(),
            Some(Slot::Flag(condition)) => condition.render(row, self.keywords),
            Some(Slot::Case { whens, otherwise }) => {
                let mut out = String::from("CASE");
                for (when, then) in whens {
                    out.push_str(" WHEN ");
                    out.push_str(&self.column(when, row));
                    out.push_str(" THEN ");
                    out.push_str(&self.column(then, row));
                }
                out.push_str(" ELSE ");
                match otherwise {
                    Some(column) => out.push_str(&self.column(column, row)),
                    None => out.push_str(&Literal::Null.to_string()),
                }
                out.push_str(" END");
                out
            }
            Some(Slot::Qualified { .. }) | None => {
                self.tree.qualified_name(slot, output, self.keywords)
            }
        }
    }

    fn column(&self, column: &SlotColumn, row: &str) -> String {
        self.slot(column.slot, &column.output, row)
    }

    fn on_column(&self, join: &Block, column: OnColumn) -> String {
        let child = self.tree.node(join.children()[column.child]);
        let alias = child.columns()[column.column].alias();

        format_qualified_name([child.alias(), alias.as_str()], self.keywords)
    }

    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }
}
