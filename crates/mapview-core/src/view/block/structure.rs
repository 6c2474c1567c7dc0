//! Structural emission: the same tree as primitive relational operators.

use super::{Block, BlockId, BlockKind, OnColumn, ViewTree, join_left_var, join_path};
use crate::view::{
    expr::{Binding, Expr},
    literal::Literal,
    member::OutputMember,
    predicate::CompareOp,
    slot::{Slot, SlotColumn, SlotId},
};

impl ViewTree {
    /// Expression tree for the whole view.
    #[must_use]
    pub fn to_expr(&self) -> Expr {
        self.block_expr(self.root)
    }

    fn block_expr(&self, id: BlockId) -> Expr {
        let block = self.node(id);
        match block.kind() {
            BlockKind::Extent { extent, distinct } => {
                let row = Expr::var(block.alias());
                let scan = Expr::Scan(extent.clone());
                let input = if block.predicate().is_trivially_true() {
                    scan
                } else {
                    Expr::Filter {
                        input: Box::new(Binding::new(scan, block.alias())),
                        predicate: Box::new(block.predicate().to_expr(&row)),
                    }
                };
                let project = self.project(block, input, &row);

                if *distinct {
                    Expr::Distinct(Box::new(project))
                } else {
                    project
                }
            }
            BlockKind::Join { kind, on } => {
                let names: Vec<&str> = block
                    .children()
                    .iter()
                    .map(|child| self.node(*child).alias())
                    .collect();

                let mut children = block.children().iter().map(|child| self.block_expr(*child));
                let mut joined = children.next().unwrap_or(Expr::Constant(Literal::Null));
                for (index, (right, pairs)) in children.zip(on).enumerate() {
                    let step = index + 1;
                    let left_var = join_left_var(block.alias(), names[0], step);
                    let right_var = names[step].to_string();

                    let mut conditions: Vec<Expr> = pairs
                        .iter()
                        .map(|(left, right)| {
                            let left_row = join_path(block.alias(), &names, step - 1, left.child)
                                .iter()
                                .fold(Expr::var(left_var.as_str()), |acc, name| {
                                    acc.property(name.as_str())
                                });
                            Expr::Compare {
                                op: CompareOp::Eq,
                                left: Box::new(self.on_operand(block, left_row, *left)),
                                right: Box::new(self.on_operand(
                                    block,
                                    Expr::var(right_var.as_str()),
                                    *right,
                                )),
                            }
                        })
                        .collect();
                    let on = if conditions.len() == 1 {
                        conditions.remove(0)
                    } else {
                        Expr::And(conditions)
                    };

                    joined = Expr::Join {
                        kind: *kind,
                        left: Box::new(Binding::new(joined, left_var)),
                        right: Box::new(Binding::new(right, right_var)),
                        on: Box::new(on),
                    };
                }

                self.project(block, joined, &Expr::var(block.alias()))
            }
            BlockKind::Union => block
                .children()
                .iter()
                .map(|child| self.block_expr(*child))
                .reduce(|left, right| Expr::UnionAll(Box::new(left), Box::new(right)))
                .unwrap_or(Expr::Constant(Literal::Null)),
        }
    }

    // `row` is bound to `input` under the block alias.
    fn project(&self, block: &Block, input: Expr, row: &Expr) -> Expr {
        let columns = block
            .columns()
            .iter()
            .map(|info| (info.alias(), self.slot_expr(info.slot, &info.output, row)))
            .collect();

        Expr::Project {
            input: Box::new(Binding::new(input, block.alias())),
            columns,
        }
    }

    fn slot_expr(&self, slot: SlotId, output: &OutputMember, row: &Expr) -> Expr {
        match self.slots.get(slot) {
            Some(Slot::Member(path)) => row.member(path),
            Some(Slot::Constant(value)) => Expr::Constant(value.clone()),
            Some(Slot::Flag(condition)) => condition.to_expr(row),
            Some(Slot::Case { whens, otherwise }) => Expr::Case {
                whens: whens
                    .iter()
                    .map(|(when, then)| (self.column_expr(when, row), self.column_expr(then, row)))
                    .collect(),
                otherwise: Box::new(match otherwise {
                    Some(column) => self.column_expr(column, row),
                    None => Expr::Constant(Literal::Null),
                }),
            },
            Some(Slot::Qualified { block, .. }) => {
                self.child_row(*block, row).property(output.field_alias())
            }
            None => row.clone().property(output.field_alias()),
        }
    }

    fn column_expr(&self, column: &SlotColumn, row: &Expr) -> Expr {
        self.slot_expr(column.slot, &column.output, row)
    }

    /// Row of `child` inside the parent row `row`: joined children are
    /// reached through their join-tree context, union children share it.
    fn child_row(&self, child: BlockId, row: &Expr) -> Expr {
        match self.node(child).join_context() {
            Some(context) => context
                .parent_qualifiers
                .iter()
                .chain(std::iter::once(&context.leaf))
                .fold(row.clone(), |acc, name| acc.property(name.as_str())),
            None => row.clone(),
        }
    }

    fn on_operand(&self, join: &Block, row: Expr, column: OnColumn) -> Expr {
        let child = self.node(join.children()[column.child]);

        row.property(child.columns()[column.column].alias())
    }
}
