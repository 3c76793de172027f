//! Lowering of [`Predicate`] trees into SQL expressions.

use super::coerce::LIKE_ESCAPE;
use super::Predicate;
use crate::operator::ComparisonOp;
use crate::sql::{date_of, exists, lit_date, lit_int, lit_str, paren, Expr, ExprExt, Query, TableRef};

/// Lower a predicate. Groups come out parenthesized so they compose under AND.
pub fn lower(predicate: &Predicate) -> Expr {
    match predicate {
        Predicate::And(members) => group(members, |a, b| a.and(b), true),
        Predicate::Or(members) => group(members, |a, b| a.or(b), false),

        Predicate::Compare { column, op, value } => {
            compare(column.to_expr(), *op, lit_str(value))
        }

        Predicate::Like {
            column,
            pattern,
            negated,
        } => {
            if *negated {
                column.to_expr().not_like_escape(lit_str(pattern), LIKE_ESCAPE)
            } else {
                column.to_expr().like_escape(lit_str(pattern), LIKE_ESCAPE)
            }
        }

        Predicate::IsNull { column, negated } => {
            if *negated {
                column.to_expr().is_not_null()
            } else {
                column.to_expr().is_null()
            }
        }

        Predicate::Between {
            column,
            low,
            high,
            negated,
        } => {
            if *negated {
                column.to_expr().not_between(lit_str(low), lit_str(high))
            } else {
                column.to_expr().between(lit_str(low), lit_str(high))
            }
        }

        Predicate::InList {
            column,
            values,
            negated,
        } => {
            let values = values.iter().map(|v| lit_str(v)).collect();
            if *negated {
                column.to_expr().not_in_list(values)
            } else {
                column.to_expr().in_list(values)
            }
        }

        Predicate::DateCompare { column, op, date } => compare(
            date_of(column.to_expr()),
            *op,
            lit_date(&date.format("%Y-%m-%d").to_string()),
        ),

        Predicate::Exists { hops, condition } => {
            let Some((first, rest)) = hops.split_first() else {
                return lower(condition);
            };
            let mut subquery = Query::new()
                .select(vec![lit_int(1)])
                .from(TableRef::new(&first.table).with_alias(&first.alias));
            for hop in rest {
                subquery = subquery.inner_join(
                    TableRef::new(&hop.table).with_alias(&hop.alias),
                    hop.on_expr(),
                );
            }
            exists(
                subquery
                    .filter(first.on_expr())
                    .filter(lower(condition)),
            )
        }
    }
}

fn group(members: &[Predicate], combine: fn(Expr, Expr) -> Expr, empty_holds: bool) -> Expr {
    let mut lowered = members.iter().map(lower);
    let Some(first) = lowered.next() else {
        // Empty AND is true, empty OR is false.
        let rhs = if empty_holds { 1 } else { 0 };
        return paren(lit_int(1).eq(lit_int(rhs)));
    };
    if members.len() == 1 {
        return first;
    }
    paren(lowered.fold(first, combine))
}

fn compare(left: Expr, op: ComparisonOp, right: Expr) -> Expr {
    match op {
        ComparisonOp::Eq => left.eq(right),
        ComparisonOp::Ne => left.ne(right),
        ComparisonOp::Gt => left.gt(right),
        ComparisonOp::Gte => left.gte(right),
        ComparisonOp::Lt => left.lt(right),
        ComparisonOp::Lte => left.lte(right),
        ComparisonOp::Like => left.like_escape(right, LIKE_ESCAPE),
        ComparisonOp::NotLike => left.not_like_escape(right, LIKE_ESCAPE),
    }
}
