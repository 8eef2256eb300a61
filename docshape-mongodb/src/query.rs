//! Query translation from docshape AST to MongoDB query syntax.
//!
//! This module translates docshape's abstract query expressions into
//! MongoDB BSON documents for execution by the MongoDB query engine.

use bson::{Bson, Document, doc};

use docshape_core::{
    error::DocumentStoreError,
    query::{Expr, FieldOp, QueryVisitor},
};

use crate::sanitizer::sanitize_key;

/// Translates docshape query expressions into MongoDB query documents.
///
/// This struct implements the [`QueryVisitor`] trait to convert abstract
/// query expressions into MongoDB's native BSON query syntax. Field names are
/// sanitized the same way stored document keys are, so filters line up with
/// what is actually on disk.
pub(crate) struct MongoQueryTranslator;

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        // `$not` only applies per-field; `$nor` with one branch negates a
        // whole sub-query.
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            sanitize_key(field): { "$exists": should_exist },
        })
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            sanitize_key(field): match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docshape_core::query::Filter;

    #[test]
    fn missing_field_filter_translates_to_exists_false() {
        let translated = MongoQueryTranslator
            .visit_expr(&Filter::not_exists("version"))
            .unwrap();

        assert_eq!(translated, doc! { "version": { "$exists": false } });
    }

    #[test]
    fn field_names_are_sanitized() {
        let translated = MongoQueryTranslator
            .visit_expr(&Filter::eq("price.usd", 10))
            .unwrap();

        assert_eq!(translated, doc! { "price__dot__usd": { "$eq": 10 } });
    }

    #[test]
    fn connectives_nest() {
        let expr = Filter::eq("status", "active").and(Filter::not_exists("deleted_at"));
        let translated = MongoQueryTranslator.visit_expr(&expr).unwrap();

        assert_eq!(
            translated,
            doc! {
                "$and": [
                    { "status": { "$eq": "active" } },
                    { "deleted_at": { "$exists": false } },
                ]
            }
        );
    }
}
