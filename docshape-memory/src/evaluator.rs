//! Query expression evaluation for in-memory document filtering.
//!
//! This module provides the evaluation engine for query expressions,
//! enabling filtering and comparison operations on BSON documents.

use bson::{Bson, Uuid, datetime::DateTime};
use std::{cmp::Ordering, collections::HashMap};

use docshape_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, QueryVisitor},
};

/// Type-erased, comparable representation of BSON values.
///
/// This enum wraps BSON values and provides comparison operations for
/// filtering queries. It normalizes numeric types to f64 for easy comparison.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64).
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr.iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>(),
            ),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>(),
            ),
            _ => Comparable::Null, // Other types are not comparable
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Evaluates a filter expression against one BSON document.
///
/// A value that is not a BSON document carries no fields: every field lookup
/// misses, so equality filters never match it and missing-field filters do.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Bson,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Bson) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Filters `(id, document)` pairs down to the ones matching `expr`.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = (&'a Uuid, &'a Bson)>,
        expr: &Expr,
    ) -> DocumentStoreResult<Vec<(Uuid, Bson)>> {
        Ok(documents
            .into_iter()
            .filter(|(_, doc)| {
                DocumentEvaluator::new(doc)
                    .evaluate(expr)
                    .unwrap_or(false)
            })
            .map(|(id, doc)| (*id, doc.clone()))
            .collect::<Vec<_>>())
    }

    fn field_value(&self, field: &str) -> Option<&'a Bson> {
        self.document
            .as_document()
            .and_then(|doc| doc.get(field))
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error> {
        Ok(self.field_value(field).is_some() == should_exist)
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        match self.field_value(field) {
            Some(field_value) => match op {
                FieldOp::Eq => Ok(Comparable::from(field_value) == Comparable::from(value)),
                FieldOp::Ne => Ok(Comparable::from(field_value) != Comparable::from(value)),
            },
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docshape_core::query::Filter;

    fn evaluate(document: &Bson, expr: &Expr) -> bool {
        DocumentEvaluator::new(document)
            .evaluate(expr)
            .unwrap_or(false)
    }

    #[test]
    fn equality_normalizes_numeric_types() {
        let document = Bson::Document(doc! { "age": 30i64 });

        assert!(evaluate(&document, &Filter::eq("age", 30i32)));
        assert!(evaluate(&document, &Filter::ne("age", 31i32)));
    }

    #[test]
    fn missing_field_matches_not_exists() {
        let document = Bson::Document(doc! { "name": "ada" });

        assert!(evaluate(&document, &Filter::not_exists("version")));
        assert!(!evaluate(&document, &Filter::exists("version")));
        assert!(evaluate(&document, &Filter::exists("name")));
    }

    #[test]
    fn null_field_still_exists() {
        let document = Bson::Document(doc! { "version": Bson::Null });

        assert!(evaluate(&document, &Filter::exists("version")));
        assert!(!evaluate(&document, &Filter::not_exists("version")));
    }

    #[test]
    fn connectives_combine_predicates() {
        let document = Bson::Document(doc! { "status": "active", "age": 30 });

        let both = Filter::eq("status", "active").and(Filter::eq("age", 30));
        let either = Filter::eq("status", "gone").or(Filter::eq("age", 30));

        assert!(evaluate(&document, &both));
        assert!(evaluate(&document, &either));
        assert!(!evaluate(&document, &both.not()));
    }
}
