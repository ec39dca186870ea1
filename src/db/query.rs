//! Predicate composition for filtered listings
//!
//! `Predicates::active` always starts with the soft-delete predicate, so no
//! listing can forget to exclude deleted rows. Optional criteria are
//! appended only when present and are AND-combined.

use chrono::NaiveDateTime;
use sqlx::{QueryBuilder, Sqlite};

use crate::db::format_naive_timestamp;
use crate::models::{non_blank, AuditCriteria};

#[derive(Debug, Clone, PartialEq)]
enum Bind {
    Text(String),
    Int(i64),
}

/// A SQL fragment with `?` placeholders and the values bound to them
#[derive(Debug, Clone, PartialEq)]
struct Clause {
    sql: String,
    binds: Vec<Bind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicates {
    clauses: Vec<Clause>,
}

impl Predicates {
    /// Start with `<alias>.deleted = 0`
    pub fn active(alias: &str) -> Self {
        Self {
            clauses: vec![Clause {
                sql: format!("{}.deleted = 0", alias),
                binds: vec![],
            }],
        }
    }

    fn push(&mut self, sql: String, binds: Vec<Bind>) -> &mut Self {
        self.clauses.push(Clause { sql, binds });
        self
    }

    /// Case-insensitive substring match; blank values do not constrain
    pub fn contains(&mut self, column: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = non_blank(value) {
            self.push(
                format!("LOWER({}) LIKE ? ESCAPE '\\'", column),
                vec![Bind::Text(like_pattern(value))],
            );
        }
        self
    }

    pub fn equals(&mut self, column: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.push(format!("{} = ?", column), vec![Bind::Text(value.to_string())]);
        }
        self
    }

    pub fn equals_id(&mut self, column: &str, value: Option<i64>) -> &mut Self {
        if let Some(value) = value {
            self.push(format!("{} = ?", column), vec![Bind::Int(value)]);
        }
        self
    }

    /// `column IN (...)`; an empty set matches nothing
    pub fn id_in(&mut self, column: &str, ids: &[i64]) -> &mut Self {
        if ids.is_empty() {
            return self.push("1 = 0".to_string(), vec![]);
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        self.push(
            format!("{} IN ({})", column, placeholders),
            ids.iter().copied().map(Bind::Int).collect(),
        )
    }

    pub fn on_or_after(&mut self, column: &str, bound: Option<NaiveDateTime>) -> &mut Self {
        if let Some(bound) = bound {
            self.push(
                format!("{} >= ?", column),
                vec![Bind::Text(format_naive_timestamp(bound))],
            );
        }
        self
    }

    pub fn on_or_before(&mut self, column: &str, bound: Option<NaiveDateTime>) -> &mut Self {
        if let Some(bound) = bound {
            self.push(
                format!("{} <= ?", column),
                vec![Bind::Text(format_naive_timestamp(bound))],
            );
        }
        self
    }

    /// `(created_by = ? OR assignee_id = ?)` style disjunction of two equalities
    pub fn text_or_id(
        &mut self,
        text_column: &str,
        text: &str,
        id_column: &str,
        id: i64,
    ) -> &mut Self {
        self.push(
            format!("({} = ? OR {} = ?)", text_column, id_column),
            vec![Bind::Text(text.to_string()), Bind::Int(id)],
        )
    }

    /// createdBy/updatedBy substrings and the four inclusive date bounds
    pub fn audit(&mut self, alias: &str, criteria: &AuditCriteria<'_>) -> &mut Self {
        self.contains(&format!("{}.created_by", alias), criteria.created_by)
            .contains(&format!("{}.updated_by", alias), criteria.updated_by)
            .on_or_after(&format!("{}.created_at", alias), criteria.created_date_start)
            .on_or_before(&format!("{}.created_at", alias), criteria.created_date_end)
            .on_or_after(&format!("{}.updated_at", alias), criteria.updated_date_start)
            .on_or_before(&format!("{}.updated_at", alias), criteria.updated_date_end)
    }

    /// Append ` WHERE a AND b ...` with every value bound
    pub fn push_where<'args>(&self, qb: &mut QueryBuilder<'args, Sqlite>) {
        qb.push(" WHERE ");
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                qb.push(" AND ");
            }
            let mut binds = clause.binds.iter();
            let mut pieces = clause.sql.split('?').peekable();
            while let Some(piece) = pieces.next() {
                qb.push(piece);
                if pieces.peek().is_some() {
                    match binds.next() {
                        Some(Bind::Text(v)) => qb.push_bind(v.clone()),
                        Some(Bind::Int(v)) => qb.push_bind(*v),
                        None => qb.push("NULL"),
                    };
                }
            }
        }
    }

    /// Render the clause text only (used by tests and debug logging)
    pub fn to_sql(&self) -> String {
        self.clauses
            .iter()
            .map(|c| c.sql.as_str())
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// `%value%` with LIKE wildcards escaped, lowercased to pair with `LOWER(column)`
pub fn like_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for c in value.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
