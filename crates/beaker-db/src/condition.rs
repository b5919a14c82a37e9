//! Query condition types for dynamic WHERE clauses.
//!
//! A [`Condition`] is either a single [`Predicate`] (`field op value`) or a
//! [`ConditionGroup`] of child conditions. Rendering walks the tree left to
//! right, numbering placeholders as it goes, so the returned values line up
//! with the `$n` markers in the fragment.
//!
//! Siblings are joined by the *child's* combinator, not the parent's: the
//! first child's combinator is never printed, and every later child is
//! prefixed with its own `AND`/`OR`.
//!
//! # Example
//! ```ignore
//! use beaker_db::{Combinator, ConditionGroup, Predicate};
//!
//! let mut root = ConditionGroup::root();
//! root.add(ConditionGroup::single(Predicate::and("id", "=", 5)));
//! root.add(ConditionGroup::single(Predicate::or("name", "=", "ann")));
//!
//! let mut idx = 0;
//! let rendered = root.render(&mut idx)?;
//! assert_eq!(rendered.sql, "id = $1 OR name = $2");
//! ```

use crate::error::{DbError, DbResult};
use crate::value::Value;
use std::fmt;

/// Boolean joiner placed between sibling conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Output of [`Condition::render`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    /// SQL fragment with numbered placeholders.
    pub sql: String,
    /// How this node joins to its previous sibling.
    pub combinator: Combinator,
    /// Bound values, in placeholder order.
    pub values: Vec<Value>,
}

/// `field op value`. The operator is passed through verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    field: String,
    op: String,
    value: Value,
    combinator: Combinator,
}

impl Predicate {
    pub fn new(
        field: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<Value>,
        combinator: Combinator,
    ) -> Self {
        Self {
            field: field.into(),
            op: op.into(),
            value: value.into(),
            combinator,
        }
    }

    /// Predicate joined with `AND`.
    pub fn and(field: impl Into<String>, op: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, op, value, Combinator::And)
    }

    /// Predicate joined with `OR`.
    pub fn or(field: impl Into<String>, op: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, op, value, Combinator::Or)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    pub fn render(&self, param_idx: &mut usize) -> DbResult<Rendered> {
        *param_idx += 1;
        let sql = format!(
            "{} {} {}",
            self.field,
            self.op,
            self.value.placeholder(*param_idx)
        );
        Ok(Rendered {
            sql,
            combinator: self.combinator,
            values: vec![self.value.clone()],
        })
    }
}

/// Ordered children sharing a combinator.
///
/// The root group (the WHERE clause itself) is never parenthesized; any
/// other group is wrapped in parentheses once it has two or more children.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionGroup {
    conditions: Vec<Condition>,
    combinator: Combinator,
    root: bool,
}

impl ConditionGroup {
    /// A nested group that joins its previous sibling with `combinator`.
    pub fn new(combinator: Combinator) -> Self {
        Self {
            conditions: Vec::new(),
            combinator,
            root: false,
        }
    }

    /// The top-level `AND` group of a WHERE clause.
    pub fn root() -> Self {
        Self {
            conditions: Vec::new(),
            combinator: Combinator::And,
            root: true,
        }
    }

    /// A group holding one predicate, inheriting the predicate's combinator.
    pub fn single(predicate: Predicate) -> Self {
        let mut group = Self::new(predicate.combinator());
        group.add(predicate);
        group
    }

    pub fn add(&mut self, condition: impl Into<Condition>) -> &mut Self {
        self.conditions.push(condition.into());
        self
    }

    /// Chainable `field op value` joined with `AND`.
    pub fn and_where(
        mut self,
        field: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.add(Predicate::and(field, op, value));
        self
    }

    /// Chainable `field op value` joined with `OR`.
    pub fn or_where(
        mut self,
        field: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.add(Predicate::or(field, op, value));
        self
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn render(&self, param_idx: &mut usize) -> DbResult<Rendered> {
        if self.conditions.is_empty() {
            return Err(DbError::MissingCondition);
        }

        let mut sql = String::new();
        let mut values = Vec::new();
        for (i, condition) in self.conditions.iter().enumerate() {
            let child = condition.render(param_idx)?;
            if i != 0 {
                sql.push(' ');
                sql.push_str(child.combinator.as_sql());
                sql.push(' ');
            }
            sql.push_str(&child.sql);
            values.extend(child.values);
        }

        if !self.root && self.conditions.len() > 1 {
            sql = format!("({sql})");
        }

        Ok(Rendered {
            sql,
            combinator: self.combinator,
            values,
        })
    }
}

/// A node in the WHERE expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Predicate(Predicate),
    Group(ConditionGroup),
}

impl Condition {
    pub fn combinator(&self) -> Combinator {
        match self {
            Condition::Predicate(p) => p.combinator(),
            Condition::Group(g) => g.combinator(),
        }
    }

    /// Render to `(fragment, combinator, values)`, advancing `param_idx` by
    /// one per bound value.
    pub fn render(&self, param_idx: &mut usize) -> DbResult<Rendered> {
        match self {
            Condition::Predicate(p) => p.render(param_idx),
            Condition::Group(g) => g.render(param_idx),
        }
    }
}

impl From<Predicate> for Condition {
    fn from(p: Predicate) -> Self {
        Condition::Predicate(p)
    }
}

impl From<ConditionGroup> for Condition {
    fn from(g: ConditionGroup) -> Self {
        Condition::Group(g)
    }
}
