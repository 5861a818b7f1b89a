//! Parameterized SELECT assembly for the search entry points.
//!
//! Every user-supplied value travels as a bound parameter; only fixed
//! column expressions chosen by the caller end up in the SQL text.

use rusqlite::types::Value;

use super::sqlite::FOLD_CASE_FN;

/// One `WHERE`/`HAVING` fragment with its `?` placeholders and the values
/// bound to them, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub clause: String,
    pub params: Vec<Value>,
}

impl Predicate {
    /// Case-insensitive literal substring match against any of `columns`.
    /// Both sides are folded with Unicode rules before `LIKE` sees them.
    pub fn contains_any(columns: &[&str], text: &str) -> Predicate {
        let pattern = format!("%{}%", escape_like(&text.to_lowercase()));
        let clause = columns
            .iter()
            .map(|c| format!("{}({}) LIKE ? ESCAPE '\\'", FOLD_CASE_FN, c))
            .collect::<Vec<_>>()
            .join(" OR ");
        Predicate {
            clause: format!("({})", clause),
            params: columns.iter().map(|_| Value::Text(pattern.clone())).collect(),
        }
    }

    /// Four-digit year of a date/time expression equals `year`.
    pub fn year_equals(expr: &str, year: i32) -> Predicate {
        Predicate {
            clause: format!("strftime('%Y', {}) = ?", expr),
            params: vec![Value::Text(format!("{:04}", year))],
        }
    }

    pub fn in_list(column: &str, values: &[String]) -> Predicate {
        let placeholders = vec!["?"; values.len()].join(", ");
        Predicate {
            clause: format!("{} IN ({})", column, placeholders),
            params: values.iter().cloned().map(Value::Text).collect(),
        }
    }

    pub fn count_distinct_equals(column: &str, n: usize) -> Predicate {
        Predicate {
            clause: format!("COUNT(DISTINCT {}) = ?", column),
            params: vec![Value::Integer(n as i64)],
        }
    }
}

/// LIKE wildcards in user text are matched literally.
pub fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone)]
pub struct SelectBuilder {
    select: String,
    joins: Vec<String>,
    filters: Vec<Predicate>,
    group_by: Option<String>,
    having: Option<Predicate>,
    order_by: Option<String>,
}

impl SelectBuilder {
    /// `select` is the full `SELECT .. FROM ..` head.
    pub fn new(select: &str) -> Self {
        Self {
            select: select.trim().to_string(),
            joins: Vec::new(),
            filters: Vec::new(),
            group_by: None,
            having: None,
            order_by: None,
        }
    }

    pub fn join(mut self, join: &str) -> Self {
        self.joins.push(join.trim().to_string());
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn group_by(mut self, column: &str, having: Predicate) -> Self {
        self.group_by = Some(column.to_string());
        self.having = Some(having);
        self
    }

    pub fn order_by(mut self, order: &str) -> Self {
        self.order_by = Some(order.to_string());
        self
    }

    /// SQL text plus parameters in placeholder order.
    pub fn build(self) -> (String, Vec<Value>) {
        let mut sql = self.select;
        let mut params = Vec::new();

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if !self.filters.is_empty() {
            let clauses: Vec<&str> = self.filters.iter().map(|p| p.clause.as_str()).collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
            for predicate in self.filters {
                params.extend(predicate.params);
            }
        }
        if let Some(group_by) = self.group_by {
            sql.push_str(" GROUP BY ");
            sql.push_str(&group_by);
            if let Some(having) = self.having {
                sql.push_str(" HAVING ");
                sql.push_str(&having.clause);
                params.extend(having.params);
            }
        }
        if let Some(order_by) = self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_by);
        }
        (sql, params)
    }
}
