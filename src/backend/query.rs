//! Row query builder rendered to the REST filter dialect.

/// A single row filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, String),
    Gte(String, String),
    /// Case-insensitive substring match on any of the columns.
    OrIlike(Vec<String>, String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
    pub range: Option<(usize, usize)>,
    pub single: bool,
}

impl SelectQuery {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
            range: None,
            single: false,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(Filter::Eq(column.into(), value.to_string()));
        self
    }

    pub fn gte(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(Filter::Gte(column.into(), value.to_string()));
        self
    }

    /// Case-insensitive substring match on any of `columns`.
    ///
    /// A needle with nothing left after stripping filter delimiters adds no filter.
    pub fn or_ilike(mut self, columns: &[&str], needle: &str) -> Self {
        let needle = sanitize_needle(needle);
        if !needle.is_empty() {
            self.filters
                .push(Filter::OrIlike(columns.iter().map(|c| c.to_string()).collect(), needle));
        }
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order { column: column.into(), ascending });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Inclusive row range; takes precedence over `limit`.
    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.range = Some((from, to.max(from)));
        self
    }

    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    /// Effective (offset, limit) after combining `limit` and `range`.
    pub fn window(&self) -> (usize, Option<usize>) {
        match self.range {
            Some((from, to)) => (from, Some(to - from + 1)),
            None => (0, self.limit),
        }
    }

    /// Filter parameters only (used by count, update and delete).
    pub fn filter_params(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .map(|f| match f {
                Filter::Eq(col, val) => (col.clone(), format!("eq.{}", val)),
                Filter::Gte(col, val) => (col.clone(), format!("gte.{}", val)),
                Filter::OrIlike(cols, needle) => {
                    let parts: Vec<String> = cols.iter().map(|c| format!("{}.ilike.*{}*", c, needle)).collect();
                    ("or".to_string(), format!("({})", parts.join(",")))
                }
            })
            .collect()
    }

    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), strip_whitespace(&self.columns))];
        params.extend(self.filter_params());
        if let Some(order) = &self.order {
            let dir = if order.ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{}", order.column, dir)));
        }
        let (offset, limit) = self.window();
        if offset > 0 {
            params.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(limit) = limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

/// Drops the characters that delimit the `or=(...)` expression.
fn sanitize_needle(needle: &str) -> String {
    needle
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '%' | '\\' | '"'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn strip_whitespace(columns: &str) -> String {
    columns.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_filters_order_and_limit() {
        let q = SelectQuery::table("posts")
            .select("*, user:users(id, email)")
            .eq("user_id", "abc")
            .order("created_at", false)
            .limit(10);
        assert_eq!(
            q.to_params(),
            vec![
                ("select".to_string(), "*,user:users(id,email)".to_string()),
                ("user_id".to_string(), "eq.abc".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn range_overrides_limit() {
        let q = SelectQuery::table("posts").limit(50).range(10, 19);
        assert_eq!(q.window(), (10, Some(10)));
        let params = q.to_params();
        assert!(params.contains(&("offset".to_string(), "10".to_string())));
        assert!(params.contains(&("limit".to_string(), "10".to_string())));
    }

    #[test]
    fn or_ilike_is_sanitized() {
        let q = SelectQuery::table("users").or_ilike(&["first_name", "email"], "an(a),*");
        assert_eq!(
            q.filter_params(),
            vec![("or".to_string(), "(first_name.ilike.*ana*,email.ilike.*ana*)".to_string())]
        );
    }

    #[test]
    fn delimiter_only_needle_adds_no_filter() {
        let q = SelectQuery::table("users").or_ilike(&["first_name", "email"], ",()*% ");
        assert!(q.filter_params().is_empty());
    }

    #[test]
    fn gte_renders_timestamp() {
        let q = SelectQuery::table("stories").gte("expires_at", "2024-01-01T00:00:00Z");
        assert_eq!(
            q.filter_params(),
            vec![("expires_at".to_string(), "gte.2024-01-01T00:00:00Z".to_string())]
        );
    }
}
