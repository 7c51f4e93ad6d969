//! Dynamic `WHERE` clauses for list endpoints.
//!
//! Column names always come from compile-time whitelists; user input only
//! ever reaches SQL through bound arguments.

use sqlx::{
    Postgres,
    postgres::PgArguments,
    query::{QueryAs, QueryScalar},
};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum FilterArg {
    Text(String),
    Ids(Vec<Uuid>),
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    conditions: Vec<String>,
    args: Vec<FilterArg>,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition. Every `$?` in `template` becomes the placeholder of `arg`.
    pub fn push(&mut self, template: &str, arg: FilterArg) -> &mut Self {
        self.args.push(arg);
        let placeholder = format!("${}", self.args.len());
        self.conditions.push(template.replace("$?", &placeholder));
        self
    }

    /// Case-insensitive substring match on any of `columns`.
    pub fn search(&mut self, columns: &[&str], term: Option<&str>) -> &mut Self {
        let Some(term) = term else {
            return self;
        };
        if columns.is_empty() {
            return self;
        }

        let any = columns
            .iter()
            .map(|column| format!("lower({column}) LIKE lower($?)"))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.push(&format!("({any})"), FilterArg::Text(format!("%{term}%")))
    }

    pub fn ids(&mut self, column: &str, ids: Vec<Uuid>) -> &mut Self {
        self.push(&format!("{column} = ANY($?)"), FilterArg::Ids(ids))
    }

    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn bind_as<'q, O>(
        &self,
        mut query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        for arg in &self.args {
            query = match arg {
                FilterArg::Text(value) => query.bind(value.clone()),
                FilterArg::Ids(ids) => query.bind(ids.clone()),
            };
        }
        query
    }

    pub fn bind_scalar<'q, O>(
        &self,
        mut query: QueryScalar<'q, Postgres, O, PgArguments>,
    ) -> QueryScalar<'q, Postgres, O, PgArguments> {
        for arg in &self.args {
            query = match arg {
                FilterArg::Text(value) => query.bind(value.clone()),
                FilterArg::Ids(ids) => query.bind(ids.clone()),
            };
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_has_no_where() {
        assert_eq!(ListFilter::new().where_clause(), "");
    }

    #[test]
    fn test_search_shares_one_placeholder() {
        let mut filter = ListFilter::new();
        filter.search(&["name", "country"], Some("dem"));
        assert_eq!(
            filter.where_clause(),
            " WHERE (lower(name) LIKE lower($1) OR lower(country) LIKE lower($1))"
        );
    }

    #[test]
    fn test_placeholders_are_numbered_in_order() {
        let mut filter = ListFilter::new();
        filter
            .search(&["reference_id"], None)
            .search(&["reference_id"], Some("REF"))
            .ids("service_id", vec![Uuid::nil()]);
        assert_eq!(
            filter.where_clause(),
            " WHERE (lower(reference_id) LIKE lower($1)) AND service_id = ANY($2)"
        );
    }
}
