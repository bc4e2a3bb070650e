use std::fmt;
use std::str::FromStr;
use url::form_urlencoded;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Created,
    Started,
    Finished,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Created => "created",
            SortField::Started => "started",
            SortField::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub descending: bool,
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-")?;
        }
        write!(f, "{}", self.field.as_str())
    }
}

impl FromStr for Sort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(name) => (true, name),
            None => (false, s),
        };
        let field = match name {
            "created" => SortField::Created,
            "started" => SortField::Started,
            "finished" => SortField::Finished,
            other => {
                return Err(format!(
                    "Unknown sort field '{}', expected created, started or finished",
                    other
                ))
            }
        };
        Ok(Self { field, descending })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
        }
    }
}

/// Sorting and filtering for [`crate::Account::list_tests`].
///
/// Filter keys are `state`, `created`, `started`, `finished`, `browser` and
/// `location`. Valid states are `queued`, `started`, `error` and
/// `completed`; timestamps are UNIX seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestQuery {
    pub sort: Option<Sort>,
    pub filters: Vec<(String, String)>,
}

impl TestQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort_by(mut self, field: SortField) -> Self {
        self.sort = Some(Sort {
            field,
            descending: false,
        });
        self
    }

    pub fn sort_by_desc(mut self, field: SortField) -> Self {
        self.sort = Some(Sort {
            field,
            descending: true,
        });
        self
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Adds a filter; `key` may already carry an operator suffix such as
    /// `created:gt`.
    pub fn filter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push((key.into(), value.to_string()));
        self
    }

    pub fn filter_op(self, key: &str, op: FilterOp, value: impl ToString) -> Self {
        self.filter(format!("{}:{}", key, op.as_str()), value)
    }

    pub fn is_empty(&self) -> bool {
        self.sort.is_none() && self.filters.is_empty()
    }

    /// Renders `sort=...&filter[key]=value...`. Keys and values are
    /// percent-encoded; the `filter[...]` brackets and the `:` before an
    /// operator suffix are kept as they are.
    pub fn to_query_string(&self) -> String {
        let mut segments = Vec::new();
        if let Some(sort) = &self.sort {
            segments.push(format!("sort={}", encode(&sort.to_string())));
        }
        for (key, value) in &self.filters {
            let key = key.split(':').map(encode).collect::<Vec<_>>().join(":");
            segments.push(format!("filter[{}]={}", key, encode(value)));
        }
        segments.join("&")
    }

    pub(crate) fn path(&self) -> String {
        if self.is_empty() {
            "tests".to_string()
        } else {
            format!("tests?{}", self.to_query_string())
        }
    }
}

fn encode(text: &str) -> String {
    form_urlencoded::byte_serialize(text.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query() {
        let query = TestQuery::new();
        assert!(query.is_empty());
        assert_eq!(query.to_query_string(), "");
        assert_eq!(query.path(), "tests");
    }

    #[test]
    fn test_sort_and_filters() {
        let query = TestQuery::new()
            .sort_by_desc(SortField::Created)
            .filter("state", "completed")
            .filter_op("created", FilterOp::Gt, 1618437519);

        assert_eq!(
            query.path(),
            "tests?sort=-created&filter[state]=completed&filter[created:gt]=1618437519"
        );
    }

    #[test]
    fn test_filter_values_are_encoded() {
        let query = TestQuery::new()
            .filter("location", "a&b+c #d")
            .filter_op("created", FilterOp::Lte, "1=2");

        assert_eq!(
            query.to_query_string(),
            "filter[location]=a%26b%2Bc+%23d&filter[created:lte]=1%3D2"
        );
    }

    #[test]
    fn test_sort_parsing() {
        let sort: Sort = "-finished".parse().unwrap();
        assert_eq!(sort.field, SortField::Finished);
        assert!(sort.descending);
        assert_eq!(sort.to_string(), "-finished");

        let sort: Sort = "started".parse().unwrap();
        assert!(!sort.descending);
        assert_eq!(sort.to_string(), "started");

        assert!("duration".parse::<Sort>().is_err());
    }

    #[test]
    fn test_filter_op_suffixes() {
        let ops = [
            (FilterOp::Eq, "eq"),
            (FilterOp::Lt, "lt"),
            (FilterOp::Lte, "lte"),
            (FilterOp::Gt, "gt"),
            (FilterOp::Gte, "gte"),
        ];
        for (op, suffix) in ops {
            let query = TestQuery::new().filter_op("browser", op, 3);
            assert_eq!(query.to_query_string(), format!("filter[browser:{}]=3", suffix));
        }
    }
}
