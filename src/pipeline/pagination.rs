use serde::Serialize;
use serde_json::Value;

use super::queryset::LookupError;
use crate::config::PaginationConfig;
use crate::handlers::DataMap;

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub count: usize,
    /// Number of the following page, if any
    pub next: Option<usize>,
    pub previous: Option<usize>,
    pub results: Vec<Value>,
}

/// Page-number paginator driven by query parameters
#[derive(Debug, Clone, Copy)]
pub struct Paginator<'a> {
    config: &'a PaginationConfig,
}

impl<'a> Paginator<'a> {
    pub fn new(config: &'a PaginationConfig) -> Self {
        Self { config }
    }

    /// Requested page size, falling back to the default and capped at the max
    pub fn page_size(&self, query: &DataMap) -> usize {
        query
            .get(&self.config.page_size_query_param)
            .and_then(query_usize)
            .filter(|size| *size > 0)
            .map(|size| size.min(self.config.max_page_size))
            .unwrap_or(self.config.page_size)
    }

    pub fn paginate(&self, items: Vec<Value>, query: &DataMap) -> Result<Page, LookupError> {
        let page_size = self.page_size(query);
        let count = items.len();
        let num_pages = count.div_ceil(page_size).max(1);

        let number = match query.get(&self.config.page_query_param) {
            None => 1,
            Some(Value::String(s)) if s == "last" => num_pages,
            Some(value) => query_usize(value)
                .filter(|n| *n >= 1)
                .ok_or_else(|| LookupError::InvalidPage("That page number is not an integer".to_string()))?,
        };

        if number > num_pages {
            return Err(LookupError::InvalidPage(
                "That page contains no results".to_string(),
            ));
        }

        let results = items
            .into_iter()
            .skip((number - 1) * page_size)
            .take(page_size)
            .collect();

        Ok(Page {
            count,
            next: (number < num_pages).then_some(number + 1),
            previous: (number > 1).then(|| number - 1),
            results,
        })
    }
}

fn query_usize(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
