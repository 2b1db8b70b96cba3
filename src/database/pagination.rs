use serde::{Deserialize, Serialize};

use crate::{
    constants::{MAX_PAGE_SIZE, PAGE_SIZE},
    error::{Error, HtmlError, TypeError},
    form::Form,
};

/// Page selection requested by the caller through `page` and `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub limit: i64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: PAGE_SIZE,
        }
    }
}

impl PageParams {
    pub fn from_form(form: &Form) -> Result<Self, TypeError> {
        let page = form.get_number::<i64>("page")?.unwrap_or(1);
        let limit = form.get_number::<i64>("limit")?.unwrap_or(PAGE_SIZE);

        if page < 1 {
            return Err(TypeError::new("Invalid page"));
        }
        if limit < 1 {
            return Err(TypeError::new("Invalid limit"));
        }

        let limit = limit.min(MAX_PAGE_SIZE);
        if (page - 1).checked_mul(limit).is_none() {
            return Err(TypeError::new("Invalid page"));
        }

        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    /// Builds a page from one LIMIT/OFFSET window. `total_rows` is the size of
    /// the whole filtered set. `base` is the path the links point at.
    pub fn from_rows(
        rows: Vec<T>,
        total_rows: i64,
        params: PageParams,
        base: &str,
    ) -> Result<Self, Error> {
        if rows.is_empty() {
            if params.page > 1 {
                return Err(HtmlError::NotFound.new("Invalid page"));
            }
            return Ok(Self::no_rows());
        }

        let link = |page: i64| format!("{base}?page={page}&limit={}", params.limit);
        let page_count = (total_rows + params.limit - 1) / params.limit;

        Ok(Self {
            count: total_rows,
            next: (params.page < page_count).then(|| link(params.page + 1)),
            previous: (params.page > 1).then(|| link(params.page - 1)),
            results: rows,
        })
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }

    pub fn map<U, F>(self, f: F) -> PageContext<U>
    where
        F: FnMut(T) -> U,
    {
        PageContext {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: i64, limit: i64) -> PageParams {
        PageParams { page, limit }
    }

    #[test]
    fn middle_page_links_both_ways() {
        let page = PageContext::from_rows(vec![4, 5, 6], 9, params(2, 3), "/api/recipes").unwrap();
        assert_eq!(page.count, 9);
        assert_eq!(page.next.as_deref(), Some("/api/recipes?page=3&limit=3"));
        assert_eq!(page.previous.as_deref(), Some("/api/recipes?page=1&limit=3"));
    }

    #[test]
    fn last_page_has_no_next() {
        let page = PageContext::from_rows(vec![7], 7, params(3, 3), "/api/users").unwrap();
        assert_eq!(page.next, None);
        assert!(page.previous.is_some());
    }

    #[test]
    fn empty_first_page_is_fine_but_past_end_is_not() {
        let page = PageContext::<i32>::from_rows(vec![], 0, params(1, 6), "/x").unwrap();
        assert_eq!(page, PageContext::no_rows());

        let error = PageContext::<i32>::from_rows(vec![], 0, params(4, 6), "/x").unwrap_err();
        assert_eq!(error.code, 404);
    }

    #[test]
    fn limit_is_capped_and_validated() {
        let form = Form::from_data(vec![
            ("page".to_string(), "2".to_string()),
            ("limit".to_string(), "1000".to_string()),
        ]);
        let params = PageParams::from_form(&form).unwrap();
        assert_eq!(params.limit, MAX_PAGE_SIZE);
        assert_eq!(params.offset(), MAX_PAGE_SIZE);

        let form = Form::from_data(vec![("limit".to_string(), "0".to_string())]);
        assert!(PageParams::from_form(&form).is_err());
    }

    #[test]
    fn pages_past_any_offset_are_refused() {
        let form = Form::from_data(vec![("page".to_string(), i64::MAX.to_string())]);
        assert!(PageParams::from_form(&form).is_err());

        let huge = params(i64::MAX, MAX_PAGE_SIZE);
        assert_eq!(huge.offset(), i64::MAX);
    }
}
