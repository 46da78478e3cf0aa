use anyhow::anyhow;
use serde::{Deserialize, Serialize};

pub type Url = String;

const DEFAULT_ENTRIES_PER_PAGE: u32 = 25;
const MAX_ENTRIES_PER_PAGE: u32 = 1000;

#[derive(Serialize, Default, Debug)]
pub struct Page {
    page_number: u32,
    is_current_page: bool,
    link: Url,
}

#[derive(Serialize, Default, Debug)]
pub struct TableComponent<T: Serialize + Default> {
    entries: Vec<T>,
    pages: Vec<Page>,
    first_page: Option<Url>,
    last_page: Option<Page>,
    previous_page: Option<Url>,
    next_page: Option<Url>,
    columns: Vec<String>,
    max_entries_per_page: u32,
    total: i64,
}

#[derive(Deserialize, Default)]
pub struct Query {
    page: Option<u32>,
    entries_per_page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryNormalized {
    page: u32,
    entries_per_page: u32,
}

impl QueryNormalized {
    pub fn limit(&self) -> i64 {
        self.entries_per_page as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1)
            .checked_mul(self.entries_per_page)
            .map_or(0, |offset| offset as i64)
    }
}

impl Query {
    pub fn new(page: Option<u32>, entries_per_page: Option<u32>) -> Self {
        Self {
            page,
            entries_per_page,
        }
    }

    pub fn normalize(&self) -> QueryNormalized {
        QueryNormalized {
            page: self.page.unwrap_or(1).max(1),
            entries_per_page: self
                .entries_per_page
                .unwrap_or(DEFAULT_ENTRIES_PER_PAGE)
                .clamp(1, MAX_ENTRIES_PER_PAGE),
        }
    }
}

impl<T: Serialize + Default> TableComponent<T> {
    pub fn new(
        entries: Vec<T>,
        count: i64,
        api_path: impl AsRef<str>,
        query: QueryNormalized,
    ) -> anyhow::Result<Self> {
        let number_of_pages = (count as f64 / query.entries_per_page as f64).ceil() as u32;
        let current_page = query.page;
        let link = |page: u32| {
            format!(
                "{}?page={}&entries_per_page={}",
                api_path.as_ref(),
                page,
                query.entries_per_page
            )
        };

        let mut component = Self {
            entries,
            columns: get_struct_fields_names(T::default())?,
            max_entries_per_page: query.entries_per_page,
            total: count,
            ..Self::default()
        };
        component.pages = (current_page as i64 - 3..=current_page as i64 + 3)
            .filter(|p| *p >= 1)
            .filter(|p| *p <= number_of_pages as i64)
            .map(|p| Page {
                page_number: p as u32,
                is_current_page: p == current_page as i64,
                link: link(p as u32),
            })
            .collect();

        let (Some(first), Some(last)) = (
            component.pages.first().map(|p| p.page_number),
            component.pages.last().map(|p| p.page_number),
        ) else {
            return Ok(component);
        };

        if last != number_of_pages {
            component.last_page = Some(Page {
                page_number: number_of_pages,
                is_current_page: false,
                link: link(number_of_pages),
            })
        };

        if first != 1 {
            component.first_page = Some(link(1))
        };

        if current_page < number_of_pages {
            component.next_page = Some(link(current_page + 1))
        };

        if current_page != 1 {
            component.previous_page = Some(link(current_page - 1))
        };

        Ok(component)
    }
}

fn get_struct_fields_names(s: impl Serialize) -> anyhow::Result<Vec<String>> {
    let j = serde_json::to_value(s)?;
    let j = j.as_object().ok_or(anyhow!("it should be an object"))?;
    Ok(j.iter().map(|f| f.0).cloned().collect())
}
