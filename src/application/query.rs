//! Listing query model: exact-match filters plus offset pagination.

use std::collections::BTreeMap;

use crate::domain::{error::DomainError, types::TaskStatus};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

const PAGE_PARAM: &str = "page";
const PER_PAGE_PARAM: &str = "per_page";

/// Task fields that can be used as listing filters.
///
/// Variants are declared in lexicographic order of their wire names so the
/// derived `Ord` sorts filters the same way their names sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterField {
    AssigneeId,
    Status,
    Title,
}

impl FilterField {
    pub const ALL: [FilterField; 3] = [
        FilterField::AssigneeId,
        FilterField::Status,
        FilterField::Title,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterField::AssigneeId => "assignee_id",
            FilterField::Status => "status",
            FilterField::Title => "title",
        }
    }

    pub fn from_param(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == name)
    }
}

/// A read request for task listings.
///
/// Filters live in an ordered map, so two queries built from the same
/// `(field, value)` pairs compare equal regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskQuery {
    pub filters: BTreeMap<FilterField, String>,
    pub page: u32,
    pub per_page: u32,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            filters: BTreeMap::new(),
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Filters parsed into the types the store binds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypedTaskFilter {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<i64>,
}

impl TaskQuery {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            filters: BTreeMap::new(),
            page: sanitize_page(Some(page)),
            per_page: sanitize_per_page(Some(per_page)),
        }
    }

    pub fn with_filter(mut self, field: FilterField, value: impl Into<String>) -> Self {
        self.filters.insert(field, value.into());
        self
    }

    /// Build a query from raw `key=value` request parameters.
    ///
    /// Unknown keys and empty values are ignored, the first occurrence of a
    /// repeated key wins, and unparsable or non-positive pagination values fall
    /// back to the defaults.
    pub fn from_params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filters = BTreeMap::new();
        let mut page = None;
        let mut per_page = None;

        for (key, value) in params {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            if value.is_empty() {
                continue;
            }
            match key {
                PAGE_PARAM => {
                    if page.is_none() {
                        page = Some(value.parse::<i64>().ok());
                    }
                }
                PER_PAGE_PARAM => {
                    if per_page.is_none() {
                        per_page = Some(value.parse::<i64>().ok());
                    }
                }
                other => {
                    if let Some(field) = FilterField::from_param(other) {
                        filters.entry(field).or_insert_with(|| value.to_string());
                    }
                }
            }
        }

        Self {
            filters,
            page: sanitize_page(positive_u32(page.flatten())),
            per_page: sanitize_per_page(positive_u32(per_page.flatten())),
        }
    }

    pub fn filter(&self, field: FilterField) -> Option<&str> {
        self.filters.get(&field).map(String::as_str)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    /// Parse filter values into typed predicates, rejecting unknown statuses and
    /// non-integer assignee ids.
    pub fn typed_filter(&self) -> Result<TypedTaskFilter, DomainError> {
        let status = self
            .filter(FilterField::Status)
            .map(str::parse::<TaskStatus>)
            .transpose()?;

        let assignee_id = self
            .filter(FilterField::AssigneeId)
            .map(|raw| {
                raw.parse::<i64>().map_err(|_| {
                    DomainError::validation(format!("invalid assignee_id filter `{raw}`"))
                })
            })
            .transpose()?;

        Ok(TypedTaskFilter {
            title: self.filter(FilterField::Title).map(str::to_string),
            status,
            assignee_id,
        })
    }

    /// Validate the filters and rewrite them into canonical form, so that
    /// `assignee_id=05` and `assignee_id=5` share one cache entry.
    pub fn normalized(&self) -> Result<TaskQuery, DomainError> {
        let typed = self.typed_filter()?;
        let mut filters = BTreeMap::new();
        if let Some(assignee_id) = typed.assignee_id {
            filters.insert(FilterField::AssigneeId, assignee_id.to_string());
        }
        if let Some(status) = typed.status {
            filters.insert(FilterField::Status, status.as_str().to_string());
        }
        if let Some(title) = typed.title {
            filters.insert(FilterField::Title, title);
        }

        Ok(TaskQuery {
            filters,
            page: self.page,
            per_page: self.per_page,
        })
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.per_page.max(1)))
    }
}

fn positive_u32(value: Option<i64>) -> Option<u32> {
    value
        .filter(|value| *value > 0)
        .map(|value| u32::try_from(value).unwrap_or(u32::MAX))
}

fn sanitize_page(page: Option<u32>) -> u32 {
    page.filter(|page| *page > 0).unwrap_or(DEFAULT_PAGE)
}

fn sanitize_per_page(per_page: Option<u32>) -> u32 {
    per_page
        .filter(|size| *size > 0)
        .map(|size| size.min(MAX_PER_PAGE))
        .unwrap_or(DEFAULT_PER_PAGE)
}
