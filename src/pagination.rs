use serde_json::{json, Value as JsonValue};

use crate::config::Settings;
use crate::error::ApiError;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub size: i64,
}

impl Page {
    /// A missing page means the first one. A `page_size` that is not a positive
    /// integer falls back to the default; larger ones are clamped to the maximum.
    pub fn from_params(page: Option<&str>, page_size: Option<&str>, settings: &Settings)
        -> Result<Self, ApiError> {

        let number = match page {
            Some(value) => match value.trim().parse::<i64>() {
                Ok(n) if n >= 1 => n,
                _ => return Err(ApiError::InvalidPage),
            },
            None => 1,
        };

        let size = page_size
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|&n| n > 0)
            .map(|n| n.min(settings.max_page_size))
            .unwrap_or(settings.page_size);

        Ok(Page { number, size })
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1).saturating_mul(self.size)
    }

    pub fn last_page(&self, count: i64) -> i64 {
        ((count + self.size - 1) / self.size).max(1)
    }

    /// Only the first page may be empty.
    pub fn check(&self, count: i64) -> Result<(), ApiError> {
        if self.number > self.last_page(count) {
            Err(ApiError::InvalidPage)
        }
        else {
            Ok(())
        }
    }

    pub fn envelope(&self, count: i64, results: Vec<JsonValue>) -> JsonValue {
        let next = if self.number < self.last_page(count) {
            Some(self.number + 1)
        }
        else {
            None
        };
        let previous = if self.number > 1 { Some(self.number - 1) } else { None };

        json!({
            "count": count,
            "next": next,
            "previous": previous,
            "results": results,
        })
    }
}
