//! Pagination query parameters.

use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};

use crate::domain::page::PageWindow;
use crate::error::AppError;

/// `limit` and `page` from the query string.
///
/// Uses `serde_with` to parse both from strings; negative or non-numeric
/// values fail deserialization.
#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub limit: Option<u32>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page: Option<u32>,
}

impl PaginationParams {
    /// Validates the parameters and builds the page window.
    ///
    /// # Defaults
    ///
    /// - `limit`: `default_limit` (`0` disables pagination)
    /// - `page`: 1
    ///
    /// # Errors
    ///
    /// [`AppError::BadRequest`] if `page` is 0.
    pub fn window(&self, default_limit: u32) -> Result<PageWindow, AppError> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(AppError::bad_request("Page must be greater than 0"));
        }

        Ok(PageWindow::new(self.limit.unwrap_or(default_limit), page))
    }
}
