//! Extractors whose rejections render as [`ApiError`] bodies instead of
//! axum's plain-text defaults.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use serde::Deserialize;
use tracing::debug;

use crate::config::PagingConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::{Direction, PageRequest, Sort, SortField};

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(%rejection, "Rejected request body");
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        debug!(%rejection, "Rejected query string");
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        debug!(%rejection, "Rejected path parameter");
        ApiError::bad_request(rejection.body_text())
    }
}

/// Raw paging query parameters. `linesPerPage` is accepted as an alias
/// for `size`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub lines_per_page: Option<i64>,
    pub order_by: Option<String>,
    pub direction: Option<String>,
}

impl PageParams {
    /// Apply the configured defaults and limits.
    pub fn resolve(&self, paging: &PagingConfig) -> ApiResult<PageRequest> {
        let page = match self.page {
            None => 0,
            Some(page) => u32::try_from(page)
                .map_err(|_| ApiError::bad_request(format!("Invalid page number {}", page)))?,
        };

        let size = match self.size.or(self.lines_per_page) {
            None => paging.default_size,
            Some(size) if size <= 0 => {
                return Err(ApiError::bad_request(format!("Invalid page size {}", size)));
            }
            Some(size) => u32::try_from(size).unwrap_or(u32::MAX).min(paging.max_size),
        };

        let field = match &self.order_by {
            None => paging.default_sort.field,
            Some(name) => name.parse::<SortField>().map_err(ApiError::bad_request)?,
        };
        let direction = match &self.direction {
            None => paging.default_sort.direction,
            Some(name) => name.parse::<Direction>().map_err(ApiError::bad_request)?,
        };

        Ok(PageRequest {
            page,
            size,
            sort: Sort { field, direction },
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct IncomeParams {
    pub income: f64,
}

#[derive(Debug, Deserialize)]
pub struct CpfParams {
    pub cpf: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_params_use_configured_defaults() {
        let paging = PagingConfig::default();
        let request = PageParams::default().resolve(&paging).unwrap();
        assert_eq!(request.page, 0);
        assert_eq!(request.size, 12);
        assert_eq!(request.sort, paging.default_sort);
    }

    #[test]
    fn lines_per_page_is_an_alias_and_size_is_clamped() {
        let paging = PagingConfig::default();
        let params = PageParams {
            lines_per_page: Some(3),
            ..Default::default()
        };
        assert_eq!(params.resolve(&paging).unwrap().size, 3);

        let params = PageParams {
            size: Some(10_000),
            ..Default::default()
        };
        assert_eq!(params.resolve(&paging).unwrap().size, paging.max_size);
    }

    #[test]
    fn invalid_values_are_bad_requests() {
        let paging = PagingConfig::default();
        for params in [
            PageParams {
                page: Some(-1),
                ..Default::default()
            },
            PageParams {
                size: Some(0),
                ..Default::default()
            },
            PageParams {
                order_by: Some("salary".into()),
                ..Default::default()
            },
            PageParams {
                direction: Some("sideways".into()),
                ..Default::default()
            },
        ] {
            let err = params.resolve(&paging).unwrap_err();
            assert_eq!(err.kind, crate::error::ErrorKind::BadRequest);
        }
    }
}
