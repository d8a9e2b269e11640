mod client;
mod page;

pub use client::{Client, ClientPayload, FieldError, NewClient};
pub use page::{Direction, Page, PageRequest, Pageable, Sort, SortField, SortInfo};
