use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Client;

/// Client fields a listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Name,
    Cpf,
    Income,
    BirthDate,
    Children,
}

impl SortField {
    /// Column name in the `clients` table.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Name => "name",
            SortField::Cpf => "cpf",
            SortField::Income => "income",
            SortField::BirthDate => "birth_date",
            SortField::Children => "children",
        }
    }

    /// `ORDER BY` expression for this field. Text columns use the "C"
    /// collation so PostgreSQL orders them bytewise, as `compare` does.
    pub fn order_expr(&self) -> &'static str {
        match self {
            SortField::Name => r#"name COLLATE "C""#,
            SortField::Cpf => r#"cpf COLLATE "C""#,
            other => other.column(),
        }
    }

    fn compare(&self, a: &Client, b: &Client) -> Ordering {
        match self {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Name => a.name.cmp(&b.name),
            SortField::Cpf => a.cpf.cmp(&b.cpf),
            SortField::Income => a.income.total_cmp(&b.income),
            // Missing birth dates sort last ascending, matching PostgreSQL's NULLS LAST.
            SortField::BirthDate => match (a.birth_date, b.birth_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortField::Children => a.children.cmp(&b.children),
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SortField::Id),
            "name" => Ok(SortField::Name),
            "cpf" => Ok(SortField::Cpf),
            "income" => Ok(SortField::Income),
            "birthDate" => Ok(SortField::BirthDate),
            "children" => Ok(SortField::Children),
            other => Err(format!("Unknown sort field '{}'", other)),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortField::Id => "id",
            SortField::Name => "name",
            SortField::Cpf => "cpf",
            SortField::Income => "income",
            SortField::BirthDate => "birthDate",
            SortField::Children => "children",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn keyword(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Direction::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Direction::Desc)
        } else {
            Err(format!("Unknown sort direction '{}'", s))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: Direction,
}

impl Sort {
    /// Total order used by every store: the requested field first, then id
    /// ascending to break ties.
    pub fn compare(&self, a: &Client, b: &Client) -> Ordering {
        let primary = self.field.compare(a, b);
        let primary = match self.direction {
            Direction::Asc => primary,
            Direction::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// A resolved page request: zero-based page number, a positive size and a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort: Sort,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SortInfo {
    pub sorted: bool,
    pub unsorted: bool,
    pub empty: bool,
}

impl SortInfo {
    fn sorted() -> Self {
        Self {
            sorted: true,
            unsorted: false,
            empty: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pageable {
    pub sort: SortInfo,
    pub page_number: u32,
    pub page_size: u32,
    pub offset: u64,
    pub paged: bool,
    pub unpaged: bool,
}

/// Page envelope returned by every listing endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub pageable: Pageable,
    pub total_pages: u64,
    pub total_elements: u64,
    pub last: bool,
    pub size: u32,
    pub number: u32,
    pub sort: SortInfo,
    pub number_of_elements: usize,
    pub first: bool,
    pub empty: bool,
}

impl<T> Page<T> {
    /// Wrap one slice of a larger collection holding `total_elements` items.
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        let size = u64::from(request.size);
        let total_pages = total_elements.div_ceil(size);
        let number = request.page;

        Self {
            number_of_elements: content.len(),
            empty: content.is_empty(),
            content,
            pageable: Pageable {
                sort: SortInfo::sorted(),
                page_number: number,
                page_size: request.size,
                offset: request.offset(),
                paged: true,
                unpaged: false,
            },
            total_pages,
            total_elements,
            last: u64::from(number) + 1 >= total_pages,
            size: request.size,
            number,
            sort: SortInfo::sorted(),
            first: number == 0,
        }
    }
}

impl Page<Client> {
    /// Sort `items` and cut out the requested page.
    pub fn from_unsorted(mut items: Vec<Client>, request: &PageRequest) -> Self {
        items.sort_by(|a, b| request.sort.compare(a, b));
        let total = items.len() as u64;
        let content = items
            .into_iter()
            .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
            .take(request.size as usize)
            .collect();
        Self::new(content, request, total)
    }
}
