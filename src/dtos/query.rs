//! Query DTOs - Parametri di paginazione e periodi condivisi tra gli endpoint

use serde::{Deserialize, Serialize};

/// Pagina richiesta normalizzata: page >= 1, 1 <= limit <= max
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32, max_limit: u32) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(default_limit).clamp(1, max_limit);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }

    pub fn pagination(&self, total: i64) -> Pagination {
        Pagination::new(self.page, self.limit, total)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let limit_i = i64::from(limit.max(1));
        Self {
            page,
            limit,
            total,
            total_pages: (total + limit_i - 1) / limit_i,
        }
    }
}

/// Query generica `?page&limit`
#[derive(Deserialize, Debug, Default)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Finestra temporale delle statistiche
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Period {
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "90d")]
    NinetyDays,
    #[serde(rename = "1y")]
    OneYear,
}

impl Period {
    /// Valori sconosciuti ricadono su 30 giorni
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("7d") => Period::SevenDays,
            Some("90d") => Period::NinetyDays,
            Some("1y") => Period::OneYear,
            _ => Period::ThirtyDays,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::SevenDays => "7d",
            Period::ThirtyDays => "30d",
            Period::NinetyDays => "90d",
            Period::OneYear => "1y",
        }
    }

    pub fn days(self) -> i64 {
        match self {
            Period::SevenDays => 7,
            Period::ThirtyDays => 30,
            Period::NinetyDays => 90,
            Period::OneYear => 365,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct PeriodQuery {
    pub period: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults_and_clamping() {
        let page = PageRequest::new(None, None, 20, 100);
        assert_eq!(page, PageRequest { page: 1, limit: 20 });
        assert_eq!(page.offset(), 0);

        let page = PageRequest::new(Some(0), Some(1000), 20, 100);
        assert_eq!(page, PageRequest { page: 1, limit: 100 });

        let page = PageRequest::new(Some(3), Some(0), 20, 100);
        assert_eq!(page.limit, 1);
        assert_eq!(page.offset(), 2);
    }

    #[test]
    fn test_pagination_total_pages() {
        assert_eq!(Pagination::new(1, 20, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 20, 20).total_pages, 1);
        assert_eq!(Pagination::new(1, 20, 21).total_pages, 2);
    }

    #[test]
    fn test_pagination_serializes_camel_total_pages() {
        let json = serde_json::to_value(Pagination::new(2, 10, 35)).unwrap();
        assert_eq!(json["totalPages"], 4);
        assert_eq!(json["page"], 2);
    }

    #[test]
    fn test_period_parse_falls_back_to_30d() {
        assert_eq!(Period::parse(Some("7d")).days(), 7);
        assert_eq!(Period::parse(Some("1y")).days(), 365);
        assert_eq!(Period::parse(Some("weird")), Period::ThirtyDays);
        assert_eq!(Period::parse(None), Period::ThirtyDays);
        assert_eq!(Period::parse(Some("90d")).as_str(), "90d");
    }
}
