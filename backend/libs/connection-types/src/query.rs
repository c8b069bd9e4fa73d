use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Raw listing / review queue query string, as received from the client.
///
/// Everything is optional here; defaults, clamping and the sort allow-list are applied by
/// the connection service so that invalid values are rejected in one place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_dir: Option<String>,
    #[serde(rename = "id_distrito", default, skip_serializing_if = "Option::is_none")]
    pub district_id: Option<i64>,
    #[serde(rename = "id_plan", default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<i64>,
    /// Fragment of the client's name, matched case-insensitively
    #[serde(rename = "cliente", default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(rename = "fecha_desde", default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(rename = "fecha_hasta", default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    #[serde(rename = "id_provincia", default, skip_serializing_if = "Option::is_none")]
    pub province_id: Option<i64>,
    #[serde(rename = "id_departamento", default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<i64>,
    /// Only honoured by the general listing; the review queue is always `pending_review`
    #[serde(rename = "estado", default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    RequestDate,
    Plan,
    Client,
    RequestNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field} '{value}': expected one of {allowed}")]
pub struct UnknownSortValue {
    pub field: &'static str,
    pub value: String,
    pub allowed: &'static str,
}

impl SortField {
    pub const ALLOWED: &'static str = "fecha, plan, cliente, numero";

    pub fn as_str(self) -> &'static str {
        match self {
            SortField::RequestDate => "fecha",
            SortField::Plan => "plan",
            SortField::Client => "cliente",
            SortField::RequestNumber => "numero",
        }
    }
}

impl FromStr for SortField {
    type Err = UnknownSortValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fecha" => Ok(SortField::RequestDate),
            "plan" => Ok(SortField::Plan),
            "cliente" => Ok(SortField::Client),
            "numero" => Ok(SortField::RequestNumber),
            other => Err(UnknownSortValue {
                field: "sort_by",
                value: other.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = UnknownSortValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(UnknownSortValue {
                field: "sort_dir",
                value: s.to_string(),
                allowed: "asc, desc",
            }),
        }
    }
}
