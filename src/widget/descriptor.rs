use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

static AGGREGATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z]+)\s*\(\s*(\*|\w+)\s*\)\s*$").unwrap());

/// Client-built query, deserialized straight from the request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescriptor {
    #[serde(default = "default_select")]
    pub select: Vec<String>,
    pub from: String,
    #[serde(default, rename = "where")]
    pub conditions: Map<String, Value>,
    #[serde(default)]
    pub order_by: Map<String, Value>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

fn default_select() -> Vec<String> {
    vec![WILDCARD.to_string()]
}

pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }
}

impl std::str::FromStr for AggregateFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "COUNT" => Ok(Self::Count),
            "SUM" => Ok(Self::Sum),
            "AVG" => Ok(Self::Avg),
            "MIN" => Ok(Self::Min),
            "MAX" => Ok(Self::Max),
            _ => Err(s.to_string()),
        }
    }
}

/// One parsed entry of the `select` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectItem {
    Wildcard,
    Field(String),
    /// `FUNC(arg)` where the function name failed to parse as an aggregate.
    UnknownFunction(String),
    Aggregate {
        function: AggregateFunction,
        field: String,
    },
}

impl SelectItem {
    pub fn parse(raw: &str) -> Self {
        if raw.trim() == WILDCARD {
            return SelectItem::Wildcard;
        }
        match AGGREGATE_REGEX.captures(raw) {
            Some(caps) => match caps[1].parse::<AggregateFunction>() {
                Ok(function) => SelectItem::Aggregate {
                    function,
                    field: caps[2].to_string(),
                },
                Err(name) => SelectItem::UnknownFunction(name),
            },
            None => SelectItem::Field(raw.to_string()),
        }
    }

    /// Key used for this item in result rows.
    pub fn output_key(&self) -> String {
        match self {
            SelectItem::Wildcard => WILDCARD.to_string(),
            SelectItem::Field(name) | SelectItem::UnknownFunction(name) => name.clone(),
            SelectItem::Aggregate { function, field } => {
                format!("{}({})", function.as_str(), field)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            _ => Err(s.to_uppercase()),
        }
    }
}
