//! Summary report schema and grouping
//!
//! The reports API answers a summary query with groups, each holding a list
//! of sub-groups with tracked seconds. Which dimension the groups and
//! sub-groups stand for is chosen by the `grouping` and `sub_grouping`
//! parameters of the query.

use crate::error::{Result, TogglError};
use crate::options::{OptionValue, QueryOptions};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier that the API sends either as a number or as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Unsigned(u64),
            Float(f64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => EntityId(n.to_string()),
            RawId::Unsigned(n) => EntityId(n.to_string()),
            RawId::Float(n) => EntityId(n.to_string()),
            RawId::Text(text) => EntityId(text),
        })
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub groups: Vec<ReportGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportGroup {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub title: GroupTitle,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sub_groups: Vec<ReportSubgroup>,
}

/// Composite display title of a group; which parts are set depends on the
/// grouping dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupTitle {
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSubgroup {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub seconds: u64,
}

impl SummaryReport {
    /// Decode a response body. Shapes other than the documented schema are
    /// rejected with [`TogglError::MalformedResponse`].
    pub fn from_value(body: Value) -> Result<Self> {
        if !body.is_object() {
            return Err(TogglError::MalformedResponse(format!(
                "expected a JSON object, got {}",
                json_kind(&body)
            )));
        }
        serde_json::from_value(body).map_err(|e| TogglError::MalformedResponse(e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl ReportGroup {
    pub fn total_seconds(&self) -> u64 {
        self.sub_groups.iter().map(|sub| sub.seconds).sum()
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Dimension a report is grouped or sub-grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Projects,
    Clients,
    Users,
    Tasks,
    TimeEntries,
}

impl Dimension {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "projects" => Some(Dimension::Projects),
            "clients" => Some(Dimension::Clients),
            "users" => Some(Dimension::Users),
            "tasks" => Some(Dimension::Tasks),
            "time_entries" => Some(Dimension::TimeEntries),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Projects => "projects",
            Dimension::Clients => "clients",
            Dimension::Users => "users",
            Dimension::Tasks => "tasks",
            Dimension::TimeEntries => "time_entries",
        }
    }

    /// Option naming a single id of this dimension, used for filtering.
    pub fn id_option(self) -> &'static str {
        match self {
            Dimension::Projects => "project_id",
            Dimension::Clients => "client_id",
            Dimension::Users => "user_id",
            Dimension::Tasks => "task_id",
            Dimension::TimeEntries => "time_entry_id",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fill in `grouping` and `sub_grouping` when the caller left them out.
///
/// Grouping defaults to users unless sub-grouping is clients or users, and
/// sub-grouping defaults to clients unless grouping is clients. Neither
/// default repeats the other dimension.
pub fn apply_grouping_defaults(options: &mut QueryOptions) {
    if !options.contains("grouping")
        && !matches!(options.text("sub_grouping"), Some("clients" | "users"))
    {
        options.insert("grouping", OptionValue::Text("users".to_string()));
    }
    if !options.contains("sub_grouping") && options.text("grouping") != Some("clients") {
        options.insert("sub_grouping", OptionValue::Text("clients".to_string()));
    }
}

/// Grouping dimensions of a query, after defaults were applied.
///
/// Values the API knows but this crate does not are kept in the query and
/// show up here as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupingSelection {
    pub grouping: Option<Dimension>,
    pub sub_grouping: Option<Dimension>,
}

impl GroupingSelection {
    pub fn new(grouping: Dimension, sub_grouping: Dimension) -> Self {
        Self {
            grouping: Some(grouping),
            sub_grouping: Some(sub_grouping),
        }
    }

    pub fn from_options(options: &QueryOptions) -> Self {
        Self {
            grouping: options.text("grouping").and_then(Dimension::parse),
            sub_grouping: options.text("sub_grouping").and_then(Dimension::parse),
        }
    }

    /// Apply the defaults to `options` and read the resulting selection.
    pub fn resolve(options: &mut QueryOptions) -> Self {
        apply_grouping_defaults(options);
        Self::from_options(options)
    }
}

/// Narrows an hours sum to one group and/or one sub-group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub group: Option<String>,
    pub subgroup: Option<String>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Read `{grouping}_id` and `{sub_grouping}_id`, e.g. `user_id` and
    /// `client_id` for the default selection.
    pub fn from_options(selection: &GroupingSelection, options: &QueryOptions) -> Self {
        let lookup = |dimension: Option<Dimension>| {
            dimension
                .and_then(|d| options.text(d.id_option()))
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        };
        Self {
            group: lookup(selection.grouping),
            subgroup: lookup(selection.sub_grouping),
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.group.is_none() && self.subgroup.is_none()
    }

    pub fn matches_group(&self, id: Option<&EntityId>) -> bool {
        matches_id(self.group.as_deref(), id)
    }

    pub fn matches_subgroup(&self, id: Option<&EntityId>) -> bool {
        matches_id(self.subgroup.as_deref(), id)
    }
}

fn matches_id(wanted: Option<&str>, id: Option<&EntityId>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => id.is_some_and(|id| id.as_str() == wanted),
    }
}
