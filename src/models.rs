use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use smallvec::SmallVec;

pub const SAMPLE_SIZE: usize = 5;
pub const UNIQUE_SAMPLE_SIZE: usize = 10;

/// Tag attached to every analysis produced by this engine.
pub const LOCAL_SOURCE: &str = "local";

/// A raw cell as it arrives from a spreadsheet import or a SQL result set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

pub type Row = IndexMap<String, CellValue>;
pub type Dataset = Vec<Row>;

impl CellValue {
    /// Nulls and empty strings are excluded from every per-column analysis.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Lower-cased, trimmed text form used for month, quarter and period matching.
    pub fn label(&self) -> String {
        self.to_string().trim().to_lowercase()
    }

    pub(crate) fn identity(&self) -> CellKey<'_> {
        match self {
            CellValue::Null => CellKey::Null,
            CellValue::Bool(b) => CellKey::Bool(*b),
            // -0.0 and 0.0 are the same value
            CellValue::Number(n) if *n == 0.0 => CellKey::Number(0.0f64.to_bits()),
            CellValue::Number(n) => CellKey::Number(n.to_bits()),
            CellValue::Text(s) => CellKey::Text(s),
        }
    }
}

/// Hashable identity of a cell: the number `1` and the text `"1"` differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CellKey<'a> {
    Null,
    Bool(bool),
    Number(u64),
    Text(&'a str),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "null"),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Number(n) if *n == 0.0 => write!(f, "0"),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Bool(b),
            Value::Number(n) => n.as_f64().map_or(CellValue::Null, CellValue::Number),
            Value::String(s) => CellValue::Text(s),
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_none(),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Currency,
    Percentage,
    Numeric,
    Date,
    Categorical,
    Text,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Numeric | ColumnType::Currency | ColumnType::Percentage)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Currency => "currency",
            ColumnType::Percentage => "percentage",
            ColumnType::Numeric => "numeric",
            ColumnType::Date => "date",
            ColumnType::Categorical => "categorical",
            ColumnType::Text => "text",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub null_count: usize,
    pub total_count: usize,
    pub unique_count: usize,
    pub unique_sample: Vec<String>,
    pub sample: SmallVec<[String; SAMPLE_SIZE]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PeriodType::Daily => "daily",
            PeriodType::Weekly => "weekly",
            PeriodType::Monthly => "monthly",
            PeriodType::Quarterly => "quarterly",
            PeriodType::Yearly => "yearly",
        };
        f.write_str(name)
    }
}

/// How a row's period-column cell maps onto a period label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeriodLabels {
    /// Month names and quarter labels: lower-cased trimmed text.
    #[default]
    Lowercased,
    /// Parsed timestamps: the `YYYY-MM-DD` calendar day.
    CalendarDay,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedPeriod {
    pub column: String,
    pub period_type: PeriodType,
    pub period_count: usize,
}

/// The winning temporal axis of a dataset, if any.
///
/// When `has_periods` is false every other field is empty and no
/// period-conditioned statistic may be produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodInfo {
    pub has_periods: bool,
    pub period_column: Option<String>,
    pub period_type: Option<PeriodType>,
    pub can_compare: bool,
    pub periods: Vec<String>,
    pub all_detected: Vec<DetectedPeriod>,
    #[serde(skip)]
    pub labels: PeriodLabels,
}

impl PeriodInfo {
    pub fn none() -> Self {
        Self {
            has_periods: false,
            period_column: None,
            period_type: None,
            can_compare: false,
            periods: Vec::new(),
            all_detected: Vec::new(),
            labels: PeriodLabels::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quartiles {
    #[serde(rename = "Q1")]
    pub q1: f64,
    #[serde(rename = "Q2")]
    pub q2: f64,
    #[serde(rename = "Q3")]
    pub q3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodValue {
    pub period: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variation {
    pub first_period: String,
    pub last_period: String,
    pub first_value: f64,
    pub last_value: f64,
    pub change_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericStats {
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub sum: f64,
    pub stddev: f64,
    pub count: usize,
    pub quartiles: Quartiles,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_values: Option<Vec<PeriodValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variation: Option<Variation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoricalStats {
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub unique_count: usize,
    pub top_value: Option<String>,
    pub top_count: usize,
    pub value_counts: Vec<ValueCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateStats {
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub unique_count: usize,
    pub sample: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnStats {
    Numeric(NumericStats),
    /// A numeric-family column where no cell survived cleaning.
    Unusable {
        #[serde(rename = "type")]
        column_type: ColumnType,
        error: String,
    },
    Categorical(CategoricalStats),
    Date(DateStats),
}

impl ColumnStats {
    pub fn as_numeric(&self) -> Option<&NumericStats> {
        match self {
            ColumnStats::Numeric(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn unique_count(&self) -> Option<usize> {
        match self {
            ColumnStats::Categorical(stats) => Some(stats.unique_count),
            ColumnStats::Date(stats) => Some(stats.unique_count),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChartType {
    AreaChart,
    LineChart,
    BarChart,
    PieChart,
    StackedBarChart,
    Table,
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRecommendation {
    pub chart_type: ChartType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_key: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub y_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetAnalysis {
    pub columns: Vec<ColumnInfo>,
    pub periods: PeriodInfo,
    pub stats: IndexMap<String, ColumnStats>,
    pub chart_recommendations: Vec<ChartRecommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub analysis: DatasetAnalysis,
    pub row_count: usize,
    pub source: String,
}
