//! Train record model and the attributes extracted from it.
//!
//! A [`TrainRecord`] is one imported schedule row: an open field map whose
//! column names vary from sheet to sheet. The engine never mutates records;
//! it reads them through the field extractor into [`TrainAttributes`].

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cell values that mean "nothing here" in imported sheets.
const ABSENT_SENTINELS: [&str; 6] = ["-", "—", "null", "无", "n/a", ""];

/// A single loosely-typed cell value from an imported schedule row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A numeric cell.
    Number(f64),
    /// A boolean cell (some exports write check boxes as booleans).
    Flag(bool),
    /// A text cell.
    Text(String),
    /// An empty cell (`null` in JSON).
    Empty,
}

impl FieldValue {
    /// Returns true if the value carries no usable information.
    ///
    /// Empty cells, non-finite numbers and the placeholder strings
    /// `-`, `—`, `null`, `无`, `N/A` (case-insensitive) all count as absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use crew_staffing_engine::models::FieldValue;
    ///
    /// assert!(FieldValue::Text(" N/A ".to_string()).is_absent());
    /// assert!(FieldValue::Empty.is_absent());
    /// assert!(!FieldValue::Number(0.0).is_absent());
    /// ```
    pub fn is_absent(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Number(n) => !n.is_finite(),
            FieldValue::Flag(_) => false,
            FieldValue::Text(s) => {
                let trimmed = s.trim().to_lowercase();
                ABSENT_SENTINELS.contains(&trimmed.as_str())
            }
        }
    }

    /// Returns the value rendered as trimmed text, or `None` if absent.
    ///
    /// Whole numbers render without a fractional part, so a sequence number
    /// imported as `12.0` reads as `"12"`.
    pub fn as_text(&self) -> Option<String> {
        if self.is_absent() {
            return None;
        }
        match self {
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            FieldValue::Number(n) => Some(n.to_string()),
            FieldValue::Flag(b) => Some(b.to_string()),
            FieldValue::Text(s) => Some(s.trim().to_string()),
            FieldValue::Empty => None,
        }
    }

    /// Returns the value as a Decimal if it is numeric or numeric text.
    pub fn as_decimal(&self) -> Option<Decimal> {
        if self.is_absent() {
            return None;
        }
        match self {
            FieldValue::Number(n) => Decimal::try_from(*n).ok(),
            FieldValue::Text(s) => s.trim().parse::<Decimal>().ok(),
            FieldValue::Flag(_) | FieldValue::Empty => None,
        }
    }

    /// Interprets the value as a yes/no flag.
    ///
    /// Accepts booleans, non-zero numbers and the usual spreadsheet spellings
    /// (`是`, `Y`, `yes`, `true`, `1`, `√`).
    pub fn as_flag(&self) -> Option<bool> {
        if self.is_absent() {
            return None;
        }
        match self {
            FieldValue::Flag(b) => Some(*b),
            FieldValue::Number(n) => Some(*n != 0.0),
            FieldValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "是" | "y" | "yes" | "true" | "1" | "√" => Some(true),
                "否" | "n" | "no" | "false" | "0" | "×" => Some(false),
                _ => None,
            },
            FieldValue::Empty => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Number(f64::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

/// One imported schedule row, keyed by the (already header-mapped) column name.
///
/// # Example
///
/// ```
/// use crew_staffing_engine::models::TrainRecord;
///
/// let record = TrainRecord::new()
///     .with("车次", "G1")
///     .with("编组", "8编组")
///     .with("组数", 2.0);
/// assert_eq!(record.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl TrainRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record with `name` set to `value`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns the raw value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Returns the number of fields in the record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over the record's fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for TrainRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Running-time bucket used by conventional-train rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeBucket {
    /// Under 4 hours.
    #[serde(rename = "under4")]
    Under4,
    /// 4 hours up to (not including) 12 hours.
    #[serde(rename = "4to12")]
    From4To12,
    /// 12 hours up to (not including) 24 hours.
    #[serde(rename = "12to24")]
    From12To24,
    /// 24 hours or more.
    #[serde(rename = "over24")]
    Over24,
}

impl TimeBucket {
    /// Maps a running time in hours to its bucket.
    ///
    /// # Examples
    ///
    /// ```
    /// use crew_staffing_engine::models::TimeBucket;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(TimeBucket::from_hours(Decimal::new(35, 1)), TimeBucket::Under4);
    /// assert_eq!(TimeBucket::from_hours(Decimal::from(12)), TimeBucket::From12To24);
    /// ```
    pub fn from_hours(hours: Decimal) -> Self {
        if hours < Decimal::from(4) {
            TimeBucket::Under4
        } else if hours < Decimal::from(12) {
            TimeBucket::From4To12
        } else if hours < Decimal::from(24) {
            TimeBucket::From12To24
        } else {
            TimeBucket::Over24
        }
    }

    /// Returns the configuration label of the bucket.
    pub fn label(&self) -> &'static str {
        match self {
            TimeBucket::Under4 => "under4",
            TimeBucket::From4To12 => "4to12",
            TimeBucket::From12To24 => "12to24",
            TimeBucket::Over24 => "over24",
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Car types that carry their own attendant ratios on conventional trains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarType {
    /// Seat car (硬座/软座).
    Seat,
    /// Hard sleeper (硬卧).
    HardSleeper,
    /// Soft sleeper (软卧).
    SoftSleeper,
    /// Dining car (餐车).
    Dining,
    /// Baggage car (行李车).
    Baggage,
}

/// Number of cars of each type in a train's formation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarCounts {
    /// Seat cars.
    pub seat: u32,
    /// Hard sleeper cars.
    pub hard_sleeper: u32,
    /// Soft sleeper cars.
    pub soft_sleeper: u32,
    /// Dining cars.
    pub dining: u32,
    /// Baggage cars.
    pub baggage: u32,
}

impl CarCounts {
    /// Returns the count for one car type.
    pub fn get(&self, car_type: CarType) -> u32 {
        match car_type {
            CarType::Seat => self.seat,
            CarType::HardSleeper => self.hard_sleeper,
            CarType::SoftSleeper => self.soft_sleeper,
            CarType::Dining => self.dining,
            CarType::Baggage => self.baggage,
        }
    }

    /// Returns true if no car of any type was found.
    pub fn is_empty(&self) -> bool {
        self.seat + self.hard_sleeper + self.soft_sleeper + self.dining + self.baggage == 0
    }
}

/// Normalized attributes of one train, as read by the field extractor.
///
/// Every field is optional or defaulted: extraction gaps are resolved here and
/// only become visible downstream as a failed match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainAttributes {
    /// Train number (车次), if present.
    pub train_number: Option<String>,
    /// Sequence key identifying the physical working.
    pub sequence: Option<String>,
    /// Formation string (e.g. "8编组").
    pub formation: Option<String>,
    /// Running time in hours.
    pub running_time_hours: Option<Decimal>,
    /// Train category (e.g. "直通", "管内").
    pub train_type: Option<String>,
    /// Whether the train runs across a national border.
    pub is_international: bool,
    /// Crew groups the working needs before normalization, if stated.
    pub group_count: Option<Decimal>,
    /// Cars per type.
    pub car_counts: CarCounts,
    /// Number of business-class cars.
    pub business_class_count: u32,
}

impl TrainAttributes {
    /// Returns the running-time bucket, if the running time is known.
    pub fn time_bucket(&self) -> Option<TimeBucket> {
        self.running_time_hours.map(TimeBucket::from_hours)
    }

    /// Returns true if the train has at least one business-class car.
    pub fn has_business_class(&self) -> bool {
        self.business_class_count > 0
    }

    /// A short label for logs and diagnostics.
    pub fn label(&self) -> String {
        self.train_number
            .clone()
            .or_else(|| self.sequence.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }
}
