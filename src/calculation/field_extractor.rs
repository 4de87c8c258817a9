//! Field extraction from loosely-typed train records.
//!
//! Imported sheets name the same column in many ways. Each logical attribute
//! has an ordered alias list, and the [`FieldAccessor`] trait returns the first
//! alias holding a usable value. Extraction never fails: a missing attribute
//! becomes `None`, `0` or `false`, and the matcher decides what that means.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::models::{CarCounts, FieldValue, TrainAttributes, TrainRecord};

/// Column names holding the formation.
pub const FORMATION_ALIASES: &[&str] = &["编组", "编组形式", "车型编组", "formation", "Formation"];
/// Column names holding the running time.
pub const RUNNING_TIME_ALIASES: &[&str] = &[
    "运行时间",
    "运行时长",
    "全程运行时间",
    "runningTime",
    "running_time",
];
/// Column names holding the departure time.
pub const START_TIME_ALIASES: &[&str] = &["始发时间", "开车时间", "出发时间", "startTime", "departureTime"];
/// Column names holding the arrival time.
pub const END_TIME_ALIASES: &[&str] = &["终到时间", "到达时间", "endTime", "arrivalTime"];
/// Column names holding the sequence key.
pub const SEQUENCE_ALIASES: &[&str] = &["序号", "交路序号", "sequence", "seq"];
/// Column names holding the train number.
pub const TRAIN_NUMBER_ALIASES: &[&str] = &["车次", "trainNumber", "trainNo", "train_no"];
/// Column names holding the crew group count.
pub const GROUP_COUNT_ALIASES: &[&str] = &["组数", "乘务组数", "班组数", "groupCount", "group_count"];
/// Column names holding the train category.
pub const TRAIN_TYPE_ALIASES: &[&str] = &["列车类型", "车次类型", "类型", "trainType", "train_type"];
/// Column names holding the internationality flag.
pub const INTERNATIONAL_ALIASES: &[&str] = &["是否国际", "国际列车", "isInternational", "international"];
/// Column names holding a free-text formation detail (e.g. "硬座8 硬卧2 餐车1").
pub const FORMATION_DETAIL_ALIASES: &[&str] = &["编组详情", "编组明细", "车辆编组", "formationDetail"];
/// Column names holding business-class presence or car count.
pub const BUSINESS_CLASS_ALIASES: &[&str] = &[
    "商务座",
    "商务座车数",
    "商务车厢",
    "businessClass",
    "businessClassCount",
];

const SEAT_ALIASES: &[&str] = &["硬座", "硬座车", "座车", "seatCars", "seat"];
const HARD_SLEEPER_ALIASES: &[&str] = &["硬卧", "硬卧车", "hardSleeper", "hard_sleeper"];
const SOFT_SLEEPER_ALIASES: &[&str] = &["软卧", "软卧车", "softSleeper", "soft_sleeper"];
const DINING_ALIASES: &[&str] = &["餐车", "diningCar", "dining"];
const BAGGAGE_ALIASES: &[&str] = &["行李车", "baggageCar", "baggage"];

/// Labels recognized inside a formation detail string.
const SEAT_TOKENS: &[&str] = &["硬座", "软座"];
const HARD_SLEEPER_TOKENS: &[&str] = &["硬卧"];
const SOFT_SLEEPER_TOKENS: &[&str] = &["软卧"];
const DINING_TOKENS: &[&str] = &["餐车"];
const BAGGAGE_TOKENS: &[&str] = &["行李车"];
const BUSINESS_CLASS_TOKENS: &[&str] = &["商务座", "商务车"];

/// Typed read access to an open field map.
pub trait FieldAccessor {
    /// Returns the raw value stored under exactly `name`.
    fn raw_field(&self, name: &str) -> Option<&FieldValue>;

    /// Returns the first value among `aliases` that is not absent.
    fn first_present(&self, aliases: &[&str]) -> Option<&FieldValue> {
        aliases
            .iter()
            .filter_map(|alias| self.raw_field(alias))
            .find(|value| !value.is_absent())
    }
}

impl FieldAccessor for TrainRecord {
    fn raw_field(&self, name: &str) -> Option<&FieldValue> {
        self.get(name)
    }
}

/// Extracts the formation string.
///
/// Falls back to an `N编组` token inside the formation detail text.
///
/// # Examples
///
/// ```
/// use crew_staffing_engine::calculation::extract_formation;
/// use crew_staffing_engine::models::TrainRecord;
///
/// let record = TrainRecord::new().with("编组明细", "CRH380A 8编组");
/// assert_eq!(extract_formation(&record).as_deref(), Some("8编组"));
/// ```
pub fn extract_formation(record: &impl FieldAccessor) -> Option<String> {
    if let Some(formation) = record.first_present(FORMATION_ALIASES).and_then(FieldValue::as_text) {
        return Some(formation);
    }
    let detail = extract_formation_detail(record)?;
    let idx = detail.find("编组")?;
    let digits: String = detail[..idx]
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if digits.is_empty() {
        None
    } else {
        Some(format!("{}编组", digits))
    }
}

/// Extracts the running time in hours.
///
/// Reads a duration column first (`5.5`, `"5:30"`, `"5小时30分"`), then falls
/// back to arrival minus departure, adding 24h when the train arrives the next
/// day.
///
/// # Examples
///
/// ```
/// use crew_staffing_engine::calculation::extract_running_time;
/// use crew_staffing_engine::models::TrainRecord;
/// use rust_decimal::Decimal;
///
/// let record = TrainRecord::new().with("始发时间", "22:30").with("终到时间", "06:00");
/// assert_eq!(extract_running_time(&record), Some(Decimal::new(75, 1)));
/// ```
pub fn extract_running_time(record: &impl FieldAccessor) -> Option<Decimal> {
    if let Some(hours) = record
        .first_present(RUNNING_TIME_ALIASES)
        .and_then(parse_duration_hours)
    {
        return Some(hours);
    }

    let start = record
        .first_present(START_TIME_ALIASES)
        .and_then(FieldValue::as_text)
        .and_then(|s| parse_clock(&s))?;
    let end = record
        .first_present(END_TIME_ALIASES)
        .and_then(FieldValue::as_text)
        .and_then(|s| parse_clock(&s))?;

    let mut minutes = (end - start).num_minutes();
    if minutes < 0 {
        minutes += 24 * 60;
    }
    Some(Decimal::from(minutes) / Decimal::from(60))
}

fn parse_clock(text: &str) -> Option<NaiveTime> {
    let text = text.trim().replace('：', ":");
    NaiveTime::parse_from_str(&text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&text, "%H:%M:%S"))
        .ok()
}

fn parse_duration_hours(value: &FieldValue) -> Option<Decimal> {
    if let Some(hours) = value.as_decimal() {
        return (!hours.is_sign_negative()).then_some(hours);
    }
    let text = value.as_text()?.replace('：', ":");

    if let Some((h, m)) = text.split_once(':') {
        let h: i64 = h.trim().parse().ok()?;
        let m: i64 = m.trim().split(':').next()?.parse().ok()?;
        return Some(Decimal::from(h) + Decimal::from(m) / Decimal::from(60));
    }

    let (h, rest) = match text.split_once("小时") {
        Some((h, rest)) => (h.trim().parse::<Decimal>().ok()?, rest),
        None => (Decimal::ZERO, text.as_str()),
    };
    let rest = rest.trim().trim_end_matches("钟").trim_end_matches('分').trim();
    let m = if rest.is_empty() {
        Decimal::ZERO
    } else {
        rest.parse::<Decimal>().ok()?
    };
    if h.is_zero() && m.is_zero() && !text.contains("小时") {
        return None;
    }
    Some(h + m / Decimal::from(60))
}

/// Extracts the sequence key, falling back to the train number.
pub fn extract_sequence(record: &impl FieldAccessor) -> Option<String> {
    record
        .first_present(SEQUENCE_ALIASES)
        .and_then(FieldValue::as_text)
        .or_else(|| extract_train_number(record))
}

/// Extracts the train number.
pub fn extract_train_number(record: &impl FieldAccessor) -> Option<String> {
    record
        .first_present(TRAIN_NUMBER_ALIASES)
        .and_then(FieldValue::as_text)
}

/// Extracts the crew group count. Non-positive values count as absent.
pub fn extract_group_count(record: &impl FieldAccessor) -> Option<Decimal> {
    record
        .first_present(GROUP_COUNT_ALIASES)
        .and_then(FieldValue::as_decimal)
        .filter(|count| *count > Decimal::ZERO)
}

/// Extracts the train category.
pub fn extract_train_type(record: &impl FieldAccessor) -> Option<String> {
    record
        .first_present(TRAIN_TYPE_ALIASES)
        .and_then(FieldValue::as_text)
}

/// Returns true if the record is flagged international, or its category says so.
pub fn is_international(record: &impl FieldAccessor) -> bool {
    if let Some(flag) = record
        .first_present(INTERNATIONAL_ALIASES)
        .and_then(FieldValue::as_flag)
    {
        return flag;
    }
    extract_train_type(record).is_some_and(|t| t.contains("国际"))
}

fn extract_formation_detail(record: &impl FieldAccessor) -> Option<String> {
    record
        .first_present(FORMATION_DETAIL_ALIASES)
        .and_then(FieldValue::as_text)
}

/// Extracts per-type car counts.
///
/// Each car type reads its own column first and otherwise counts tokens like
/// `硬座8` in the formation detail text. Missing counts are 0.
///
/// # Examples
///
/// ```
/// use crew_staffing_engine::calculation::extract_car_counts;
/// use crew_staffing_engine::models::TrainRecord;
///
/// let record = TrainRecord::new()
///     .with("编组详情", "硬座8 硬卧2 餐车1")
///     .with("软卧", 1.0);
/// let counts = extract_car_counts(&record);
/// assert_eq!((counts.seat, counts.hard_sleeper, counts.soft_sleeper), (8, 2, 1));
/// assert_eq!((counts.dining, counts.baggage), (1, 0));
/// ```
pub fn extract_car_counts(record: &impl FieldAccessor) -> CarCounts {
    let detail = extract_formation_detail(record);
    let count = |aliases: &[&str], tokens: &[&str]| -> u32 {
        record
            .first_present(aliases)
            .and_then(FieldValue::as_decimal)
            .and_then(|d| d.trunc().to_u32())
            .or_else(|| detail.as_deref().map(|d| count_tokens(d, tokens)))
            .unwrap_or(0)
    };

    CarCounts {
        seat: count(SEAT_ALIASES, SEAT_TOKENS),
        hard_sleeper: count(HARD_SLEEPER_ALIASES, HARD_SLEEPER_TOKENS),
        soft_sleeper: count(SOFT_SLEEPER_ALIASES, SOFT_SLEEPER_TOKENS),
        dining: count(DINING_ALIASES, DINING_TOKENS),
        baggage: count(BAGGAGE_ALIASES, BAGGAGE_TOKENS),
    }
}

/// Sums the numbers that directly follow any of `labels` in `detail`.
fn count_tokens(detail: &str, labels: &[&str]) -> u32 {
    labels
        .iter()
        .flat_map(|label| {
            detail
                .match_indices(label)
                .map(move |(idx, _)| leading_number(&detail[idx + label.len()..]))
        })
        .fold(0, u32::saturating_add)
}

fn leading_number(text: &str) -> u32 {
    let rest = text.trim_start_matches(|c: char| {
        c.is_whitespace() || matches!(c, ':' | '：' | 'x' | 'X' | '×' | '*')
    });
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u32::MAX)
}

/// Extracts the number of business-class cars.
///
/// A yes/no column counts as one car; otherwise the formation detail text is
/// searched for `商务座N` tokens.
pub fn extract_business_class_count(record: &impl FieldAccessor) -> u32 {
    if let Some(value) = record.first_present(BUSINESS_CLASS_ALIASES) {
        if let Some(count) = value.as_decimal().and_then(|d| d.trunc().to_u32()) {
            return count;
        }
        if let Some(flag) = value.as_flag() {
            return u32::from(flag);
        }
    }
    extract_formation_detail(record)
        .map(|d| count_tokens(&d, BUSINESS_CLASS_TOKENS))
        .unwrap_or(0)
}

/// Returns true if the train carries at least one business-class car.
pub fn has_business_class(record: &impl FieldAccessor) -> bool {
    extract_business_class_count(record) > 0
}

/// Reads every attribute the matchers and calculators need.
pub fn extract_attributes(record: &TrainRecord) -> TrainAttributes {
    TrainAttributes {
        train_number: extract_train_number(record),
        sequence: extract_sequence(record),
        formation: extract_formation(record),
        running_time_hours: extract_running_time(record),
        train_type: extract_train_type(record),
        is_international: is_international(record),
        group_count: extract_group_count(record),
        car_counts: extract_car_counts(record),
        business_class_count: extract_business_class_count(record),
    }
}
