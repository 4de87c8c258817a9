//! Car-type ratio allocation for conventional trains.
//!
//! A ratio such as `"1人2车"` (one person per two cars) staffs a car type with
//! `max(ceil(cars * persons / cars_per_group), min_staff)`. Ratios that cannot
//! be read fall back to `min_staff`.

use rust_decimal::Decimal;
use tracing::warn;

use crate::config::CarRatio;

/// The staff allocated to one car type and how it was derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatioAllocation {
    /// Staff per crew group.
    pub staff: Decimal,
    /// Whether the ratio text was readable.
    pub parsed: bool,
    /// Explanation, e.g. `"8 cars x 1/2 = 4"`.
    pub reasoning: String,
}

/// Parses a ratio into `(persons, cars)`.
///
/// The first two unsigned integers in the text are taken in order, so
/// `"1人2车"`, `"1 person per 2 cars"`, `"1 per 2"` and `"1:2"` all read as
/// `(1, 2)`. Text with fewer or more than two numbers, or a zero in either
/// position, is rejected.
///
/// # Examples
///
/// ```
/// use crew_staffing_engine::calculation::parse_ratio;
///
/// assert_eq!(parse_ratio("2人3车"), Some((2, 3)));
/// assert_eq!(parse_ratio("3 per 2"), Some((3, 2)));
/// assert_eq!(parse_ratio("one per car"), None);
/// ```
pub fn parse_ratio(text: &str) -> Option<(u32, u32)> {
    let numbers: Vec<u32> = text
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;

    match numbers.as_slice() {
        [persons, cars] if *persons > 0 && *cars > 0 => Some((*persons, *cars)),
        _ => None,
    }
}

/// Allocates staff for `car_count` cars under one ratio.
///
/// # Examples
///
/// ```
/// use crew_staffing_engine::calculation::allocate_by_ratio;
/// use crew_staffing_engine::config::CarRatio;
/// use crew_staffing_engine::models::CarType;
/// use rust_decimal::Decimal;
///
/// let ratio = CarRatio {
///     car_type: CarType::Seat,
///     ratio: "1人2车".to_string(),
///     min_staff: 1,
/// };
/// assert_eq!(allocate_by_ratio(7, &ratio).staff, Decimal::from(4));
/// assert_eq!(allocate_by_ratio(0, &ratio).staff, Decimal::from(1));
/// ```
pub fn allocate_by_ratio(car_count: u32, ratio: &CarRatio) -> RatioAllocation {
    let min_staff = Decimal::from(ratio.min_staff);

    let Some((persons, cars)) = parse_ratio(&ratio.ratio) else {
        warn!(
            ratio = %ratio.ratio,
            car_type = ?ratio.car_type,
            min_staff = ratio.min_staff,
            "Unreadable car ratio, falling back to minimum staff"
        );
        return RatioAllocation {
            staff: min_staff,
            parsed: false,
            reasoning: format!(
                "ratio '{}' not readable, using minimum {}",
                ratio.ratio, ratio.min_staff
            ),
        };
    };

    let raw = (Decimal::from(car_count) * Decimal::from(persons) / Decimal::from(cars)).ceil();
    let staff = raw.max(min_staff);
    let reasoning = if staff > raw {
        format!(
            "{} cars x {}/{} = {} (minimum {})",
            car_count, persons, cars, raw, ratio.min_staff
        )
    } else {
        format!("{} cars x {}/{} = {}", car_count, persons, cars, staff)
    };

    RatioAllocation {
        staff,
        parsed: true,
        reasoning,
    }
}
