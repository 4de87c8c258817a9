//! Sequence deduplication.
//!
//! Imported schedules often carry several rows for one physical working (a
//! header row plus detail rows sharing a sequence number). Rows are grouped by
//! their sequence key and the first row of each group represents the working.

use std::collections::HashMap;

use crate::models::TrainRecord;

use super::field_extractor::extract_sequence;

/// One physical working and the record chosen to represent it.
#[derive(Debug, Clone, PartialEq)]
pub struct Working<'a> {
    /// Sequence key shared by every row of the working.
    pub key: String,
    /// The first row encountered with this key.
    pub representative: &'a TrainRecord,
    /// Number of input rows carrying this key.
    pub row_count: usize,
}

/// Groups records by sequence key, keeping first-encounter order.
///
/// A record with neither a sequence number nor a train number forms its own
/// group under the key `#row-<index>`.
///
/// # Examples
///
/// ```
/// use crew_staffing_engine::calculation::deduplicate_by_sequence;
/// use crew_staffing_engine::models::TrainRecord;
///
/// let records = vec![
///     TrainRecord::new().with("序号", 1).with("车次", "G1"),
///     TrainRecord::new().with("序号", 1).with("车次", "G2"),
///     TrainRecord::new().with("序号", 2).with("车次", "G3"),
/// ];
/// let workings = deduplicate_by_sequence(&records);
///
/// assert_eq!(workings.len(), 2);
/// assert_eq!(workings[0].row_count, 2);
/// ```
pub fn deduplicate_by_sequence(records: &[TrainRecord]) -> Vec<Working<'_>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut workings: Vec<Working<'_>> = Vec::new();

    for (row, record) in records.iter().enumerate() {
        let key = extract_sequence(record).unwrap_or_else(|| format!("#row-{}", row));
        match index.get(&key) {
            Some(&position) => workings[position].row_count += 1,
            None => {
                index.insert(key.clone(), workings.len());
                workings.push(Working {
                    key,
                    representative: record,
                    row_count: 1,
                });
            }
        }
    }

    workings
}
