//! A single vessel arrival window and the blocks it carries.

use chrono::NaiveDate;

use super::types::BlockId;

pub type VoyageId = String;

#[derive(Debug, Clone)]
pub struct Voyage {
    pub voyage_id: VoyageId,
    pub vessel_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub blocks: Vec<BlockId>,
}

impl Voyage {
    pub fn new(vessel_name: &str, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            voyage_id: voyage_id(vessel_name, start_date, end_date),
            vessel_name: vessel_name.to_string(),
            start_date,
            end_date,
            blocks: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// `{vessel_name}_{start_date_iso}_{end_date_iso}`.
pub fn voyage_id(vessel_name: &str, start_date: NaiveDate, end_date: NaiveDate) -> VoyageId {
    format!("{vessel_name}_{start_date}_{end_date}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voyage_id_follows_the_grammar() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        assert_eq!(voyage_id("vessel-1", start, end), "vessel-1_2024-06-01_2024-06-14");
    }

    #[test]
    fn new_voyage_starts_empty() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let v = Voyage::new("vessel-1", start, end);
        assert!(v.is_empty());
    }
}
