//! Load purchase history from tab-separated text
//!
//! Expected layout, no header row:
//! `customer_id<TAB>purchase_amount<TAB>date_of_purchase` with ISO dates.

use super::Purchase;
use crate::error::{ClvError, ClvResult};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::path::Path;

/// Default purchase file name
pub const DEFAULT_PURCHASES_PATH: &str = "purchases.txt";

/// Date layout of the third column
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw row matching the purchase file columns
#[derive(Debug, serde::Deserialize)]
struct RawRow {
    customer_id: u64,
    purchase_amount: f64,
    date_of_purchase: String,
}

impl RawRow {
    fn to_purchase(self, line: u64) -> ClvResult<Purchase> {
        let date = NaiveDate::parse_from_str(self.date_of_purchase.trim(), DATE_FORMAT).map_err(|e| {
            ClvError::InvalidInput(format!(
                "line {}: bad purchase date '{}': {}",
                line, self.date_of_purchase, e
            ))
        })?;

        if !self.purchase_amount.is_finite() {
            return Err(ClvError::InvalidInput(format!(
                "line {}: purchase amount is not a number",
                line
            )));
        }

        Ok(Purchase {
            customer_id: self.customer_id,
            amount: self.purchase_amount,
            date,
        })
    }
}

/// Load all purchases from a file
pub fn load_purchases<P: AsRef<Path>>(path: P) -> ClvResult<Vec<Purchase>> {
    let file = std::fs::File::open(path)?;
    load_purchases_from_reader(file)
}

/// Load purchases from any reader (e.g., string buffer, network stream)
pub fn load_purchases_from_reader<R: std::io::Read>(reader: R) -> ClvResult<Vec<Purchase>> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut purchases = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let row: RawRow = record.deserialize(None)?;
        purchases.push(row.to_purchase(line)?);
    }

    log::debug!("Loaded {} purchases", purchases.len());
    Ok(purchases)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_reader() {
        let text = "860\t50\t2009-09-22\n860\t50.5\t2012-04-13\n1200\t100\t2015-12-30\n";
        let purchases = load_purchases_from_reader(text.as_bytes()).unwrap();

        assert_eq!(purchases.len(), 3);
        assert_eq!(purchases[0].customer_id, 860);
        assert_eq!(purchases[1].amount, 50.5);
        assert_eq!(purchases[2].date, NaiveDate::from_ymd_opt(2015, 12, 30).unwrap());
    }

    #[test]
    fn test_bad_date_names_line() {
        let text = "1\t10\t2015-01-01\n2\t10\t2015-13-01\n";
        match load_purchases_from_reader(text.as_bytes()) {
            Err(ClvError::InvalidInput(msg)) => assert!(msg.contains("line 2"), "{}", msg),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_amount_is_csv_error() {
        let text = "1\tabc\t2015-01-01\n";
        assert!(matches!(load_purchases_from_reader(text.as_bytes()), Err(ClvError::Csv(_))));
    }
}
