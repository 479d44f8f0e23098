//! CSV-based assumption loaders
//!
//! Mortality tables are `age,qx` rows; curves are `year,rate` rows; the
//! expense spec is `Product,Description,Basis,Type,Amount` rows. Validation
//! happens in the value-object constructors, not here.

use std::error::Error;
use std::fs::File;
use std::path::Path;

use crate::assumptions::{DiscountCurve, MortalityTable};
use crate::expenses::ExpenseLine;

/// Load a mortality table from CSV (`age,qx`)
pub fn load_mortality_table(path: &Path, name: &str) -> Result<MortalityTable, Box<dyn Error>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);

    let mut ages = Vec::new();
    let mut qx = Vec::new();
    for result in reader.records() {
        let record = result?;
        ages.push(record[0].trim().parse()?);
        qx.push(record[1].trim().parse()?);
    }

    Ok(MortalityTable::new(ages, qx, name)?)
}

/// Load a discount curve from CSV (`year,rate`)
pub fn load_discount_curve(path: &Path, name: &str) -> Result<DiscountCurve, Box<dyn Error>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);

    let mut times = Vec::new();
    let mut rates = Vec::new();
    for result in reader.records() {
        let record = result?;
        times.push(record[0].trim().parse()?);
        rates.push(record[1].trim().parse()?);
    }

    Ok(DiscountCurve::new(times, rates, name)?)
}

/// Load an expense specification from CSV
/// (`Product,Description,Basis,Type,Amount`)
pub fn load_expense_spec(path: &Path) -> Result<Vec<ExpenseLine>, Box<dyn Error>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);

    let mut lines = Vec::new();
    for result in reader.records() {
        let record = result?;
        lines.push(ExpenseLine {
            product: record[0].trim().parse()?,
            description: record[1].trim().to_string(),
            basis: record[2].trim().parse()?,
            timing: record[3].trim().parse()?,
            amount: record[4].trim().parse()?,
        });
    }

    Ok(lines)
}
