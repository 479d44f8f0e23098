//! CSV-based policy batch loader
//!
//! Expected header:
//! `policy_id,age,term,product,premium_type,periodic_survival_benefit,terminal_survival_benefit,death_benefit,annual_premium`
//!
//! `term` may be blank for open-ended policies. Benefit columns may be blank
//! where a product does not use them; a column that is blank on every row is
//! dropped from the batch entirely.

use std::error::Error;
use std::fs::File;
use std::path::Path;

use super::batch::{PolicyBatch, PremiumType};
use crate::products::ProductKind;

/// Load a policy batch from a CSV file.
pub fn load_policy_batch(path: &Path) -> Result<PolicyBatch, Box<dyn Error>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);

    let headers = reader.headers()?.clone();
    let column = |name: &str| -> Result<usize, Box<dyn Error>> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| format!("missing column '{}' in {}", name, path.display()).into())
    };

    let id_col = column("policy_id")?;
    let age_col = column("age")?;
    let term_col = column("term")?;
    let product_col = column("product")?;
    let premium_type_col = column("premium_type")?;
    let periodic_col = headers.iter().position(|h| h == "periodic_survival_benefit");
    let terminal_col = headers.iter().position(|h| h == "terminal_survival_benefit");
    let death_col = headers.iter().position(|h| h == "death_benefit");
    let premium_col = headers.iter().position(|h| h == "annual_premium");

    let mut batch = PolicyBatch {
        periodic_survival_benefits: periodic_col.map(|_| Vec::new()),
        terminal_survival_benefits: terminal_col.map(|_| Vec::new()),
        death_benefits: death_col.map(|_| Vec::new()),
        annual_premiums: premium_col.map(|_| Vec::new()),
        ..PolicyBatch::default()
    };

    let parse_amount = |record: &csv::StringRecord, col: usize| -> Result<f64, Box<dyn Error>> {
        let field = record[col].trim();
        if field.is_empty() {
            Ok(0.0)
        } else {
            Ok(field.parse()?)
        }
    };

    for result in reader.records() {
        let record = result?;

        batch.policy_ids.push(record[id_col].parse()?);
        batch.ages.push(record[age_col].parse()?);

        let term = record[term_col].trim();
        batch
            .terms
            .push(if term.is_empty() { None } else { Some(term.parse()?) });

        batch
            .product_kinds
            .push(record[product_col].parse::<ProductKind>()?);
        batch
            .premium_types
            .push(record[premium_type_col].parse::<PremiumType>()?);

        if let (Some(col), Some(values)) = (periodic_col, batch.periodic_survival_benefits.as_mut())
        {
            values.push(parse_amount(&record, col)?);
        }
        if let (Some(col), Some(values)) = (terminal_col, batch.terminal_survival_benefits.as_mut())
        {
            values.push(parse_amount(&record, col)?);
        }
        if let (Some(col), Some(values)) = (death_col, batch.death_benefits.as_mut()) {
            values.push(parse_amount(&record, col)?);
        }
        if let (Some(col), Some(values)) = (premium_col, batch.annual_premiums.as_mut()) {
            values.push(parse_amount(&record, col)?);
        }
    }

    batch.validate()?;
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_policy_batch() {
        let dir = std::env::temp_dir();
        let path = dir.join("pricing_system_test_policies.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(
            file,
            "policy_id,age,term,product,premium_type,periodic_survival_benefit,terminal_survival_benefit,death_benefit,annual_premium"
        )
        .unwrap();
        writeln!(file, "1,34,10,Term Assurance,Regular,,,50000,").unwrap();
        writeln!(file, "2,73,,Whole-of-Life Assurance,Single,,,25000,").unwrap();
        writeln!(file, "3,60,5,Annuity,Single,1200,,,").unwrap();
        drop(file);

        let batch = load_policy_batch(&path).unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.terms, vec![Some(10), None, Some(5)]);
        assert_eq!(batch.death_benefits().unwrap()[1], 25_000.0);
        assert_eq!(batch.periodic_survival_benefits().unwrap()[2], 1200.0);
        assert_eq!(batch.premium_types[1], PremiumType::Single);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_unknown_product_is_configuration_error() {
        let dir = std::env::temp_dir();
        let path = dir.join("pricing_system_test_bad_policies.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(
            file,
            "policy_id,age,term,product,premium_type,death_benefit"
        )
        .unwrap();
        writeln!(file, "1,34,10,Variable Annuity,Regular,50000").unwrap();
        drop(file);

        assert!(load_policy_batch(&path).is_err());
        std::fs::remove_file(&path).ok();
    }
}
