//! Pricing System CLI
//!
//! Worked example: builds a small mixed portfolio against an illustrative
//! mortality table and flat curve, prices it, and prints the result table.

use std::sync::Arc;

use pricing_system::{
    CashflowModel, DiscountCurve, ExpenseBasis, ExpenseLine, ExpenseTiming, MortalityTable,
    PolicyBatch, PremiumType, PricingEngine, ProductKind, Spread,
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("Pricing System v0.1.0");
    println!("=====================\n");

    // Illustrative mortality: geometric rates from age 55, terminal at 90
    let ages: Vec<u32> = (55..=90).collect();
    let mut qx: Vec<f64> = ages
        .iter()
        .map(|&age| (0.004 * 1.09f64.powi((age - 55) as i32)).min(0.5))
        .collect();
    *qx.last_mut().unwrap() = 1.0;
    let mortality = Arc::new(MortalityTable::new(ages, qx, "Illustrative 55-90")?);

    let curve = Arc::new(DiscountCurve::flat(0.035, 40, "flat 3.5%")?);

    let expense_spec = vec![
        ExpenseLine {
            product: ProductKind::Endowment,
            description: "New business admin".into(),
            basis: ExpenseBasis::PerPolicy,
            timing: ExpenseTiming::Initial,
            amount: 200.0,
        },
        ExpenseLine {
            product: ProductKind::Endowment,
            description: "Renewal admin".into(),
            basis: ExpenseBasis::PerPolicy,
            timing: ExpenseTiming::Renewal,
            amount: 40.0,
        },
        ExpenseLine {
            product: ProductKind::Endowment,
            description: "Commission".into(),
            basis: ExpenseBasis::PctPremium,
            timing: ExpenseTiming::Renewal,
            amount: 0.02,
        },
        ExpenseLine {
            product: ProductKind::TermAssurance,
            description: "New business admin".into(),
            basis: ExpenseBasis::PerPolicy,
            timing: ExpenseTiming::Initial,
            amount: 150.0,
        },
        ExpenseLine {
            product: ProductKind::TermAssurance,
            description: "Claims handling".into(),
            basis: ExpenseBasis::PerPolicy,
            timing: ExpenseTiming::Death,
            amount: 300.0,
        },
    ];

    let batch = PolicyBatch {
        policy_ids: vec![1001, 1002, 1003, 1004],
        ages: vec![58, 62, 65, 70],
        terms: vec![Some(20), Some(15), Some(10), None],
        periodic_survival_benefits: None,
        terminal_survival_benefits: Some(vec![50_000.0, 75_000.0, 0.0, 0.0]),
        death_benefits: Some(vec![50_000.0, 75_000.0, 100_000.0, 40_000.0]),
        annual_premiums: None,
        premium_types: vec![
            PremiumType::Regular,
            PremiumType::Regular,
            PremiumType::Regular,
            PremiumType::Single,
        ],
        product_kinds: vec![
            ProductKind::Endowment,
            ProductKind::Endowment,
            ProductKind::TermAssurance,
            ProductKind::WholeOfLifeAssurance,
        ],
    };
    batch.validate()?;

    let engine = PricingEngine::new(
        Arc::clone(&mortality),
        Arc::clone(&curve),
        expense_spec,
        0.03,
    );

    let benefit_pvs = engine.benefit_present_values(&batch)?;
    let annuities = engine.premium_annuity_factors(&batch)?;
    let prices = engine.price_policy_batch(&batch)?;

    println!(
        "{:>8} {:>5} {:>5} {:>26} {:>8} {:>14} {:>10} {:>12}",
        "Policy", "Age", "Term", "Product", "Premium", "Benefit PV", "Annuity", "Price"
    );
    println!("{}", "-".repeat(96));
    for (i, price) in prices.iter().enumerate() {
        println!(
            "{:>8} {:>5} {:>5} {:>26} {:>8} {:>14.2} {:>10.4} {:>12.2}",
            price.policy_id,
            batch.ages[i],
            batch.terms[i]
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".into()),
            batch.product_kinds[i].as_str(),
            batch.premium_types[i].as_str(),
            benefit_pvs[i],
            annuities[i],
            price.premium,
        );
    }

    // Equilibrium check: replaying the solved premiums through the expense
    // engine reproduces the benefit side exactly.
    let premiums: Vec<f64> = prices.iter().map(|p| p.premium).collect();
    let expense_pvs = engine.expenses().present_value(&batch, Some(&premiums))?;
    let max_residual = (0..batch.len())
        .map(|i| (benefit_pvs[i] + expense_pvs[i] - premiums[i] * annuities[i]).abs())
        .fold(0.0f64, f64::max);
    println!("\nMax equilibrium residual: {:.3e}", max_residual);

    // Aggregate expense cashflows for the block
    let columns = engine.expenses().project_cashflows(&batch)?;
    println!("\nExpense cashflow columns:");
    for column in &columns {
        let total: f64 = column.flows.iter().sum();
        println!(
            "  {:>26}  {:<28} total {:>10.2}",
            column.product.as_str(),
            column.label,
            total
        );
    }

    // A guaranteed bond position priced off the same curve, for comparison
    let bond = pricing_system::GuaranteedCashflow::new(
        Arc::clone(&curve),
        &[100_000.0],
        &[0.04],
        &[10],
    )?;
    println!(
        "\n10y 4% bond PV on the same curve: {:.2}",
        bond.aggregate_present_value(&Spread::zero())?
    );

    Ok(())
}
