//! Shipped registry factories. Each returns a static schema; the loader
//! validates it before the engine ever sees it.

use std::collections::BTreeSet;

use decisiongraph_core::payload::{Disposition, DispositionBasis, Reporting};

use crate::domain::{
    ComparisonFn, DomainRegistry, FieldDef, FieldTier, FieldType, Gate, OutcomeMappings,
};

/// Transaction-monitoring dispositions in a Canadian retail bank: customer
/// and channel structure gates, structuring/jurisdiction drivers, STR/LCTR
/// reporting vocabulary.
pub fn banking_aml() -> DomainRegistry {
    let mut fields = std::collections::BTreeMap::new();

    fields.insert(
        "customer_type".to_string(),
        FieldDef::new(
            FieldType::Categorical,
            ComparisonFn::EquivalenceClass,
            0.9,
            FieldTier::Structural,
        )
        .required()
        .classes(&[
            ("individual", &["individual", "sole_proprietor"]),
            ("entity", &["corporation", "partnership", "trust"]),
            ("msb", &["msb", "currency_exchange", "payment_processor"]),
        ]),
    );
    fields.insert(
        "product_channel".to_string(),
        FieldDef::new(
            FieldType::Categorical,
            ComparisonFn::EquivalenceClass,
            0.8,
            FieldTier::Structural,
        )
        .required()
        .classes(&[
            ("cash_intensive", &["cash_deposit", "night_deposit", "atm_cash"]),
            ("wire", &["domestic_wire", "international_wire"]),
            ("emerging", &["crypto_onramp", "prepaid_card"]),
        ]),
    );
    fields.insert(
        "jurisdiction_risk".to_string(),
        FieldDef::new(FieldType::Ordinal, ComparisonFn::Step, 0.8, FieldTier::Behavioral)
            .critical()
            .ordered(&["low", "medium", "high", "prohibited"]),
    );
    fields.insert(
        "transaction_band".to_string(),
        FieldDef::new(FieldType::Ordinal, ComparisonFn::Step, 0.7, FieldTier::Behavioral)
            .required()
            .ordered(&["under_10k", "band_10k_50k", "band_50k_250k", "over_250k"]),
    );
    fields.insert(
        "structuring_indicator".to_string(),
        FieldDef::new(FieldType::Boolean, ComparisonFn::Exact, 0.9, FieldTier::Behavioral)
            .critical(),
    );
    fields.insert(
        "pep_exposure".to_string(),
        FieldDef::new(FieldType::Boolean, ComparisonFn::Exact, 0.85, FieldTier::Behavioral),
    );
    fields.insert(
        "typology_markers".to_string(),
        FieldDef::new(FieldType::Set, ComparisonFn::Jaccard, 0.75, FieldTier::Behavioral),
    );
    fields.insert(
        "prior_strs_filed".to_string(),
        FieldDef::new(
            FieldType::Numeric,
            ComparisonFn::DistanceDecay,
            0.6,
            FieldTier::Behavioral,
        )
        .max_distance(10),
    );
    fields.insert(
        "account_tenure_months".to_string(),
        FieldDef::new(
            FieldType::Numeric,
            ComparisonFn::DistanceDecay,
            0.3,
            FieldTier::Contextual,
        )
        .max_distance(120),
    );
    fields.insert(
        "source_of_funds_verified".to_string(),
        FieldDef::new(FieldType::Boolean, ComparisonFn::Exact, 0.5, FieldTier::Contextual),
    );

    let mut outcomes = OutcomeMappings::default();
    for (raw, canonical) in [
        ("blocked", Disposition::Block),
        ("exited", Disposition::Block),
        ("declined", Disposition::Block),
        ("cleared", Disposition::Allow),
        ("approved", Disposition::Allow),
        ("edd", Disposition::Edd),
        ("enhanced_due_diligence", Disposition::Edd),
    ] {
        outcomes.disposition.insert(raw.to_string(), canonical);
    }
    for (raw, canonical) in [
        ("regulatory_mandate", DispositionBasis::Mandatory),
        ("sanctions_hit", DispositionBasis::Mandatory),
        ("risk_appetite", DispositionBasis::Discretionary),
        ("manual_review", DispositionBasis::Discretionary),
    ] {
        outcomes.basis.insert(raw.to_string(), canonical);
    }
    for (raw, canonical) in [
        ("str", Reporting::FileStr),
        ("lctr", Reporting::FileLctr),
        ("tpr", Reporting::FileTpr),
        ("none", Reporting::NoReport),
    ] {
        outcomes.reporting.insert(raw.to_string(), canonical);
    }

    DomainRegistry {
        id: "banking_aml".to_string(),
        critical_fields: fields
            .iter()
            .filter(|(_, d)| d.critical)
            .map(|(name, _)| name.clone())
            .collect::<BTreeSet<_>>(),
        fields,
        comparability_gates: vec![
            Gate { field: "customer_type".to_string() },
            Gate { field: "product_channel".to_string() },
        ],
        similarity_floor: 0.35,
        similarity_floor_overrides: [("trade_finance".to_string(), 0.50)]
            .into_iter()
            .collect(),
        pool_minimum: 5,
        outcomes,
    }
}

/// Claims adjudication in property & casualty insurance: line-of-business
/// structure gates, fraud-indicator drivers, tribunal reporting vocabulary.
pub fn insurance_claims() -> DomainRegistry {
    let mut fields = std::collections::BTreeMap::new();

    fields.insert(
        "policy_line".to_string(),
        FieldDef::new(
            FieldType::Categorical,
            ComparisonFn::EquivalenceClass,
            0.9,
            FieldTier::Structural,
        )
        .required()
        .classes(&[
            ("auto", &["auto_personal", "auto_commercial"]),
            ("property", &["homeowner", "condo", "rental"]),
            ("liability", &["general_liability", "professional_liability"]),
        ]),
    );
    fields.insert(
        "claim_type".to_string(),
        FieldDef::new(
            FieldType::Categorical,
            ComparisonFn::EquivalenceClass,
            0.85,
            FieldTier::Structural,
        )
        .required()
        .classes(&[
            ("collision", &["collision", "single_vehicle"]),
            ("theft", &["theft", "vandalism"]),
            ("injury", &["bodily_injury", "soft_tissue"]),
            ("weather", &["hail", "flood", "wind"]),
        ]),
    );
    fields.insert(
        "fraud_indicator_count".to_string(),
        FieldDef::new(
            FieldType::Numeric,
            ComparisonFn::DistanceDecay,
            0.9,
            FieldTier::Behavioral,
        )
        .critical()
        .max_distance(8),
    );
    fields.insert(
        "late_reporting".to_string(),
        FieldDef::new(FieldType::Boolean, ComparisonFn::Exact, 0.7, FieldTier::Behavioral),
    );
    fields.insert(
        "severity_band".to_string(),
        FieldDef::new(FieldType::Ordinal, ComparisonFn::Step, 0.75, FieldTier::Behavioral)
            .required()
            .ordered(&["minor", "moderate", "severe", "total_loss"]),
    );
    fields.insert(
        "injury_claimed".to_string(),
        FieldDef::new(FieldType::Boolean, ComparisonFn::Exact, 0.8, FieldTier::Behavioral),
    );
    fields.insert(
        "prior_claims_count".to_string(),
        FieldDef::new(
            FieldType::Numeric,
            ComparisonFn::DistanceDecay,
            0.6,
            FieldTier::Contextual,
        )
        .max_distance(12),
    );
    fields.insert(
        "representation".to_string(),
        FieldDef::new(FieldType::Boolean, ComparisonFn::Exact, 0.4, FieldTier::Contextual),
    );

    let mut outcomes = OutcomeMappings::default();
    for (raw, canonical) in [
        ("denied", Disposition::Block),
        ("voided", Disposition::Block),
        ("paid", Disposition::Allow),
        ("settled", Disposition::Allow),
        ("siu_referral", Disposition::Edd),
        ("investigation", Disposition::Edd),
    ] {
        outcomes.disposition.insert(raw.to_string(), canonical);
    }
    for (raw, canonical) in [
        ("statutory_exclusion", DispositionBasis::Mandatory),
        ("policy_exclusion", DispositionBasis::Mandatory),
        ("adjuster_discretion", DispositionBasis::Discretionary),
        ("settlement_strategy", DispositionBasis::Discretionary),
    ] {
        outcomes.basis.insert(raw.to_string(), canonical);
    }
    for (raw, canonical) in [
        ("tribunal_report", Reporting::FileTpr),
        ("none", Reporting::NoReport),
    ] {
        outcomes.reporting.insert(raw.to_string(), canonical);
    }

    DomainRegistry {
        id: "insurance_claims".to_string(),
        critical_fields: fields
            .iter()
            .filter(|(_, d)| d.critical)
            .map(|(name, _)| name.clone())
            .collect::<BTreeSet<_>>(),
        fields,
        comparability_gates: vec![
            Gate { field: "policy_line".to_string() },
            Gate { field: "claim_type".to_string() },
        ],
        similarity_floor: 0.40,
        similarity_floor_overrides: [("staged_collision".to_string(), 0.55)]
            .into_iter()
            .collect(),
        pool_minimum: 3,
        outcomes,
    }
}
