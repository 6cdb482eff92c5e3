//! Flow catalog — the static description of every calculator variant.
//!
//! Variants are data, not control flow: each declares its ordered
//! field-collection steps (after the shared calendar-system and year steps,
//! which the orchestrator owns) plus a mapping from collected fields to the
//! computation request body.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The mutually exclusive calculator types, plus the nisab inquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowVariant {
    /// Income, gross method: 2.5% of gross annual income.
    IncomeGross,
    /// Income, net method: gross minus basic expenses.
    IncomeNet,
    Savings,
    RiceHarvest,
    Equities,
    Silver,
    ProvidentFund,
    /// Two-step inquiry: computes immediately after the year choice.
    NisabInquiry,
}

impl FlowVariant {
    pub const ALL: [FlowVariant; 8] = [
        Self::IncomeGross,
        Self::IncomeNet,
        Self::Savings,
        Self::RiceHarvest,
        Self::Equities,
        Self::Silver,
        Self::ProvidentFund,
        Self::NisabInquiry,
    ];

    /// Canonical obligation label used by the computation and persistence
    /// services. Both income methods share a label.
    pub fn obligation_label(&self) -> &'static str {
        match self {
            Self::IncomeGross | Self::IncomeNet => "pendapatan",
            Self::Savings => "simpanan",
            Self::RiceHarvest => "padi",
            Self::Equities => "saham",
            Self::Silver => "perak",
            Self::ProvidentFund => "kwsp",
            Self::NisabInquiry => "nisab",
        }
    }

    /// Stable value carried by the menu choice for this variant.
    pub fn menu_value(&self) -> &'static str {
        match self {
            Self::IncomeGross => "pendapatan_kasar",
            Self::IncomeNet => "pendapatan_bersih",
            Self::Savings => "simpanan",
            Self::RiceHarvest => "padi",
            Self::Equities => "saham",
            Self::Silver => "perak",
            Self::ProvidentFund => "kwsp",
            Self::NisabInquiry => "nisab",
        }
    }

    /// Menu entry text.
    pub fn menu_label(&self) -> &'static str {
        match self {
            Self::IncomeGross => "Zakat Pendapatan (kaedah kasar)",
            Self::IncomeNet => "Zakat Pendapatan (kaedah bersih)",
            Self::Savings => "Zakat Simpanan",
            Self::RiceHarvest => "Zakat Padi",
            Self::Equities => "Zakat Saham",
            Self::Silver => "Zakat Perak",
            Self::ProvidentFund => "Zakat KWSP",
            Self::NisabInquiry => "Semak Nisab Semasa",
        }
    }

    pub fn from_menu_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.menu_value() == value)
    }

    /// Ordered field-collection steps after the shared year prefix.
    /// Empty for the nisab inquiry.
    pub fn steps(&self) -> &'static [FieldStep] {
        match self {
            Self::IncomeGross => INCOME_GROSS_STEPS,
            Self::IncomeNet => INCOME_NET_STEPS,
            Self::Savings => SAVINGS_STEPS,
            Self::RiceHarvest => RICE_HARVEST_STEPS,
            Self::Equities => EQUITIES_STEPS,
            Self::Silver => SILVER_STEPS,
            Self::ProvidentFund => PROVIDENT_FUND_STEPS,
            Self::NisabInquiry => &[],
        }
    }
}

impl std::fmt::Display for FlowVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::IncomeGross => "income_gross",
            Self::IncomeNet => "income_net",
            Self::Savings => "savings",
            Self::RiceHarvest => "rice_harvest",
            Self::Equities => "equities",
            Self::Silver => "silver",
            Self::ProvidentFund => "provident_fund",
            Self::NisabInquiry => "nisab_inquiry",
        };
        write!(f, "{s}")
    }
}

/// A variant-specific field collected as free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    GrossAmount,
    AnnualAmount,
    BasicExpenses,
    SavingsAmount,
    HarvestValue,
    PortfolioValue,
    OutstandingDebt,
    WeightGrams,
    PricePerGram,
    Account1Amount,
    Account2Amount,
    WithdrawalAmount,
}

/// Which validation rule a field uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Required currency amount.
    Amount,
    /// Optional currency amount; blank input yields zero.
    AmountOrZero,
}

/// One field-collection step: the field, its rule, and its prompt text.
///
/// Prompt text is opaque to the orchestrator; only the presentation layer
/// renders it.
#[derive(Debug, Clone, Copy)]
pub struct FieldStep {
    pub field: FieldName,
    pub rule: FieldRule,
    pub prompt: &'static str,
}

const INCOME_GROSS_STEPS: &[FieldStep] = &[FieldStep {
    field: FieldName::GrossAmount,
    rule: FieldRule::Amount,
    prompt: "Masukkan jumlah pendapatan kasar tahunan anda (RM):",
}];

const INCOME_NET_STEPS: &[FieldStep] = &[
    FieldStep {
        field: FieldName::AnnualAmount,
        rule: FieldRule::Amount,
        prompt: "Masukkan jumlah pendapatan tahunan anda (RM):",
    },
    FieldStep {
        field: FieldName::BasicExpenses,
        rule: FieldRule::Amount,
        prompt: "Masukkan jumlah perbelanjaan asas tahunan anda (RM):",
    },
];

const SAVINGS_STEPS: &[FieldStep] = &[FieldStep {
    field: FieldName::SavingsAmount,
    rule: FieldRule::Amount,
    prompt: "Masukkan baki simpanan terendah anda dalam setahun (RM):",
}];

const RICE_HARVEST_STEPS: &[FieldStep] = &[FieldStep {
    field: FieldName::HarvestValue,
    rule: FieldRule::Amount,
    prompt: "Masukkan nilai hasil padi anda semusim (RM):",
}];

const EQUITIES_STEPS: &[FieldStep] = &[
    FieldStep {
        field: FieldName::PortfolioValue,
        rule: FieldRule::Amount,
        prompt: "Masukkan nilai semasa portfolio saham anda (RM):",
    },
    FieldStep {
        field: FieldName::OutstandingDebt,
        rule: FieldRule::AmountOrZero,
        prompt: "Masukkan baki hutang pembiayaan saham, jika ada (RM, kosongkan jika tiada):",
    },
];

const SILVER_STEPS: &[FieldStep] = &[
    FieldStep {
        field: FieldName::WeightGrams,
        rule: FieldRule::Amount,
        prompt: "Masukkan berat perak yang dimiliki (gram):",
    },
    FieldStep {
        field: FieldName::PricePerGram,
        rule: FieldRule::Amount,
        prompt: "Masukkan harga semasa perak segram (RM):",
    },
];

const PROVIDENT_FUND_STEPS: &[FieldStep] = &[
    FieldStep {
        field: FieldName::Account1Amount,
        rule: FieldRule::Amount,
        prompt: "Masukkan baki Akaun 1 KWSP anda (RM):",
    },
    FieldStep {
        field: FieldName::Account2Amount,
        rule: FieldRule::Amount,
        prompt: "Masukkan baki Akaun 2 KWSP anda (RM):",
    },
    FieldStep {
        field: FieldName::WithdrawalAmount,
        rule: FieldRule::AmountOrZero,
        prompt: "Masukkan jumlah pengeluaran KWSP tahun ini, jika ada (RM, kosongkan jika tiada):",
    },
];

/// Variant-specific computation request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ZakatQuery {
    Pendapatan { amount: Decimal, expenses: Decimal },
    Simpanan { amount: Decimal },
    Padi { amount: Decimal },
    Saham { amount: Decimal, debt: Decimal },
    Perak { weight_grams: Decimal, price_per_gram: Decimal },
    Kwsp { account1: Decimal, account2: Decimal, withdrawal: Decimal },
    #[serde(rename = "nisab")]
    NisabInfo,
}

/// Map a variant's collected fields into the computation request body.
///
/// Returns `None` when a declared field is missing — the step walk guarantees
/// completeness, so a `None` here is a programming error logged upstream.
pub fn assemble_query(
    variant: FlowVariant,
    fields: &BTreeMap<FieldName, Decimal>,
) -> Option<ZakatQuery> {
    let get = |name: FieldName| fields.get(&name).copied();
    let query = match variant {
        FlowVariant::IncomeGross => ZakatQuery::Pendapatan {
            amount: get(FieldName::GrossAmount)?,
            expenses: Decimal::ZERO,
        },
        FlowVariant::IncomeNet => ZakatQuery::Pendapatan {
            amount: get(FieldName::AnnualAmount)?,
            expenses: get(FieldName::BasicExpenses)?,
        },
        FlowVariant::Savings => ZakatQuery::Simpanan {
            amount: get(FieldName::SavingsAmount)?,
        },
        FlowVariant::RiceHarvest => ZakatQuery::Padi {
            amount: get(FieldName::HarvestValue)?,
        },
        FlowVariant::Equities => ZakatQuery::Saham {
            amount: get(FieldName::PortfolioValue)?,
            debt: get(FieldName::OutstandingDebt)?,
        },
        FlowVariant::Silver => ZakatQuery::Perak {
            weight_grams: get(FieldName::WeightGrams)?,
            price_per_gram: get(FieldName::PricePerGram)?,
        },
        FlowVariant::ProvidentFund => ZakatQuery::Kwsp {
            account1: get(FieldName::Account1Amount)?,
            account2: get(FieldName::Account2Amount)?,
            withdrawal: get(FieldName::WithdrawalAmount)?,
        },
        FlowVariant::NisabInquiry => ZakatQuery::NisabInfo,
    };
    Some(query)
}
