use serde::Serialize;
use thiserror::Error;

pub const LAKH: f64 = 100_000.0;
pub const CRORE: f64 = 10_000_000.0;
pub const RULE_COUNT: usize = 9;

/// Largest multiple of annual CTC any rule bound reaches (term-life cover).
pub(crate) const MAX_ANNUAL_CTC_MULTIPLE: f64 = 15.0;

pub type Result<T> = std::result::Result<T, PlanError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("invalid input: {field} {reason}")]
    InvalidInput { field: &'static str, reason: String },
}

impl PlanError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        PlanError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

/// Annual CTC in lakhs plus the share of monthly take-home the user saves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialInputs {
    ctc: f64,
    savings_rate_percent: f64,
}

impl FinancialInputs {
    pub fn new(ctc: f64, savings_rate_percent: f64) -> Result<Self> {
        if !ctc.is_finite() || ctc < 0.0 {
            return Err(PlanError::invalid("ctc", format!("must be >= 0, got {ctc}")));
        }
        if !(ctc * LAKH * MAX_ANNUAL_CTC_MULTIPLE).is_finite() {
            return Err(PlanError::invalid("ctc", format!("is too large, got {ctc}")));
        }
        if !savings_rate_percent.is_finite() || !(0.0..=100.0).contains(&savings_rate_percent) {
            return Err(PlanError::invalid(
                "savingsRate",
                format!("must be between 0 and 100, got {savings_rate_percent}"),
            ));
        }
        Ok(Self {
            ctc,
            savings_rate_percent,
        })
    }

    pub fn ctc(&self) -> f64 {
        self.ctc
    }

    pub fn savings_rate_percent(&self) -> f64 {
        self.savings_rate_percent
    }

    /// CTC expressed in rupees.
    pub fn annual_ctc(&self) -> f64 {
        self.ctc * LAKH
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedCashflow {
    pub monthly_take_home: f64,
    pub monthly_savings: f64,
    pub monthly_expenses: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    EmergencyFund,
    HealthInsurance,
    LifeInsurance,
    CarBudget,
    HomePurchase,
    UnsecuredDebt,
    EmiLoad,
    MonthlySip,
    RetirementCorpus,
}

impl RuleId {
    pub const ALL: [RuleId; RULE_COUNT] = [
        RuleId::EmergencyFund,
        RuleId::HealthInsurance,
        RuleId::LifeInsurance,
        RuleId::CarBudget,
        RuleId::HomePurchase,
        RuleId::UnsecuredDebt,
        RuleId::EmiLoad,
        RuleId::MonthlySip,
        RuleId::RetirementCorpus,
    ];

    pub fn index(self) -> usize {
        match self {
            RuleId::EmergencyFund => 0,
            RuleId::HealthInsurance => 1,
            RuleId::LifeInsurance => 2,
            RuleId::CarBudget => 3,
            RuleId::HomePurchase => 4,
            RuleId::UnsecuredDebt => 5,
            RuleId::EmiLoad => 6,
            RuleId::MonthlySip => 7,
            RuleId::RetirementCorpus => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RuleId::EmergencyFund => "Emergency Fund",
            RuleId::HealthInsurance => "Health Insurance",
            RuleId::LifeInsurance => "Term-Life Insurance",
            RuleId::CarBudget => "Car Budget",
            RuleId::HomePurchase => "Home Purchase",
            RuleId::UnsecuredDebt => "Personal Loans + Credit Cards",
            RuleId::EmiLoad => "All EMIs Combined",
            RuleId::MonthlySip => "Monthly SIP",
            RuleId::RetirementCorpus => "Retirement Corpus",
        }
    }

    pub fn rule_text(self) -> &'static str {
        match self {
            RuleId::EmergencyFund => "3–6× Monthly Expenses",
            RuleId::HealthInsurance => "₹5L – ₹10L cover",
            RuleId::LifeInsurance => "10–15× Annual CTC",
            RuleId::CarBudget => "≤ 60% of Annual CTC",
            RuleId::HomePurchase => "≤ 4× Annual CTC",
            RuleId::UnsecuredDebt => "Ideally zero",
            RuleId::EmiLoad => "≤ 45% of Monthly Take-Home",
            RuleId::MonthlySip => "≥ 20% of CTC, monthly",
            RuleId::RetirementCorpus => "≥ 10× Annual CTC",
        }
    }

    pub fn stage(self) -> Stage {
        match self {
            RuleId::EmergencyFund | RuleId::HealthInsurance | RuleId::LifeInsurance => {
                Stage::Protection
            }
            RuleId::CarBudget | RuleId::HomePurchase | RuleId::UnsecuredDebt | RuleId::EmiLoad => {
                Stage::SpendingLimits
            }
            RuleId::MonthlySip | RuleId::RetirementCorpus => Stage::WealthBuilding,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Protection,
    SpendingLimits,
    WealthBuilding,
}

impl Stage {
    pub fn title(self) -> &'static str {
        match self {
            Stage::Protection => "STAGE 1: PROTECTION",
            Stage::SpendingLimits => "STAGE 2: SPENDING LIMITS",
            Stage::WealthBuilding => "STAGE 3: WEALTH BUILDING",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// Fixed multiplier of the inputs; nothing the user entered.
    Illustrative,
    Reported,
    Derived,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: RuleId,
    pub name: &'static str,
    pub stage: Stage,
    pub rule_text: &'static str,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    pub user_value: f64,
    pub value_source: ValueSource,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleStatus {
    OnTrack,
    AlmostThere,
    NeedsAttention,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResult {
    pub rule: Rule,
    pub status: RuleStatus,
}

/// Rules the user ticked as already met.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checklist {
    checked: [bool; RULE_COUNT],
}

impl Checklist {
    pub fn from_checked<I: IntoIterator<Item = RuleId>>(ids: I) -> Self {
        let mut checklist = Self::default();
        for id in ids {
            checklist.check(id);
        }
        checklist
    }

    pub fn check(&mut self, id: RuleId) {
        self.checked[id.index()] = true;
    }

    pub fn is_checked(&self, id: RuleId) -> bool {
        self.checked[id.index()]
    }

    pub fn checked_count(&self) -> usize {
        self.checked.iter().filter(|&&c| c).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvaluationMode {
    #[default]
    Automatic,
    SelfReported(Checklist),
}

impl EvaluationMode {
    pub fn label(&self) -> &'static str {
        match self {
            EvaluationMode::Automatic => "automatic",
            EvaluationMode::SelfReported(_) => "self-reported",
        }
    }
}

/// Actual figures the user knows about; each replaces the matching placeholder.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CurrentPosition {
    pub emergency_fund: Option<f64>,
    pub health_cover: Option<f64>,
    pub life_cover: Option<f64>,
    pub car_value: Option<f64>,
    pub home_price: Option<f64>,
    pub unsecured_debt: Option<f64>,
    pub monthly_emis: Option<f64>,
    pub monthly_sip: Option<f64>,
    pub retirement_corpus: Option<f64>,
}

impl CurrentPosition {
    pub fn reported(&self, id: RuleId) -> Option<f64> {
        match id {
            RuleId::EmergencyFund => self.emergency_fund,
            RuleId::HealthInsurance => self.health_cover,
            RuleId::LifeInsurance => self.life_cover,
            RuleId::CarBudget => self.car_value,
            RuleId::HomePurchase => self.home_price,
            RuleId::UnsecuredDebt => self.unsecured_debt,
            RuleId::EmiLoad => self.monthly_emis,
            RuleId::MonthlySip => self.monthly_sip,
            RuleId::RetirementCorpus => self.retirement_corpus,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for id in RuleId::ALL {
            if let Some(value) = self.reported(id) {
                if !value.is_finite() || value < 0.0 {
                    return Err(PlanError::invalid(
                        position_field(id),
                        format!("must be >= 0, got {value}"),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn position_field(id: RuleId) -> &'static str {
    match id {
        RuleId::EmergencyFund => "emergencyFund",
        RuleId::HealthInsurance => "healthCover",
        RuleId::LifeInsurance => "lifeCover",
        RuleId::CarBudget => "carValue",
        RuleId::HomePurchase => "homePrice",
        RuleId::UnsecuredDebt => "unsecuredDebt",
        RuleId::EmiLoad => "monthlyEmis",
        RuleId::MonthlySip => "monthlySip",
        RuleId::RetirementCorpus => "retirementCorpus",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSummary {
    pub inputs: FinancialInputs,
    pub derived: DerivedCashflow,
    #[serde(serialize_with = "serialize_mode")]
    pub mode: EvaluationMode,
    pub results: Vec<RuleResult>,
    pub met_count: usize,
}

fn serialize_mode<S: serde::Serializer>(
    mode: &EvaluationMode,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(mode.label())
}
