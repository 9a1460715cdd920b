mod engine;
mod report;
mod types;

pub use engine::{build_rules, derive_cashflow, evaluate, evaluate_plan, evaluate_rule};
pub use report::{
    REPORT_TITLE, encouragement, format_inr, format_snapshot_date, format_summary,
    report_file_name, status_label, threshold_text,
};
pub use types::{
    CRORE, Checklist, CurrentPosition, DerivedCashflow, EvaluationMode, EvaluationSummary,
    FinancialInputs, LAKH, PlanError, RULE_COUNT, Result, Rule, RuleId, RuleResult, RuleStatus,
    Stage, ValueSource,
};
