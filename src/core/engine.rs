use super::types::{
    CurrentPosition, DerivedCashflow, EvaluationMode, EvaluationSummary, FinancialInputs,
    MAX_ANNUAL_CTC_MULTIPLE, Result, Rule, RuleId, RuleResult, RuleStatus, ValueSource,
};

/// Share of CTC left after tax and PF.
const TAKE_HOME_SHARE: f64 = 0.75;
const MONTHS_PER_YEAR: f64 = 12.0;

const EMERGENCY_FUND_MIN_MONTHS: f64 = 3.0;
const EMERGENCY_FUND_MAX_MONTHS: f64 = 6.0;
const HEALTH_COVER_MIN: f64 = 500_000.0;
const HEALTH_COVER_MAX: f64 = 1_000_000.0;
const LIFE_COVER_MIN_YEARS: f64 = 10.0;
const LIFE_COVER_MAX_YEARS: f64 = MAX_ANNUAL_CTC_MULTIPLE;
const CAR_BUDGET_MAX_SHARE: f64 = 0.6;
const HOME_PRICE_MAX_YEARS: f64 = 4.0;
const EMI_MAX_SHARE: f64 = 0.45;
const SIP_MIN_SHARE: f64 = 0.20;
const RETIREMENT_MIN_YEARS: f64 = 10.0;

// Stand-ins for balances the inputs never capture.
const EMERGENCY_FUND_PLACEHOLDER_MONTHS: f64 = 2.0;
const HEALTH_COVER_PLACEHOLDER: f64 = 600_000.0;
const LIFE_COVER_PLACEHOLDER_YEARS: f64 = 12.0;
const CAR_VALUE_PLACEHOLDER_SHARE: f64 = 0.5;
const HOME_PRICE_PLACEHOLDER_YEARS: f64 = 3.0;
const EMI_PLACEHOLDER_SHARE: f64 = 0.4;
const RETIREMENT_PLACEHOLDER_YEARS: f64 = 11.0;

/// Below the range but at least this share of the lower bound counts as close.
const ALMOST_THERE_SHARE: f64 = 0.5;

pub fn derive_cashflow(inputs: &FinancialInputs) -> DerivedCashflow {
    let monthly_take_home = TAKE_HOME_SHARE * inputs.annual_ctc() / MONTHS_PER_YEAR;
    let monthly_savings = inputs.savings_rate_percent() / 100.0 * monthly_take_home;
    DerivedCashflow {
        monthly_take_home,
        monthly_savings,
        monthly_expenses: monthly_take_home - monthly_savings,
    }
}

pub fn build_rules(
    inputs: &FinancialInputs,
    derived: &DerivedCashflow,
    position: &CurrentPosition,
) -> Vec<Rule> {
    RuleId::ALL
        .iter()
        .map(|&id| build_rule(id, inputs, derived, position))
        .collect()
}

fn build_rule(
    id: RuleId,
    inputs: &FinancialInputs,
    derived: &DerivedCashflow,
    position: &CurrentPosition,
) -> Rule {
    let annual = inputs.annual_ctc();
    let expenses = derived.monthly_expenses;
    let take_home = derived.monthly_take_home;

    let (lower_bound, upper_bound, fallback_value, fallback_source) = match id {
        RuleId::EmergencyFund => (
            Some(EMERGENCY_FUND_MIN_MONTHS * expenses),
            Some(EMERGENCY_FUND_MAX_MONTHS * expenses),
            EMERGENCY_FUND_PLACEHOLDER_MONTHS * derived.monthly_savings,
            ValueSource::Illustrative,
        ),
        RuleId::HealthInsurance => (
            Some(HEALTH_COVER_MIN),
            Some(HEALTH_COVER_MAX),
            HEALTH_COVER_PLACEHOLDER,
            ValueSource::Illustrative,
        ),
        RuleId::LifeInsurance => (
            Some(LIFE_COVER_MIN_YEARS * annual),
            Some(LIFE_COVER_MAX_YEARS * annual),
            LIFE_COVER_PLACEHOLDER_YEARS * annual,
            ValueSource::Illustrative,
        ),
        RuleId::CarBudget => (
            None,
            Some(CAR_BUDGET_MAX_SHARE * annual),
            CAR_VALUE_PLACEHOLDER_SHARE * annual,
            ValueSource::Illustrative,
        ),
        RuleId::HomePurchase => (
            None,
            Some(HOME_PRICE_MAX_YEARS * annual),
            HOME_PRICE_PLACEHOLDER_YEARS * annual,
            ValueSource::Illustrative,
        ),
        RuleId::UnsecuredDebt => (None, Some(0.0), 0.0, ValueSource::Illustrative),
        RuleId::EmiLoad => (
            None,
            Some(EMI_MAX_SHARE * take_home),
            EMI_PLACEHOLDER_SHARE * take_home,
            ValueSource::Illustrative,
        ),
        RuleId::MonthlySip => (
            Some(SIP_MIN_SHARE * annual / MONTHS_PER_YEAR),
            None,
            derived.monthly_savings,
            ValueSource::Derived,
        ),
        RuleId::RetirementCorpus => (
            Some(RETIREMENT_MIN_YEARS * annual),
            None,
            RETIREMENT_PLACEHOLDER_YEARS * annual,
            ValueSource::Illustrative,
        ),
    };

    let (user_value, value_source) = match position.reported(id) {
        Some(value) => (value, ValueSource::Reported),
        None => (fallback_value, fallback_source),
    };

    Rule {
        id,
        name: id.name(),
        stage: id.stage(),
        rule_text: id.rule_text(),
        lower_bound,
        upper_bound,
        user_value,
        value_source,
    }
}

pub fn evaluate_rule(rule: &Rule) -> RuleStatus {
    let value = rule.user_value;
    match (rule.lower_bound, rule.upper_bound) {
        (Some(lower), Some(upper)) => {
            if lower <= value && value <= upper {
                RuleStatus::OnTrack
            } else if value >= ALMOST_THERE_SHARE * lower {
                RuleStatus::AlmostThere
            } else {
                RuleStatus::NeedsAttention
            }
        }
        (Some(lower), None) => on_track_if(value >= lower),
        (None, Some(upper)) => on_track_if(value <= upper),
        (None, None) => RuleStatus::OnTrack,
    }
}

fn on_track_if(met: bool) -> RuleStatus {
    if met {
        RuleStatus::OnTrack
    } else {
        RuleStatus::NeedsAttention
    }
}

pub fn evaluate_plan(
    inputs: &FinancialInputs,
    position: &CurrentPosition,
    mode: &EvaluationMode,
) -> Result<EvaluationSummary> {
    position.validate()?;

    let derived = derive_cashflow(inputs);
    let results: Vec<RuleResult> = build_rules(inputs, &derived, position)
        .into_iter()
        .map(|rule| {
            let status = match mode {
                EvaluationMode::Automatic => evaluate_rule(&rule),
                EvaluationMode::SelfReported(checklist) => on_track_if(checklist.is_checked(rule.id)),
            };
            RuleResult { rule, status }
        })
        .collect();
    let met_count = results
        .iter()
        .filter(|r| r.status == RuleStatus::OnTrack)
        .count();

    tracing::debug!(
        ctc = inputs.ctc(),
        savings_rate = inputs.savings_rate_percent(),
        mode = mode.label(),
        met_count,
        "evaluated thumb rules"
    );

    Ok(EvaluationSummary {
        inputs: *inputs,
        derived,
        mode: *mode,
        results,
        met_count,
    })
}

/// Automatic evaluation with every placeholder left in place.
pub fn evaluate(ctc: f64, savings_rate_percent: f64) -> Result<EvaluationSummary> {
    let inputs = FinancialInputs::new(ctc, savings_rate_percent)?;
    evaluate_plan(&inputs, &CurrentPosition::default(), &EvaluationMode::Automatic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Checklist, PlanError, RULE_COUNT};
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn status_of(summary: &EvaluationSummary, id: RuleId) -> RuleStatus {
        summary.results[id.index()].status
    }

    fn rule_of(summary: &EvaluationSummary, id: RuleId) -> &Rule {
        &summary.results[id.index()].rule
    }

    fn sample_inputs() -> FinancialInputs {
        FinancialInputs::new(25.0, 50.0).expect("valid inputs")
    }

    #[test]
    fn cashflow_matches_hand_calculation_for_default_sliders() {
        let derived = derive_cashflow(&sample_inputs());
        assert_approx(derived.monthly_take_home, 156_250.0);
        assert_approx(derived.monthly_savings, 78_125.0);
        assert_approx(derived.monthly_expenses, 78_125.0);
    }

    #[test]
    fn default_sliders_meet_eight_rules_with_emergency_fund_almost_there() {
        let summary = evaluate(25.0, 50.0).expect("valid inputs");
        assert_eq!(summary.results.len(), RULE_COUNT);
        assert_eq!(summary.met_count, 8);
        assert_eq!(
            status_of(&summary, RuleId::EmergencyFund),
            RuleStatus::AlmostThere
        );
        for id in RuleId::ALL.into_iter().skip(1) {
            assert_eq!(status_of(&summary, id), RuleStatus::OnTrack, "{id:?}");
        }
    }

    #[test]
    fn rule_bounds_follow_thumb_rule_table() {
        let summary = evaluate(25.0, 50.0).expect("valid inputs");

        let emergency = rule_of(&summary, RuleId::EmergencyFund);
        assert_eq!(emergency.lower_bound, Some(234_375.0));
        assert_eq!(emergency.upper_bound, Some(468_750.0));
        assert_approx(emergency.user_value, 156_250.0);

        let life = rule_of(&summary, RuleId::LifeInsurance);
        assert_eq!(life.lower_bound, Some(25_000_000.0));
        assert_eq!(life.upper_bound, Some(37_500_000.0));

        let car = rule_of(&summary, RuleId::CarBudget);
        assert_eq!(car.lower_bound, None);
        assert_approx(car.upper_bound.expect("upper bound"), 1_500_000.0);

        let emi = rule_of(&summary, RuleId::EmiLoad);
        assert_approx(emi.upper_bound.expect("upper bound"), 70_312.5);
        assert_approx(emi.user_value, 62_500.0);

        let sip = rule_of(&summary, RuleId::MonthlySip);
        assert_approx(sip.lower_bound.expect("lower bound"), 500_000.0 / 12.0);
        assert_eq!(sip.upper_bound, None);
        assert_eq!(sip.value_source, ValueSource::Derived);

        let retirement = rule_of(&summary, RuleId::RetirementCorpus);
        assert_eq!(retirement.lower_bound, Some(25_000_000.0));
        assert_eq!(retirement.upper_bound, None);
    }

    #[test]
    fn rejects_negative_ctc_and_out_of_range_savings_rate() {
        let err = evaluate(-1.0, 50.0).expect_err("negative ctc");
        assert!(matches!(err, PlanError::InvalidInput { field: "ctc", .. }));

        let err = evaluate(25.0, 150.0).expect_err("rate above 100");
        assert!(matches!(
            err,
            PlanError::InvalidInput {
                field: "savingsRate",
                ..
            }
        ));

        assert!(evaluate(25.0, -0.5).is_err());
        assert!(evaluate(f64::NAN, 50.0).is_err());
        assert!(evaluate(25.0, f64::INFINITY).is_err());
    }

    #[test]
    fn rejects_ctc_whose_bounds_would_overflow() {
        let err = evaluate(1e304, 0.0).expect_err("overflowing ctc");
        assert!(matches!(err, PlanError::InvalidInput { field: "ctc", .. }));
        assert!(evaluate(f64::MAX, 50.0).is_err());

        let summary = evaluate(1e290, 50.0).expect("large but representable ctc");
        let derived = summary.derived;
        assert!(derived.monthly_take_home.is_finite());
        assert!(derived.monthly_savings.is_finite());
        assert!(derived.monthly_expenses.is_finite());
        for result in &summary.results {
            assert!(result.rule.user_value.is_finite(), "{:?}", result.rule.id);
            assert!(result.rule.lower_bound.is_none_or(f64::is_finite));
            assert!(result.rule.upper_bound.is_none_or(f64::is_finite));
        }
    }

    #[test]
    fn accepts_domain_edges() {
        let zero_ctc = evaluate(0.0, 0.0).expect("zero ctc is valid");
        assert_eq!(zero_ctc.met_count, RULE_COUNT);

        let all_saved = evaluate(40.0, 100.0).expect("full savings rate is valid");
        assert_approx(all_saved.derived.monthly_expenses, 0.0);
        assert_eq!(
            status_of(&all_saved, RuleId::EmergencyFund),
            RuleStatus::AlmostThere
        );
    }

    #[test]
    fn zero_savings_rate_fails_savings_driven_rules() {
        let summary = evaluate(30.0, 0.0).expect("valid inputs");
        assert_approx(summary.derived.monthly_savings, 0.0);
        assert_eq!(
            status_of(&summary, RuleId::EmergencyFund),
            RuleStatus::NeedsAttention
        );
        assert_eq!(
            status_of(&summary, RuleId::MonthlySip),
            RuleStatus::NeedsAttention
        );
        assert_eq!(summary.met_count, 7);
    }

    #[test]
    fn emergency_fund_on_track_inside_expense_band() {
        // 2S sits within 3E..6E once the rate is between 60% and 75%.
        let summary = evaluate(20.0, 70.0).expect("valid inputs");
        assert_eq!(
            status_of(&summary, RuleId::EmergencyFund),
            RuleStatus::OnTrack
        );
        assert_eq!(summary.met_count, RULE_COUNT);

        let summary = evaluate(20.0, 80.0).expect("valid inputs");
        assert_eq!(
            status_of(&summary, RuleId::EmergencyFund),
            RuleStatus::AlmostThere
        );
    }

    #[test]
    fn reported_values_replace_placeholders() {
        let inputs = sample_inputs();
        let position = CurrentPosition {
            emergency_fund: Some(300_000.0),
            health_cover: Some(200_000.0),
            unsecured_debt: Some(45_000.0),
            monthly_sip: Some(10_000.0),
            ..CurrentPosition::default()
        };
        let summary = evaluate_plan(&inputs, &position, &EvaluationMode::Automatic)
            .expect("valid inputs");

        assert_eq!(
            status_of(&summary, RuleId::EmergencyFund),
            RuleStatus::OnTrack
        );
        assert_eq!(
            status_of(&summary, RuleId::HealthInsurance),
            RuleStatus::NeedsAttention
        );
        assert_eq!(
            status_of(&summary, RuleId::UnsecuredDebt),
            RuleStatus::NeedsAttention
        );
        assert_eq!(
            status_of(&summary, RuleId::MonthlySip),
            RuleStatus::NeedsAttention
        );
        assert_eq!(
            rule_of(&summary, RuleId::HealthInsurance).value_source,
            ValueSource::Reported
        );
        assert_eq!(
            rule_of(&summary, RuleId::LifeInsurance).value_source,
            ValueSource::Illustrative
        );
        assert_eq!(summary.met_count, 6);
    }

    #[test]
    fn reported_health_cover_between_half_and_min_is_almost_there() {
        let position = CurrentPosition {
            health_cover: Some(300_000.0),
            ..CurrentPosition::default()
        };
        let summary = evaluate_plan(&sample_inputs(), &position, &EvaluationMode::Automatic)
            .expect("valid inputs");
        assert_eq!(
            status_of(&summary, RuleId::HealthInsurance),
            RuleStatus::AlmostThere
        );
    }

    #[test]
    fn negative_reported_value_is_invalid_input() {
        let position = CurrentPosition {
            monthly_emis: Some(-1.0),
            ..CurrentPosition::default()
        };
        let err = evaluate_plan(&sample_inputs(), &position, &EvaluationMode::Automatic)
            .expect_err("negative emi");
        assert_eq!(
            err,
            PlanError::InvalidInput {
                field: "monthlyEmis",
                reason: "must be >= 0, got -1".to_string(),
            }
        );
    }

    #[test]
    fn self_reported_mode_counts_ticked_rules_only() {
        let checklist = Checklist::from_checked([
            RuleId::HealthInsurance,
            RuleId::UnsecuredDebt,
            RuleId::MonthlySip,
        ]);
        let summary = evaluate_plan(
            &sample_inputs(),
            &CurrentPosition::default(),
            &EvaluationMode::SelfReported(checklist),
        )
        .expect("valid inputs");

        assert_eq!(summary.met_count, 3);
        assert_eq!(
            status_of(&summary, RuleId::HealthInsurance),
            RuleStatus::OnTrack
        );
        assert_eq!(
            status_of(&summary, RuleId::LifeInsurance),
            RuleStatus::NeedsAttention
        );
    }

    #[test]
    fn rule_with_no_bounds_is_on_track() {
        let rule = Rule {
            id: RuleId::HealthInsurance,
            name: "Unbounded",
            stage: RuleId::HealthInsurance.stage(),
            rule_text: "",
            lower_bound: None,
            upper_bound: None,
            user_value: 42.0,
            value_source: ValueSource::Reported,
        };
        assert_eq!(evaluate_rule(&rule), RuleStatus::OnTrack);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_savings_plus_expenses_equals_take_home(
            ctc_centi in 1u32..100_000,
            rate_bp in 0u32..=10_000
        ) {
            let inputs = FinancialInputs::new(ctc_centi as f64 / 100.0, rate_bp as f64 / 100.0)
                .expect("valid inputs");
            let derived = derive_cashflow(&inputs);
            prop_assert!(
                (derived.monthly_savings + derived.monthly_expenses - derived.monthly_take_home).abs() <= EPS
            );
            prop_assert!(derived.monthly_savings >= 0.0);
            prop_assert!(derived.monthly_expenses >= -EPS);
        }

        #[test]
        fn prop_take_home_strictly_increases_with_ctc(
            ctc_centi in 0u32..100_000,
            step in 1u32..10_000,
            rate_bp in 0u32..=10_000
        ) {
            let rate = rate_bp as f64 / 100.0;
            let low = FinancialInputs::new(ctc_centi as f64 / 100.0, rate).expect("valid inputs");
            let high = FinancialInputs::new((ctc_centi + step) as f64 / 100.0, rate).expect("valid inputs");
            prop_assert!(derive_cashflow(&high).monthly_take_home > derive_cashflow(&low).monthly_take_home);
        }

        #[test]
        fn prop_savings_strictly_increase_with_rate(
            ctc_centi in 1u32..100_000,
            rate_bp in 0u32..9_999,
            step in 1u32..100
        ) {
            let ctc = ctc_centi as f64 / 100.0;
            let high_bp = (rate_bp + step).min(10_000);
            let low = FinancialInputs::new(ctc, rate_bp as f64 / 100.0).expect("valid inputs");
            let high = FinancialInputs::new(ctc, high_bp as f64 / 100.0).expect("valid inputs");
            prop_assert!(derive_cashflow(&high).monthly_savings > derive_cashflow(&low).monthly_savings);
            if rate_bp == 0 {
                prop_assert_eq!(derive_cashflow(&low).monthly_savings, 0.0);
            }
        }

        #[test]
        fn prop_fixed_rules_on_track_and_met_count_matches(
            ctc_centi in 0u32..100_000,
            rate_bp in 0u32..=10_000
        ) {
            let summary = evaluate(ctc_centi as f64 / 100.0, rate_bp as f64 / 100.0)
                .expect("valid inputs");
            prop_assert_eq!(status_of(&summary, RuleId::HealthInsurance), RuleStatus::OnTrack);
            prop_assert_eq!(status_of(&summary, RuleId::UnsecuredDebt), RuleStatus::OnTrack);
            let on_track = summary
                .results
                .iter()
                .filter(|r| r.status == RuleStatus::OnTrack)
                .count();
            prop_assert_eq!(summary.met_count, on_track);
            prop_assert!(summary.met_count <= RULE_COUNT);
        }
    }
}
