use chrono::NaiveDate;

use super::types::{
    CRORE, EvaluationMode, EvaluationSummary, LAKH, RULE_COUNT, Rule, RuleStatus, Stage,
    ValueSource,
};

pub const REPORT_TITLE: &str = "5 Minute Financial Plan";

const NOTES: [&str; 4] = [
    "CTC is gross annual income in LPA",
    "25% deductions assumed for tax + PF",
    "These are thumb-rule suggestions, NOT personalized financial advice",
    "All values rounded to nearest ₹K, ₹L or ₹Cr as needed",
];

/// `DD-Mon-YYYY`, e.g. `18-Oct-2026`.
pub fn format_snapshot_date(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}

pub fn report_file_name(date: NaiveDate) -> String {
    format!("financial_plan_{}.txt", format_snapshot_date(date))
}

/// Rupee amount scaled to Cr, L or K.
pub fn format_inr(amount: f64) -> String {
    let magnitude = amount.abs();
    if magnitude >= CRORE {
        format!("₹{:.2} Cr", amount / CRORE)
    } else if magnitude >= LAKH {
        format!("₹{:.2} L", amount / LAKH)
    } else if magnitude >= 1_000.0 {
        format!("₹{:.1} K", amount / 1_000.0)
    } else {
        format!("₹{amount:.0}")
    }
}

pub fn status_label(status: RuleStatus, mode: &EvaluationMode) -> &'static str {
    match (mode, status) {
        (EvaluationMode::SelfReported(_), RuleStatus::OnTrack) => "MET",
        (EvaluationMode::SelfReported(_), _) => "NOT MET",
        (EvaluationMode::Automatic, RuleStatus::OnTrack) => "On Track",
        (EvaluationMode::Automatic, RuleStatus::AlmostThere) => "Almost There",
        (EvaluationMode::Automatic, RuleStatus::NeedsAttention) => "Needs Attention",
    }
}

pub fn encouragement(met_count: usize) -> String {
    if met_count >= RULE_COUNT {
        format!(
            "🎉 CONGRATULATIONS! You've met all {RULE_COUNT} out of {RULE_COUNT} thumb rules. You're Top-Gun!"
        )
    } else if met_count >= 6 {
        format!(
            "👏 Great progress! You've met {met_count} out of {RULE_COUNT} thumb rules. You're doing well financially."
        )
    } else if met_count >= 3 {
        format!(
            "👍 Good start! You've met {met_count} out of {RULE_COUNT} thumb rules. Keep working on the remaining areas."
        )
    } else {
        format!(
            "💪 You've met {met_count} out of {RULE_COUNT} thumb rules. There's room for improvement!"
        )
    }
}

pub fn threshold_text(rule: &Rule) -> String {
    match (rule.lower_bound, rule.upper_bound) {
        (Some(lower), Some(upper)) => format!("{} to {}", format_inr(lower), format_inr(upper)),
        (Some(lower), None) => format!("≥ {}", format_inr(lower)),
        (None, Some(upper)) if upper == 0.0 => "Zero".to_string(),
        (None, Some(upper)) => format!("≤ {}", format_inr(upper)),
        (None, None) => "Any".to_string(),
    }
}

fn current_value_text(rule: &Rule) -> String {
    match rule.value_source {
        ValueSource::Illustrative => format!("{} (illustrative)", format_inr(rule.user_value)),
        ValueSource::Reported | ValueSource::Derived => format_inr(rule.user_value),
    }
}

pub fn format_summary(summary: &EvaluationSummary, generated_on: NaiveDate) -> String {
    let inputs = &summary.inputs;
    let derived = &summary.derived;

    let mut lines = vec![
        REPORT_TITLE.to_string(),
        format!("Generated on: {}", format_snapshot_date(generated_on)),
        String::new(),
        "INPUT DETAILS:".to_string(),
        format!("- Annual CTC: ₹{:.2} L", inputs.ctc()),
        format!("- Savings Rate: {}%", inputs.savings_rate_percent()),
        format!("- Evaluation: {}", summary.mode.label()),
        String::new(),
        "MONTHLY CASHFLOWS:".to_string(),
        format!("- Monthly Take-Home: {}", format_inr(derived.monthly_take_home)),
        format!("- Monthly Savings: {}", format_inr(derived.monthly_savings)),
        format!("- Monthly Expenses: {}", format_inr(derived.monthly_expenses)),
        String::new(),
        "CHECKLIST:".to_string(),
    ];

    let mut current_stage: Option<Stage> = None;
    for (position, result) in summary.results.iter().enumerate() {
        let rule = &result.rule;
        if current_stage != Some(rule.stage) {
            if current_stage.is_some() {
                lines.push(String::new());
            }
            lines.push(rule.stage.title().to_string());
            current_stage = Some(rule.stage);
        }
        lines.push(format!(
            "{}. {} ({}): {}",
            position + 1,
            rule.name,
            rule.rule_text,
            status_label(result.status, &summary.mode)
        ));
        lines.push(format!(
            "   Target: {} | Current: {}",
            threshold_text(rule),
            current_value_text(rule)
        ));
    }

    lines.push(String::new());
    lines.push(format!(
        "TOTAL: {} out of {RULE_COUNT} thumb rules met",
        summary.met_count
    ));
    lines.push(encouragement(summary.met_count));
    lines.push(String::new());
    lines.push("NOTES:".to_string());
    lines.extend(NOTES.iter().map(|note| format!("- {note}")));

    let mut text = lines.join("\n");
    text.push('\n');
    text
}
