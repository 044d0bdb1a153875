use governance_core::{InterventionReport, Suggestion};

/// Pick the reports worth injecting into a retry prompt: highest
/// severity first, stable within a severity class, truncated to `limit`.
pub fn select_reports(reports: &[InterventionReport], limit: usize) -> Vec<InterventionReport> {
    let mut selected: Vec<InterventionReport> = reports.to_vec();
    selected.sort_by(|a, b| b.severity.cmp(&a.severity));
    selected.truncate(limit);
    selected
}

/// Render the feedback block prepended to the original prompt on retry.
///
/// Tier B suggestions enumerate still-feasible options neutrally; no
/// report ever tells the model what to pick.
pub fn format_feedback(reports: &[InterventionReport]) -> String {
    let mut feedback =
        String::from("Your previous reply was not accepted for these reasons:\n");
    for report in reports {
        feedback.push_str(&format!(
            "[{}] '{}': {}",
            report.severity.as_str(),
            report.blocked_skill,
            report.message
        ));
        if let Suggestion::Feasible { options } = &report.suggestion {
            if !options.is_empty() {
                feedback.push_str(&format!(
                    " Options that remain feasible: {}.",
                    options.join(", ")
                ));
            }
        }
        feedback.push('\n');
    }
    feedback.push_str("Please decide again, using the required response format.\n\n");
    feedback
}
