// Deterministic simulated responses
// Keeps the rest of the system exercisable without a live provider, and
// turns outages into a clearly labeled canned answer instead of an error.

const SIMULATED_LABEL: &str = "[Simulated response - no AI provider is configured or available]";

const TREATMENT_PLAN_TEMPLATE: &str = "\
Proposed treatment plan outline:\n\
1. Continue weekly sessions with a focus on the presenting concerns.\n\
2. Introduce structured coping-skill practice between sessions.\n\
3. Review progress against goals in four weeks and adjust.\n\
Review this outline with your own clinical judgment before use.";

const PREDICTION_TEMPLATE: &str = "\
Progress outlook: based on the session history provided, engagement appears \
steady. Continued attendance and between-session practice are the strongest \
available indicators of further improvement. Treat this as a rough signal, \
not a clinical prediction.";

const SUMMARY_TEMPLATE: &str = "\
Session summary: the session covered the client's current concerns, coping \
strategies discussed, and agreed next steps. Key themes should be reviewed \
and confirmed against the original notes.";

const DEFAULT_TEMPLATE: &str = "\
The request was processed locally. Connect an AI provider to receive a \
generated response for this feature.";

/// Keyword-matched canned response. Same prompt, same answer, every time.
pub fn simulated_completion(prompt: &str) -> String {
    let lower = prompt.to_lowercase();
    let template = if lower.contains("treatment plan") {
        TREATMENT_PLAN_TEMPLATE
    } else if lower.contains("predict") || lower.contains("progress") {
        PREDICTION_TEMPLATE
    } else if lower.contains("summar") || lower.contains("session") {
        SUMMARY_TEMPLATE
    } else {
        DEFAULT_TEMPLATE
    };
    format!("{}\n\n{}", SIMULATED_LABEL, template)
}
