// src/utils/log.rs

//! Formatting helpers for run summaries.
//!
//! Everything goes through the `log` facade, so output lands in
//! `env_logger` for the CLI and in the tracing subscriber on Lambda.

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("{}", format_step(step_num, total, message));
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    for line in format_summary(title, items) {
        log::info!("{}", line);
    }
}

fn format_step(step_num: usize, total: usize, message: &str) -> String {
    format!("[STEP {}/{}] {}", step_num, total, message)
}

fn format_summary(title: &str, items: &[(&str, String)]) -> Vec<String> {
    std::iter::once(format!("[SUMMARY] {}", title))
        .chain(
            items
                .iter()
                .map(|(key, value)| format!("    {}: {}", key, value)),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_step() {
        assert_eq!(format_step(2, 5, "Load snapshot"), "[STEP 2/5] Load snapshot");
    }

    #[test]
    fn test_format_summary() {
        let lines = format_summary("Check", &[("Changes", "3".to_string())]);
        assert_eq!(lines, vec!["[SUMMARY] Check", "    Changes: 3"]);
    }
}
