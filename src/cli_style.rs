/*!
 * Terminal tables for the Warden CLI
 */

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use warden_core_resilience::{PolicyTable, RecoveryStrategy};

use crate::error::Result;

/// Create a styled data table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn strategy_color(strategy: RecoveryStrategy) -> Color {
    match strategy {
        RecoveryStrategy::Escalate => Color::Red,
        RecoveryStrategy::Fallback | RecoveryStrategy::CircuitBreaker => Color::Yellow,
        _ => Color::Green,
    }
}

/// One row per policy, sorted by name
pub fn policy_table(policies: &PolicyTable) -> Table {
    let mut table = create_table();
    table.set_header(vec![
        header_cell("Policy"),
        header_cell("Max Retries"),
        header_cell("Retry Delay"),
        header_cell("Backoff"),
        header_cell("Fallback"),
        header_cell("Breaker Threshold"),
        header_cell("Strategy"),
    ]);

    for name in policies.names() {
        let policy = policies.lookup(name);
        table.add_row(vec![
            Cell::new(name)
                .fg(Color::White)
                .add_attribute(Attribute::Bold),
            Cell::new(policy.max_retries),
            Cell::new(format!("{:.1}s", policy.retry_delay.as_secs_f64())),
            Cell::new(format!("x{}", policy.backoff_multiplier)),
            Cell::new(policy.fallback_target.as_deref().unwrap_or("-")).fg(Color::DarkGrey),
            Cell::new(policy.circuit_breaker_threshold),
            Cell::new(policy.strategy).fg(strategy_color(policy.strategy)),
        ]);
    }

    table
}

/// Print a report as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table_lists_every_policy() {
        let rendered = policy_table(&PolicyTable::reference()).to_string();
        for name in ["critical", "default", "network"] {
            assert!(rendered.contains(name), "missing {}", name);
        }
        assert!(rendered.contains("master_legal"));
        assert!(rendered.contains("circuit_breaker"));
    }
}
