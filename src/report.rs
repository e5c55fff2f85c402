//! Plain-text reports
//!
//! Amounts are rounded to cents only here, after all summation is done.

use crate::cost::CostBreakdown;
use crate::pricing::PriceSource;
use crate::snapshot::{Outcome, OutcomeRecord, RunSummary};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt::Write;

pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

/// Render a cost breakdown, one block per kind
pub fn render_cost(breakdown: &CostBreakdown) -> String {
    let mut out = String::new();
    let currency = &breakdown.currency;

    let _ = write!(
        out,
        "Projected monthly cost ({} prices, {}",
        breakdown.tier, currency
    );
    match breakdown.vat_rate {
        Some(rate) => {
            let _ = writeln!(out, ", VAT {}%)", format_amount(rate));
        }
        None => {
            let _ = writeln!(out, ")");
        }
    }

    for kind in &breakdown.kinds {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} ({}): {} {}",
            kind.kind.display_name(),
            kind.items.len(),
            format_amount(kind.total),
            currency
        );
        for item in &kind.items {
            let marker = match item.source {
                PriceSource::Fallback => " (fallback price)",
                PriceSource::Missing => " (no price found)",
                PriceSource::Exact | PriceSource::Flat => "",
            };
            let _ = write!(
                out,
                "  {:<32} {:<24} {:>10}",
                item.name,
                item.detail,
                format_amount(item.amount)
            );
            if let Some(surcharge) = item.surcharge {
                let _ = write!(out, "  + backups {}", format_amount(surcharge));
            }
            let _ = writeln!(out, "{}", marker);
        }
    }

    let _ = writeln!(out);
    if !breakdown.backups_total.is_zero() {
        let _ = writeln!(
            out,
            "Backups: {} {}",
            format_amount(breakdown.backups_total),
            currency
        );
    }
    let _ = writeln!(out, "Total: {} {}", format_amount(breakdown.total), currency);

    let approximate = breakdown.approximate_items().count();
    if approximate > 0 {
        let _ = writeln!(
            out,
            "Note: {} item(s) priced by fallback or missing from the catalog",
            approximate
        );
    }

    out
}

/// One line per server
pub fn render_outcome(record: &OutcomeRecord) -> String {
    let subject = format!("{} ({})", record.server_name, record.server_id);
    match &record.outcome {
        Outcome::DryRun => format!(
            "[dry run] {subject}: would create snapshot '{}'",
            record.description
        ),
        Outcome::Submitted {
            action,
            image_id,
            timed_out,
        } => {
            let image = image_id
                .map(|id| format!(", image {id}"))
                .unwrap_or_default();
            let mut line = format!(
                "{} {subject}: action {} {}{image}",
                action.status.icon(),
                action.id,
                action.status
            );
            if *timed_out {
                line.push_str(" (stopped waiting)");
            }
            if let Some(error) = &action.error {
                line.push_str(&format!(" - {error}"));
            }
            line
        }
        Outcome::Rejected {
            status,
            message,
            hint,
        } => {
            let mut line = format!("✗ {subject}: rejected with HTTP {status}");
            if let Some(message) = message {
                line.push_str(&format!(": {message}"));
            }
            if let Some(hint) = hint {
                line.push_str(&format!(" ({hint})"));
            }
            line
        }
        Outcome::Failed { error } => format!("✗ {subject}: {error}"),
    }
}

pub fn render_snapshot(records: &[OutcomeRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let _ = writeln!(out, "{}", render_outcome(record));
    }

    let summary = RunSummary::from_records(records);
    let _ = writeln!(
        out,
        "{} servers: {} submitted ({} succeeded, {} failed, {} unsettled), {} dry run, {} not submitted",
        summary.total,
        summary.submitted,
        summary.succeeded,
        summary.action_errors,
        summary.unsettled,
        summary.dry_run,
        summary.submission_failures
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::Tier;
    use crate::snapshot::{Action, ActionStatus, WRITE_SCOPE_HINT};
    use rust_decimal_macros::dec;

    fn record(outcome: Outcome) -> OutcomeRecord {
        OutcomeRecord {
            server_id: 12,
            server_name: "web".to_string(),
            description: "snapshot-web".to_string(),
            outcome,
        }
    }

    #[test]
    fn test_amounts_round_half_away_from_zero() {
        assert_eq!(format_amount(dec!(2.625)), "2.63");
        assert_eq!(format_amount(dec!(3)), "3.00");
        assert_eq!(format_amount(dec!(0.1190)), "0.12");
    }

    #[test]
    fn test_cost_header_shows_vat_rate_when_listed() {
        let mut breakdown = CostBreakdown {
            currency: "EUR".to_string(),
            tier: Tier::Gross,
            vat_rate: Some(dec!(19.00)),
            kinds: Vec::new(),
            backups_total: Decimal::ZERO,
            total: Decimal::ZERO,
        };
        let report = render_cost(&breakdown);
        assert_eq!(
            report.lines().next(),
            Some("Projected monthly cost (gross prices, EUR, VAT 19.00%)")
        );
        assert!(report.contains("Total: 0.00 EUR"));

        breakdown.vat_rate = None;
        assert_eq!(
            render_cost(&breakdown).lines().next(),
            Some("Projected monthly cost (gross prices, EUR)")
        );
    }

    #[test]
    fn test_rejection_line_carries_hint() {
        let line = render_outcome(&record(Outcome::Rejected {
            status: 403,
            message: Some("insufficient permissions".to_string()),
            hint: Some(WRITE_SCOPE_HINT),
        }));
        assert_eq!(
            line,
            "✗ web (12): rejected with HTTP 403: insufficient permissions (token lacks write scope)"
        );
    }

    #[test]
    fn test_submitted_line() {
        let line = render_outcome(&record(Outcome::Submitted {
            action: Action::new(77, 12, ActionStatus::Success),
            image_id: Some(501),
            timed_out: false,
        }));
        assert_eq!(line, "✓ web (12): action 77 success, image 501");
    }

    #[test]
    fn test_snapshot_report_has_one_line_per_server_plus_summary() {
        let report = render_snapshot(&[record(Outcome::DryRun), record(Outcome::DryRun)]);
        assert_eq!(report.lines().count(), 3);
        assert!(report.contains("2 dry run"));
    }
}
