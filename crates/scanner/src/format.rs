//! HTML rendering of alert messages.

use crate::detector::SpreadCandidate;
use funding_arb_core::{Exchange, HistoryPoint, Symbol};
use std::fmt::Write;

pub const RISK_MARKER: &str = "🚩 high risk";

/// Per-venue annotations shown next to an exchange name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VenueNote {
    pub exchange: Exchange,
    pub risky: bool,
    pub withdrawable: bool,
}

/// Everything an alert message shows.
#[derive(Debug, Clone)]
pub struct AlertView<'a> {
    pub candidate: &'a SpreadCandidate,
    pub venue_a: VenueNote,
    pub venue_b: VenueNote,
    /// Fetched history per exchange; exchanges whose fetch failed are absent.
    pub histories: Vec<(Exchange, Vec<HistoryPoint>)>,
}

fn venue_link(note: VenueNote, symbol: &Symbol) -> String {
    let mut link = format!(
        r#"<a href="{}">{}</a>"#,
        note.exchange.trade_url(symbol),
        note.exchange
    );
    if note.risky {
        link.push_str(" - ");
        link.push_str(RISK_MARKER);
    }
    link
}

fn withdrawal_mark(withdrawable: bool) -> &'static str {
    if withdrawable {
        "✅"
    } else {
        "❌"
    }
}

/// Renders the alert for Telegram's HTML parse mode.
#[must_use]
pub fn render_alert(view: &AlertView<'_>) -> String {
    let c = view.candidate;
    let (a, b) = (c.exchange_a, c.exchange_b);
    let mut out = String::new();

    // writing into a String cannot fail
    let _ = write!(
        out,
        "💲{base}/USDT\n\n\
         📊 <b>Exchanges:</b> {link_a} ↔️ {link_b}\n\n\
         📈 <b>Funding:</b>\n\n\
         \x20 {a}: {rate_a:.4}%\n\
         \x20 {b}: {rate_b:.4}%\n\n\
         <b>Spread</b>: {spread:.5}\n\n\
         💰 <b>Price:</b>\n\n\
         \x20 {a}: ({price_a:.5}$)\n\
         \x20 {b}: ({price_b:.5}$)\n\n\
         ⚖ <b>Price divergence:</b> {divergence:.2}%\n\n\
         🏦 <b>Withdrawals:</b> {a} {wa} | {b} {wb}\n\n\
         🕰 <b>Funding history:</b>\n",
        base = c.symbol.base(),
        link_a = venue_link(view.venue_a, &c.symbol),
        link_b = venue_link(view.venue_b, &c.symbol),
        rate_a = c.rate_a,
        rate_b = c.rate_b,
        spread = c.spread,
        price_a = c.price_a,
        price_b = c.price_b,
        divergence = c.price_divergence_pct,
        wa = withdrawal_mark(view.venue_a.withdrawable),
        wb = withdrawal_mark(view.venue_b.withdrawable),
    );

    for (exchange, points) in &view.histories {
        let _ = write!(out, "\n{exchange}:\n\n");
        for point in HistoryPoint::newest_first(points.clone(), points.len()) {
            let _ = writeln!(
                out,
                "{:.4}% ({})",
                point.funding_rate_pct,
                point.settled_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }

    out
}
