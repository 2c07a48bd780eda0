//! Funding-rate arbitrage scanning pipeline.
//!
//! One cycle runs strictly left to right:
//!
//! 1. [`CooldownGate`] purges expired entries and drops cooling symbols
//! 2. [`FetchOrchestrator`] fetches quotes in paced batches
//! 3. [`join_quotes`] builds one [`SymbolRow`] per symbol
//! 4. [`detect`] picks the widest qualifying pair per symbol
//! 5. [`AlertRouter`] commits the cooldown and sends the alert
//!
//! [`Scanner`] owns the cycle and the outer loop.

pub mod cooldown;
pub mod detector;
pub mod format;
pub mod join;
pub mod orchestrator;
pub mod router;
pub mod scanner;

pub use cooldown::{filter_universe, CooldownGate};
pub use detector::{
    best_candidate, detect, price_divergence_pct, spread, SpreadCandidate, MAX_DIVERGENCE_PCT,
};
pub use format::{render_alert, AlertView, VenueNote, RISK_MARKER};
pub use join::{join_quotes, JoinPolicy, SymbolRow};
pub use orchestrator::{FetchOrchestrator, FetchOutcome, FetchReport};
pub use router::{AlertRouter, DispatchOutcome};
pub use scanner::{Collaborators, CycleSummary, Scanner, ScannerError, UniverseSource};
