//! Static, per-transaction scoring that needs no history.

use payloads::{Decision, Transaction};
use rust_decimal::Decimal;

use super::clamp_score;

/// Device substrings associated with rooted/jailbroken phones, known
/// pentesting distros, or emulators used to mass-produce fraudulent sessions.
const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "kali",
    "parrot os",
    "blackarch",
    "metasploit",
    "root",
    "jailbreak",
    "magisk",
    "cydia",
    "frida",
    "xposed",
    "emulator",
    "nox",
    "bluestacks",
];

const EMULATOR_KEYWORDS: &[&str] = &["emulator", "nox", "bluestacks"];

const MAINSTREAM_BROWSERS: &[&str] =
    &["chrome", "safari", "firefox", "edge", "opera"];

pub struct RuleOutcome {
    pub decision: Decision,
    pub score: i32,
    pub reasons: Vec<String>,
}

/// Score a transaction on its own static attributes: amount, self-transfer,
/// and device fingerprint.
pub fn rule_check(tx: &Transaction) -> RuleOutcome {
    if tx.amount <= Decimal::ZERO {
        return RuleOutcome {
            decision: Decision::Block,
            score: 100,
            reasons: vec!["Non-positive amount".to_string()],
        };
    }

    let mut score = 0i32;
    let mut reasons = Vec::new();

    if tx.amount > Decimal::from(50_000) {
        score += 40;
        reasons.push("High Transfer Amount".to_string());
    }
    if tx.amount > Decimal::from(200_000) {
        score += 50;
        reasons.push("Very High Transfer Amount".to_string());
    }

    if tx.from_account == tx.to_account {
        score += 30;
        reasons.push("Self-Transfer".to_string());
    }

    if let Some((delta, reason)) = device_score(&tx.device_id) {
        score += delta;
        reasons.push(reason);
    }

    let score = clamp_score(score);
    let decision = if score >= 80 {
        Decision::Block
    } else if score >= 50 {
        Decision::Review
    } else {
        Decision::Allow
    };

    RuleOutcome {
        decision,
        score,
        reasons,
    }
}

fn device_score(device_id: &str) -> Option<(i32, String)> {
    let lowered = device_id.to_lowercase();
    let keyword = SUSPICIOUS_KEYWORDS.iter().find(|kw| lowered.contains(*kw))?;

    let looks_like_mainstream_browser =
        MAINSTREAM_BROWSERS.iter().any(|b| lowered.contains(b));

    if looks_like_mainstream_browser && (*keyword == "root" || *keyword == "admin") {
        Some((10, "Device Indicator (dampened false positive)".to_string()))
    } else if EMULATOR_KEYWORDS.contains(keyword) {
        Some((30, format!("Suspicious Device Indicator: {keyword}")))
    } else {
        Some((90, format!("Suspicious Device Indicator: {keyword}")))
    }
}
