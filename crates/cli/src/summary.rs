//! Colored terminal summaries of a processed bundle.

use colored::{ColoredString, Colorize};
use eots_core::{ProcessedDataBundle, StrikeMetrics};

const TOP_STRIKES: usize = 5;

fn signed(value: f64, text: String) -> ColoredString {
    if value > 0.0 {
        text.green()
    } else if value < 0.0 {
        text.red()
    } else {
        text.normal()
    }
}

fn opt(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{v:.precision$}"))
        .unwrap_or_else(|| "-".to_string())
}

fn risk(value: f64) -> ColoredString {
    let text = format!("{value:.2}");
    if value > 0.7 {
        text.black().on_red()
    } else if value > 0.4 {
        text.black().on_yellow()
    } else {
        text.normal()
    }
}

pub fn print_summary(bundle: &ProcessedDataBundle) {
    let und = &bundle.underlying_data_enriched;
    let score = und.elite_impact_score_und.unwrap_or(0.0);

    println!();
    println!("{}", "=".repeat(72));
    println!(
        "{} {} @ {:.2}  ({})",
        "EOTS".bold(),
        und.symbol().bold(),
        und.price(),
        und.raw.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("{}", "=".repeat(72));

    println!(
        "  Impact score     : {}",
        signed(score, format!("{score:+.1}")).bold()
    );
    println!("  Confidence       : {:.2}", und.confidence);
    println!("  Transition risk  : {}", risk(und.transition_risk));
    println!(
        "  Regime           : {} / elite {}",
        und.current_market_regime
            .map_or_else(|| "-".to_string(), |r| r.to_string()),
        und.market_regime_elite
            .map_or_else(|| "-".to_string(), |r| r.to_string())
    );
    println!(
        "  Flow / volatility: {} / {}",
        und.flow_type_elite
            .map_or_else(|| "-".to_string(), |f| f.to_string()),
        und.volatility_regime_elite
            .map_or_else(|| "-".to_string(), |v| v.to_string())
    );
    println!(
        "  Flow z-scores    : VAPI-FA {}  DWFD {}  TW-LAF {}",
        opt(und.vapi_fa_z_score_und, 2),
        opt(und.dwfd_z_score_und, 2),
        opt(und.tw_laf_z_score_und, 2)
    );
    println!(
        "  GIB / A-MSPI     : {} / {}",
        opt(und.gib_oi_based_und, 0),
        opt(und.a_mspi_und_summary_score, 3)
    );
    println!(
        "  ATR / HV / ATM IV: {} / {} / {}",
        opt(und.atr_und, 2),
        opt(und.hist_vol_20d, 3),
        opt(und.impl_vol_atm, 3)
    );
    if let Some(strike) = und.max_gamma_strike {
        println!("  Max gamma strike : {strike}");
    }

    print_top_strikes(&bundle.strike_level_data_with_metrics);

    if !bundle.errors.is_empty() {
        println!();
        println!("{}", "STAGE ERRORS:".yellow().bold());
        for error in &bundle.errors {
            println!("  {}", error.yellow());
        }
    }
    println!();
}

fn print_top_strikes(strikes: &[StrikeMetrics]) {
    let mut ranked: Vec<&StrikeMetrics> = strikes
        .iter()
        .filter(|s| s.elite_impact_score.is_some())
        .collect();
    if ranked.is_empty() {
        return;
    }
    ranked.sort_by(|a, b| {
        let a = a.elite_impact_score.unwrap_or(0.0).abs();
        let b = b.elite_impact_score.unwrap_or(0.0).abs();
        b.total_cmp(&a)
    });

    println!();
    println!(
        "  {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Strike", "Impact", "A-MSPI", "SGDHP", "Magnet"
    );
    println!("  {}", "-".repeat(56));
    for row in ranked.into_iter().take(TOP_STRIKES) {
        let impact = row.elite_impact_score.unwrap_or(0.0);
        println!(
            "  {:>10} {:>10} {:>10.3} {:>10.3} {:>10}",
            row.strike.to_string(),
            signed(impact, format!("{impact:+.1}")),
            row.a_mspi_strike,
            row.sgdhp_score_strike,
            opt(row.strike_magnetism_index, 3)
        );
    }
}

/// One line per cycle for `run`.
pub fn print_cycle_line(cycle: u64, bundle: &ProcessedDataBundle) {
    let und = &bundle.underlying_data_enriched;
    let score = und.elite_impact_score_und.unwrap_or(0.0);
    let errors = if bundle.errors.is_empty() {
        String::new()
    } else {
        format!("  {} stage error(s)", bundle.errors.len())
            .yellow()
            .to_string()
    };
    println!(
        "#{cycle:<4} {} {:.2}  impact {}  conf {:.2}  risk {}{errors}",
        und.symbol(),
        und.price(),
        signed(score, format!("{score:+.1}")),
        und.confidence,
        risk(und.transition_risk)
    );
}
