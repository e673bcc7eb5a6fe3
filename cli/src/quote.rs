//! Offline swap quotes against arbitrary reserves

use anyhow::{bail, Context, Result};
use colored::Colorize;
use cpamm_math::{format_units, mul_div, parse_units, quote_output, spot_price, DEFAULT_FEE, SCALE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub amount_in: u128,
    pub amount_out: u128,
    pub fee: u128,
    pub spot_price: u128,
    pub effective_price: u128,
}

/// Price `amount_in` against the given reserves at the default fee
pub fn compute_quote(amount_in: u128, reserve_in: u128, reserve_out: u128) -> Result<Quote> {
    if reserve_in == 0 || reserve_out == 0 {
        bail!("Reserves must be non-zero to quote");
    }
    let amount_out = quote_output(amount_in, reserve_in, reserve_out, DEFAULT_FEE)
        .context("Failed to compute swap output")?;
    let fee = mul_div(amount_in, DEFAULT_FEE.numerator, DEFAULT_FEE.denominator)?;
    let spot = spot_price(reserve_in, reserve_out)?;
    let effective = mul_div(amount_out, SCALE, amount_in)?;

    Ok(Quote {
        amount_in,
        amount_out,
        fee,
        spot_price: spot,
        effective_price: effective,
    })
}

pub fn show_quote(amount_in: &str, reserve_in: &str, reserve_out: &str) -> Result<()> {
    let amount_in = parse_units(amount_in).with_context(|| format!("Invalid amount: {}", amount_in))?;
    let reserve_in =
        parse_units(reserve_in).with_context(|| format!("Invalid input reserve: {}", reserve_in))?;
    let reserve_out =
        parse_units(reserve_out).with_context(|| format!("Invalid output reserve: {}", reserve_out))?;

    let quote = compute_quote(amount_in, reserve_in, reserve_out)?;

    println!("{}", "=== Swap Quote ===".bright_green().bold());
    println!("{} {}", "Amount in:".bright_cyan(), format_units(quote.amount_in));
    println!("{} {}", "Amount out:".bright_cyan(), format_units(quote.amount_out));
    println!(
        "{} {} ({}/{})",
        "Fee:".bright_cyan(),
        format_units(quote.fee),
        DEFAULT_FEE.numerator,
        DEFAULT_FEE.denominator
    );
    println!("{} {}", "Spot price:".bright_cyan(), format_units(quote.spot_price));
    println!("{} {}", "Effective price:".bright_cyan(), format_units(quote.effective_price));
    if quote.amount_out == 0 {
        println!("\n{}", "Input too small: output floors to zero".yellow());
    }
    Ok(())
}
