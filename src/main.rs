//! otcbook - Binary Entry Point
//!
//! Drives a small demo scenario against an in-memory ledger: two makers
//! rest offers, a taker crosses them, and the oracle answers a TWAP query.

use otcbook::types::price::{from_fixed, to_fixed, SCALE};
use otcbook::{Market, MemoryLedger, Pair, SingleAdmin};

const ADMIN: u64 = 1;
const MAKER: u64 = 2;
const TAKER: u64 = 3;
const MARKET_ACCOUNT: u64 = 100;

const BASE: u64 = 10; // asset being sold by makers
const QUOTE: u64 = 20; // asset paid by takers

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "otcbook=debug".into()),
        )
        .init();

    println!("===========================================");
    println!("  otcbook - matching market demo");
    println!("===========================================");
    println!();

    let mut ledger = MemoryLedger::new();
    ledger.deposit(BASE, MAKER, 100 * SCALE);
    ledger.deposit(QUOTE, TAKER, 1_000 * SCALE);

    let mut market = Market::new(ledger, SingleAdmin::new(ADMIN), MARKET_ACCOUNT);
    market.advance_to(1_000, 1);
    market
        .set_fee_rate(ADMIN, 30)
        .expect("admin sets the fee rate");

    // Two makers rest offers selling BASE for QUOTE at 2.0 and 2.1
    println!("Resting maker offers...");
    let a = market
        .offer_at(MAKER, 10 * SCALE, BASE, 20 * SCALE, QUOTE, None)
        .expect("first offer rests")
        .expect("empty book leaves a residual");
    let b = market
        .offer_at(MAKER, 10 * SCALE, BASE, 21 * SCALE, QUOTE, None)
        .expect("second offer rests")
        .expect("no cross at a worse price");
    println!("  offer {} asks {}", a, from_fixed(2 * SCALE));
    println!("  offer {} asks {}", b, from_fixed(to_fixed("2.1").unwrap()));
    println!();

    // A taker crosses both: buys 15 BASE paying up to 2.2 each
    market.advance_to(1_040, 2);
    println!("Taker crossing with 15 BASE at limit 2.2...");
    let residual = market
        .offer_at(TAKER, 33 * SCALE, QUOTE, 15 * SCALE, BASE, None)
        .expect("taker offer matches");
    println!("  residual: {:?}", residual);

    let pair = Pair::new(BASE, QUOTE);
    println!("  best remaining {:?}: {:?}", pair, market.best_offer(pair));
    println!(
        "  taker BASE balance: {}",
        from_fixed(market.ledger().balance_of(BASE, TAKER))
    );
    println!();

    // A later direct take gives the oracle a second sample
    market.advance_to(1_100, 3);
    market
        .buy(TAKER, b, 5 * SCALE)
        .expect("taker clears the remaining offer");

    market.advance_to(1_140, 4);
    match market.twap(pair, 80) {
        Ok(price) => println!("TWAP over last 80s: {}", from_fixed(price)),
        Err(e) => println!("TWAP unavailable: {}", e),
    }

    println!();
    println!("Audit log:");
    for event in market.drain_events() {
        println!("  {}", serde_json::to_string(&event).expect("events serialize"));
    }

    println!();
    println!("State root: {}", hex::encode(market.book().state_root()));
}
