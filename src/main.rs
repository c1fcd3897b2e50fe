use cashcard::domain::card::Card;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

/// Demo driver: one shared card, a burst of concurrent operations, every
/// outcome printed as it lands.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// PIN of the demo card
    #[arg(long, default_value_t = 123)]
    pin: u32,

    /// Amount credited before the concurrent batch
    #[arg(long, default_value_t = 1000.0)]
    initial_top_up: f64,

    /// Exclusive-access timeout in milliseconds
    #[arg(long, default_value_t = 1000)]
    lock_timeout_ms: u64,

    /// Emit one JSON object per outcome instead of text lines
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy)]
enum Op {
    Withdraw,
    TopUp,
}

#[derive(Serialize)]
struct Outcome {
    op: &'static str,
    amount: Option<f64>,
    balance: Option<f64>,
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let card = Arc::new(Card::with_lock_timeout(
        cli.pin,
        Duration::from_millis(cli.lock_timeout_ms),
    ));
    let wrong_pin = cli.pin.wrapping_add(1);

    // Seed the card before the concurrent batch.
    report(&run(&card, Op::TopUp, cli.pin, cli.initial_top_up).await, cli.json)?;

    // Net effect of the valid operations: -100 +500 -400 = 0.
    let batch = [
        (Op::Withdraw, cli.pin, 100.0),
        (Op::Withdraw, wrong_pin, 300.0),
        (Op::TopUp, cli.pin, 500.0),
        (Op::Withdraw, cli.pin, 400.0),
        (Op::TopUp, wrong_pin, 500.0),
    ];

    let mut tasks = JoinSet::new();
    for (op, pin, amount) in batch {
        let card = Arc::clone(&card);
        tasks.spawn(async move { run(&card, op, pin, amount).await });
    }
    while let Some(outcome) = tasks.join_next().await {
        report(&outcome.into_diagnostic()?, cli.json)?;
    }

    let (balance, error) = match card.balance(cli.pin).await {
        Ok(balance) => (Some(balance.value()), None),
        Err(e) => (None, Some(e.to_string())),
    };
    let summary = Outcome {
        op: "balance",
        amount: None,
        balance,
        error,
    };
    if cli.json {
        println!("{}", serde_json::to_string(&summary).into_diagnostic()?);
    } else {
        match (summary.balance, summary.error) {
            (Some(balance), _) => println!(
                "Card balance: actual={}, expected={}",
                balance, cli.initial_top_up
            ),
            (_, Some(error)) => println!("Balance check failed due to {}", error),
            _ => unreachable!("an outcome carries either a balance or an error"),
        }
    }

    Ok(())
}

async fn run(card: &Card, op: Op, pin: u32, amount: f64) -> Outcome {
    let result = match op {
        Op::Withdraw => card.withdraw(pin, amount).await,
        Op::TopUp => card.top_up(pin, amount).await,
    };
    let (balance, error) = match result {
        Ok(balance) => (Some(balance.value()), None),
        Err(e) => (None, Some(e.to_string())),
    };
    Outcome {
        op: match op {
            Op::Withdraw => "withdraw",
            Op::TopUp => "topup",
        },
        amount: Some(amount),
        balance,
        error,
    }
}

/// Prints a single outcome, error messages verbatim.
fn report(outcome: &Outcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(outcome).into_diagnostic()?);
        return Ok(());
    }

    let (done, failed) = if outcome.op == "withdraw" {
        ("Withdrawn", "Withdrawal")
    } else {
        ("Topup", "Topup")
    };
    match (outcome.amount, outcome.balance, &outcome.error) {
        (Some(amount), Some(balance), _) => {
            println!("{} amount={}, card balance={}", done, amount, balance);
        }
        (_, _, Some(error)) => println!("{} failed due to {}", failed, error),
        _ => unreachable!("an outcome carries either a balance or an error"),
    }
    Ok(())
}
