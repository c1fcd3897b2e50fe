use cashcard::domain::card::{Balance, Card};
use cashcard::error::CardError;
use std::sync::Arc;
use tokio::task::JoinSet;

const PIN: u32 = 123;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals() {
    let card = Arc::new(Card::new(PIN));
    card.top_up(PIN, 10_000.0).await.unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..99 {
        let card = Arc::clone(&card);
        tasks.spawn(async move { card.withdraw(PIN, 100.0).await });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    assert_eq!(card.balance(PIN).await.unwrap(), Balance(100.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_top_ups() {
    let card = Arc::new(Card::new(PIN));
    card.top_up(PIN, 100.0).await.unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..99 {
        let card = Arc::clone(&card);
        tasks.spawn(async move { card.top_up(PIN, 100.0).await });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    assert_eq!(card.balance(PIN).await.unwrap(), Balance(10_000.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdraw_top_up_pairs() {
    let card = Arc::new(Card::new(PIN));
    card.top_up(PIN, 10_000.0).await.unwrap();

    // Equal-amount pairs must cancel out regardless of interleaving.
    let mut tasks = JoinSet::new();
    for _ in 0..99 {
        let card = Arc::clone(&card);
        tasks.spawn(async move {
            card.withdraw(PIN, 100.0).await?;
            card.top_up(PIN, 100.0).await?;
            Ok::<(), CardError>(())
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    assert_eq!(card.balance(PIN).await.unwrap(), Balance(10_000.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_invalid_pin_calls_do_not_disturb_concurrent_traffic() {
    let card = Arc::new(Card::new(PIN));
    card.top_up(PIN, 1_000.0).await.unwrap();

    let mut tasks = JoinSet::new();
    for i in 0..50 {
        let card = Arc::clone(&card);
        tasks.spawn(async move {
            if i % 2 == 0 {
                card.withdraw(PIN, 10.0).await.map(Some)
            } else {
                // Wrong PIN: must fail without touching the balance.
                match card.withdraw(111, 10.0).await {
                    Err(CardError::InvalidPin) => Ok(None),
                    other => panic!("expected InvalidPin, got {:?}", other),
                }
            }
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    // Only the 25 valid withdrawals applied.
    assert_eq!(card.balance(PIN).await.unwrap(), Balance(750.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_balance_reads_never_mutate() {
    let card = Arc::new(Card::new(PIN));
    card.top_up(PIN, 500.0).await.unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..20 {
        let card = Arc::clone(&card);
        tasks.spawn(async move { card.top_up(PIN, 25.0).await });
    }
    for _ in 0..50 {
        let card = Arc::clone(&card);
        tasks.spawn(async move { card.balance(PIN).await });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    assert_eq!(card.balance(PIN).await.unwrap(), Balance(1_000.0));
}
