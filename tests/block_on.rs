use std::time::{Duration, Instant};

use asyncflow::{
    PoolError, Promise, PromiseExt, async_each, series,
    pool::init_pool,
    timing::{Sleep, sleep},
};
use futures_lite::future::{block_on, poll_once};

#[test]
fn series_with_block_on() {
    let r = block_on(series![
        |s: String| Ok::<_, String>(s + "a"),
        |s: String| async move {
            sleep(Duration::from_millis(10)).await;
            Ok(s + "b")
        }
        .promise(),
    ]);
    assert_eq!(r, Ok("ab".to_string()), "Series should run under block_on");
}

#[test]
fn async_each_with_block_on() {
    let r = block_on(async_each(&[30u64, 10, 20], |&millis, _| {
        async move {
            sleep(Duration::from_millis(millis)).await;
            Ok::<_, String>(millis)
        }
        .promise()
    }));
    assert_eq!(r, Ok(vec![30, 10, 20]), "Results should follow input order");
}

#[test]
fn sleep_waits_for_deadline() {
    let started = Instant::now();
    block_on(sleep(Duration::from_millis(50)));
    assert!(
        started.elapsed() >= Duration::from_millis(50),
        "Sleep should not complete early"
    );
}

#[test]
fn sleep_until_past_instant_is_ready() {
    let timer = Sleep::until(Instant::now());
    assert!(timer.is_elapsed(), "Deadline already passed");
    assert_eq!(
        block_on(poll_once(timer)),
        Some(()),
        "Elapsed timer should complete on first poll"
    );
}

#[test]
fn dropped_sleeps_do_not_hold_back_others() {
    for _ in 0..100 {
        let mut long = sleep(Duration::from_secs(5));
        assert_eq!(
            block_on(poll_once(&mut long)),
            None,
            "Long timer should be pending"
        );
        drop(long);
    }

    let started = Instant::now();
    block_on(sleep(Duration::from_millis(20)));
    assert!(
        started.elapsed() < Duration::from_millis(500),
        "Short timer should fire on time, took {:?}",
        started.elapsed()
    );
}

#[test]
fn delay_defers_first_poll() {
    let started = Instant::now();
    let r = block_on(
        Promise::<_, String>::resolve(1).delay(Duration::from_millis(40)),
    );
    assert_eq!(r, Ok(1), "Inner future should resolve after the delay");
    assert!(
        started.elapsed() >= Duration::from_millis(40),
        "Delay should hold the inner future back"
    );
}

#[test]
fn pool_initializes_once() {
    assert!(init_pool(2).is_ok(), "First initialization should succeed");
    assert!(
        matches!(init_pool(2), Err(PoolError::AlreadyInitialized)),
        "Second initialization should be refused"
    );
}
