use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use asyncflow::{PromiseExt, parallel, polling};
use macro_rules_attribute::apply;
use smol::Timer;
use smol_macros::{Executor, test};

#[apply(test!)]
async fn parallel_on_smol(_ex: &Executor<'_>) {
    let r = parallel((1..=3u64).map(|i| {
        move || {
            async move {
                Timer::after(Duration::from_millis(40 / i)).await;
                Ok::<_, String>(i)
            }
            .promise()
        }
    }))
    .await;
    assert_eq!(r, Ok(vec![1, 2, 3]), "Order should not depend on the executor");
}

#[apply(test!)]
async fn polling_on_smol(ex: &Executor<'_>) {
    let count = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&count);

    let handle = polling(
        move |_: &()| {
            counter.fetch_add(1, Ordering::Relaxed);
        },
        Duration::from_millis(30),
        (),
    );
    let task = ex.spawn(handle.start());

    Timer::after(Duration::from_millis(100)).await;
    handle.stop();
    task.await;

    let times = handle.times();
    assert!(times >= 2, "Polling should run on smol, got {times}");
    assert_eq!(
        count.load(Ordering::Relaxed) as usize,
        times,
        "Every invocation should be counted"
    );
}
