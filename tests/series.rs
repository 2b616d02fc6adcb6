use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU8, Ordering},
    },
    time::Duration,
};

use asyncflow::{HttpPromise, Promise, PromiseExt, Response, series, series::step};

#[derive(Debug, Clone, PartialEq, Default)]
struct Named {
    name: String,
}

fn fetch(name: &str) -> HttpPromise<Named, String> {
    let name = name.to_string();
    HttpPromise::new(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(Response::ok(Named { name }))
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn series_threads_values() {
    let f1 = |n: i64| n + 3;
    let f2 = |n: i64| n * 2;
    let f3 = |n: i64| n - 1;

    let r = series(
        vec![
            step(move |n| Ok::<_, String>(f1(n))),
            step(move |n| Ok(f2(n))),
            step(move |n| Ok(f3(n))),
        ],
        4,
    )
    .await;

    assert_eq!(r, Ok(f3(f2(f1(4)))), "Result should equal f3(f2(f1(init)))");
}

#[tokio::test(flavor = "multi_thread")]
async fn series_each_step_sees_previous_value() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen1 = Arc::clone(&seen);
    let seen2 = Arc::clone(&seen);
    let seen3 = Arc::clone(&seen);

    let r = series(
        vec![
            step(move |named: Named| {
                seen1.lock().unwrap().push(named.name);
                fetch("one")
            }),
            step(move |named: Named| {
                seen2.lock().unwrap().push(named.name);
                Ok::<_, String>(Named {
                    name: "pure".into(),
                })
            }),
            step(move |named: Named| {
                seen3.lock().unwrap().push(named.name);
                fetch("two")
            }),
        ],
        Named {
            name: "initial".into(),
        },
    )
    .await;

    assert_eq!(
        r.map(|named| named.name),
        Ok("two".to_string()),
        "Chain should resolve with the last step's value"
    );
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["initial", "one", "pure"],
        "Each step should receive the previous step's value"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn series_runs_strictly_in_order() {
    let log = Arc::new(Mutex::new(String::new()));

    let steps = (1..=3u64).map(|i| {
        let log = Arc::clone(&log);
        move |acc: u64| {
            async move {
                log.lock().unwrap().push_str(&format!("start{i} "));
                // Earlier steps take longer; order must still hold.
                tokio::time::sleep(Duration::from_millis(60 / i)).await;
                log.lock().unwrap().push_str(&format!("end{i} "));
                Ok::<_, String>(acc + i)
            }
            .promise()
        }
    });

    let r = series(steps, 0).await;
    assert_eq!(r, Ok(6), "Values should accumulate");
    assert_eq!(
        *log.lock().unwrap(),
        "start1 end1 start2 end2 start3 end3 ",
        "A step should not start before the previous one settled"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn series_short_circuits_on_rejection() {
    let invoked = Arc::new(AtomicU8::new(0));
    let after_failure = Arc::clone(&invoked);

    let r = series(
        vec![
            step(|n: u32| Ok::<_, String>(n + 1)),
            step(|n| {
                async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Err(format!("step 2 failed at {n}"))
                }
                .promise()
            }),
            step(move |n| {
                after_failure.fetch_add(1, Ordering::Relaxed);
                Ok(n)
            }),
        ],
        0,
    )
    .await;

    assert_eq!(
        r,
        Err("step 2 failed at 1".to_string()),
        "Chain should reject with the step's reason"
    );
    assert_eq!(
        invoked.load(Ordering::Relaxed),
        0,
        "No step after the failing one should run"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn series_synchronous_error_short_circuits() {
    let invoked = Arc::new(AtomicU8::new(0));
    let counter = Arc::clone(&invoked);

    let r = series(
        vec![
            step(|_: u32| Err::<u32, _>("thrown".to_string())),
            step(move |n| {
                counter.fetch_add(1, Ordering::Relaxed);
                Promise::resolve(n)
            }),
        ],
        0,
    )
    .await;

    assert_eq!(r, Err("thrown".to_string()), "Err return should reject");
    assert_eq!(invoked.load(Ordering::Relaxed), 0, "Second step must not run");
}

#[tokio::test(flavor = "multi_thread")]
async fn series_empty_resolves_initial_value() {
    let steps: Vec<fn(&'static str) -> Promise<&'static str, String>> = Vec::new();
    let r = series(steps, "initial").await;
    assert_eq!(r, Ok("initial"), "No steps should resolve with initial value");
}

#[tokio::test(flavor = "multi_thread")]
async fn series_macro_starts_from_empty_string() {
    let r = series![
        |s: String| {
            assert_eq!(s, "", "First step should receive an empty string");
            Ok::<_, String>(s + "one")
        },
        |s: String| Promise::resolve(s + ",two"),
        |s: String| {
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(s + ",three")
            }
            .promise()
        },
    ]
    .await;

    assert_eq!(r, Ok("one,two,three".to_string()), "Steps should run in order");
}

#[tokio::test(flavor = "multi_thread")]
async fn series_macro_default_for_structs() {
    let r = series![
        |named: Named| {
            assert_eq!(named, Named::default(), "First step gets the default");
            fetch("one")
        },
        |named: Named| fetch(&format!("{}-two", named.name)),
    ]
    .await;

    assert_eq!(
        r,
        Ok(Named {
            name: "one-two".into()
        }),
        "Response payloads should be threaded"
    );
}
