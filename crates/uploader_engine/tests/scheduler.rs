use std::sync::mpsc;
use std::time::Duration;

use uploader_engine::PollScheduler;

fn scheduler() -> PollScheduler<u64> {
    PollScheduler::new(tokio::runtime::Handle::current())
}

#[tokio::test(start_paused = true)]
async fn timer_fires_after_delay() {
    let scheduler = scheduler();
    let (tx, rx) = mpsc::channel();
    scheduler.schedule(1, Duration::from_secs(5), move || {
        let _ = tx.send("tick");
    });
    assert!(scheduler.is_pending(1));

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(rx.try_recv().is_err());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(rx.try_recv(), Ok("tick"));
    assert!(!scheduler.is_pending(1));
}

#[tokio::test(start_paused = true)]
async fn cancelled_timer_never_fires() {
    let scheduler = scheduler();
    let (tx, rx) = mpsc::channel::<&str>();
    scheduler.schedule(7, Duration::from_secs(5), move || {
        let _ = tx.send("tick");
    });

    assert!(scheduler.cancel(7));
    assert!(!scheduler.cancel(7));
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(scheduler.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn rescheduling_replaces_the_pending_timer() {
    let scheduler = scheduler();
    let (tx, rx) = mpsc::channel();
    let first = tx.clone();
    scheduler.schedule(3, Duration::from_secs(5), move || {
        let _ = first.send("first");
    });
    scheduler.schedule(3, Duration::from_secs(10), move || {
        let _ = tx.send("second");
    });
    assert_eq!(scheduler.pending_count(), 1);

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(rx.try_recv().is_err());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(rx.try_recv(), Ok("second"));
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn keys_are_independent() {
    let scheduler = scheduler();
    let (tx, rx) = mpsc::channel();
    let other = tx.clone();
    scheduler.schedule(1, Duration::from_secs(5), move || {
        let _ = tx.send(1);
    });
    scheduler.schedule(2, Duration::from_secs(5), move || {
        let _ = other.send(2);
    });
    scheduler.cancel(1);

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(rx.try_recv(), Ok(2));
    assert!(rx.try_recv().is_err());
}
