//! Deadline timing for the press/hold classifier, driven by paused tokio time.

use std::sync::Arc;
use std::time::Duration;

use savetier_gesture::{
    DEFAULT_LONG_PRESS, GestureClassifier, GestureResult, GestureState, ReleaseOutcome,
};
use savetier_test_support::{RecordingObserver, Resolution};
use tokio::time::advance;

const TICK: Duration = Duration::from_millis(1);

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

type Payload = &'static str;

fn classifier() -> GestureResult<(GestureClassifier<Payload>, Arc<RecordingObserver<Payload>>)> {
    let observer = Arc::new(RecordingObserver::<Payload>::default());
    let classifier = GestureClassifier::<Payload>::new(DEFAULT_LONG_PRESS, observer.clone())?;
    Ok((classifier, observer))
}

#[tokio::test(start_paused = true)]
async fn release_before_deadline_is_short_exactly_once() -> GestureResult<()> {
    let (classifier, observer) = classifier()?;

    classifier.on_press_down()?;
    advance(DEFAULT_LONG_PRESS - TICK).await;
    assert_eq!(classifier.on_release("payload"), ReleaseOutcome::Short);

    advance(Duration::from_secs(10)).await;
    settle().await;

    assert_eq!(observer.resolutions(), vec![Resolution::Short("payload")]);
    assert_eq!(classifier.state(), GestureState::ResolvedShort);
    assert!(!classifier.is_pressed());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn hold_past_deadline_is_long_and_late_release_is_ignored() -> GestureResult<()> {
    let (classifier, observer) = classifier()?;

    classifier.on_press_down()?;
    advance(DEFAULT_LONG_PRESS).await;
    settle().await;
    assert_eq!(observer.resolutions(), vec![Resolution::Long]);
    assert_eq!(classifier.state(), GestureState::ResolvedLong);

    advance(TICK).await;
    assert_eq!(classifier.on_release("late"), ReleaseOutcome::IgnoredAfterLong);
    settle().await;

    assert_eq!(observer.short_count(), 0);
    assert_eq!(observer.long_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn release_at_deadline_before_timer_runs_is_long() -> GestureResult<()> {
    let (classifier, observer) = classifier()?;

    classifier.on_press_down()?;
    advance(DEFAULT_LONG_PRESS + TICK).await;
    // No settle: the release may win the race against the timer task.
    let outcome = classifier.on_release("late");
    assert!(matches!(
        outcome,
        ReleaseOutcome::LongAtRelease | ReleaseOutcome::IgnoredAfterLong
    ));
    settle().await;

    assert_eq!(observer.resolutions(), vec![Resolution::Long]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn pointer_leave_is_idempotent_and_keeps_timer() -> GestureResult<()> {
    let (classifier, observer) = classifier()?;

    classifier.on_press_down()?;
    advance(Duration::from_millis(500)).await;
    for _ in 0..5 {
        classifier.on_pointer_leave();
    }
    assert_eq!(classifier.state(), GestureState::Armed);
    assert!(!classifier.is_pressed());
    assert_eq!(observer.resolutions(), Vec::new());

    advance(DEFAULT_LONG_PRESS).await;
    settle().await;
    assert_eq!(observer.resolutions(), vec![Resolution::Long]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn sessions_resolve_independently() -> GestureResult<()> {
    let (classifier, observer) = classifier()?;

    classifier.on_press_down()?;
    advance(Duration::from_millis(200)).await;
    assert_eq!(classifier.on_release("first"), ReleaseOutcome::Short);

    classifier.on_press_down()?;
    advance(DEFAULT_LONG_PRESS).await;
    settle().await;
    assert_eq!(classifier.on_release("second"), ReleaseOutcome::IgnoredAfterLong);

    assert_eq!(classifier.on_release("stray"), ReleaseOutcome::IgnoredIdle);
    assert_eq!(
        observer.resolutions(),
        vec![Resolution::Short("first"), Resolution::Long]
    );
    Ok(())
}
