use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Runs `operation` to completion and reports how long it took.
///
/// The clock starts right before the future is first polled and stops as
/// soon as it resolves, whether it succeeded or not. The output is passed
/// through untouched.
pub async fn timed<F>(operation: F) -> (F::Output, Duration)
where
    F: Future,
{
    let start = Instant::now();
    let output = operation.await;
    (output, start.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn measures_elapsed_time() {
        let (value, elapsed) = timed(async {
            tokio::time::sleep(Duration::from_millis(250)).await;
            7
        })
        .await;

        assert_eq!(value, 7);
        assert!(elapsed >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn failure_is_still_timed() {
        let (result, elapsed): (Result<(), &str>, _) = timed(async { Err("refused") }).await;

        assert_eq!(result, Err("refused"));
        assert!(elapsed >= Duration::ZERO);
    }
}
