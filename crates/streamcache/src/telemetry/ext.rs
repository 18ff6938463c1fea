// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Timing helpers.

use std::time::Duration;

use tick::Clock;

/// Result of a timed async operation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TimedResult<R> {
    pub result: R,
    pub duration: Duration,
}

pub(crate) trait ClockExt {
    /// Times an async operation and returns both the result and elapsed duration.
    fn timed_async<F, R>(&self, f: F) -> impl Future<Output = TimedResult<R>> + Send
    where
        F: Future<Output = R> + Send;
}

impl ClockExt for Clock {
    async fn timed_async<F, R>(&self, f: F) -> TimedResult<R>
    where
        F: Future<Output = R> + Send,
    {
        let stopwatch = self.stopwatch();
        let result = f.await;
        TimedResult {
            result,
            duration: stopwatch.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_async_measures_controlled_time() {
        futures::executor::block_on(async {
            let control = tick::ClockControl::new();
            let clock = control.to_clock();

            let timed = clock
                .timed_async(async {
                    control.advance(Duration::from_millis(150));
                    7
                })
                .await;

            assert_eq!(timed.result, 7);
            assert_eq!(timed.duration, Duration::from_millis(150));
        });
    }
}
