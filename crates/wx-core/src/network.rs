//! Network association with a bounded retry budget

use core::fmt::Debug;

use embedded_hal_async::delay::DelayNs;
use log::{error, info};

use crate::app_state::{StationError, short_message};

/// A network interface that can be asked to associate and polled for the result.
pub trait NetworkLink {
    type Error: Debug;

    /// Issues the association request without waiting for it to complete.
    fn begin_join(&mut self) -> impl Future<Output = Result<(), Self::Error>>;

    fn is_joined(&mut self) -> bool;
}

/// Starts a join and polls for it `attempts` times, `retry_interval_ms` apart.
///
/// Gives up with [`StationError::Wifi`] if the link is still down after the
/// last attempt.
pub async fn join_with_retry<L: NetworkLink, D: DelayNs>(
    link: &mut L,
    delay: &mut D,
    attempts: u8,
    retry_interval_ms: u32,
) -> Result<(), StationError> {
    link.begin_join().await.map_err(|e| {
        error!("Failed to start network join: {:?}", e);
        StationError::Wifi(short_message(format_args!("join request rejected: {:?}", e)))
    })?;

    for attempt in 0..attempts {
        if link.is_joined() {
            break;
        }
        info!("Waiting for connection... ({}/{})", attempt + 1, attempts);
        delay.delay_ms(retry_interval_ms).await;
    }

    if link.is_joined() {
        info!("Network joined");
        Ok(())
    } else {
        error!("Network not joined after {} attempts", attempts);
        Err(StationError::Wifi(short_message(format_args!(
            "not joined after {} attempts",
            attempts
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    /// Reports joined after `joins_after` polls.
    struct FakeLink {
        polls: u32,
        joins_after: Option<u32>,
        reject: bool,
    }

    impl NetworkLink for FakeLink {
        type Error = &'static str;

        async fn begin_join(&mut self) -> Result<(), Self::Error> {
            if self.reject { Err("radio off") } else { Ok(()) }
        }

        fn is_joined(&mut self) -> bool {
            self.polls += 1;
            self.joins_after.is_some_and(|after| self.polls > after)
        }
    }

    #[derive(Default)]
    struct CountingDelay {
        total_ms: u32,
    }

    impl DelayNs for CountingDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.total_ms += ns / 1_000_000;
        }

        async fn delay_ms(&mut self, ms: u32) {
            self.total_ms += ms;
        }
    }

    #[test]
    fn joins_once_link_comes_up() {
        let mut link = FakeLink {
            polls: 0,
            joins_after: Some(3),
            reject: false,
        };
        let mut delay = CountingDelay::default();

        assert!(block_on(join_with_retry(&mut link, &mut delay, 10, 1000)).is_ok());
        assert_eq!(delay.total_ms, 3000);
    }

    #[test]
    fn gives_up_after_attempt_budget() {
        let mut link = FakeLink {
            polls: 0,
            joins_after: None,
            reject: false,
        };
        let mut delay = CountingDelay::default();

        let result = block_on(join_with_retry(&mut link, &mut delay, 10, 1000));

        assert!(matches!(result, Err(StationError::Wifi(_))));
        assert_eq!(delay.total_ms, 10_000);
    }

    #[test]
    fn rejected_join_request_fails_immediately() {
        let mut link = FakeLink {
            polls: 0,
            joins_after: Some(0),
            reject: true,
        };
        let mut delay = CountingDelay::default();

        assert!(block_on(join_with_retry(&mut link, &mut delay, 10, 1000)).is_err());
        assert_eq!(delay.total_ms, 0);
    }
}
