//! Delivery-status transition policy.
//!
//! ```text
//! from \ to   Sending  Sent  Delivered  Read  Failed
//! (none)         y      y       -        -      -
//! Sending        y      y       y        -      y
//! Sent           n      y       y        y      n
//! Delivered      n      n       y        y      n
//! Read           n      n       n        n      n
//! Failed         y      y       y        y      y
//! ```
//!
//! `-` cells are rejected the same way as `n`. Once a message has a status
//! it can not go back to having none.

use thiserror::Error;

use crate::models::DeliveryStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid delivery status transition {}", describe(.from, .to))]
pub struct InvalidTransition {
    pub from: Option<DeliveryStatus>,
    pub to: Option<DeliveryStatus>,
}

fn describe(from: &Option<DeliveryStatus>, to: &Option<DeliveryStatus>) -> String {
    let name = |s: &Option<DeliveryStatus>| match s {
        Some(s) => s.to_string(),
        None => "(none)".to_string(),
    };
    format!("{} -> {}", name(from), name(to))
}

/// Decides whether a message may move from one status to the next.
pub trait DeliveryStatusPolicy: Send + Sync {
    fn validate(
        &self,
        previous: Option<&DeliveryStatus>,
        next: Option<&DeliveryStatus>,
    ) -> Result<(), InvalidTransition>;
}

#[derive(Debug, Clone, Copy)]
pub struct StandardDeliveryPolicy {
    monotonic_progress: bool,
}

impl StandardDeliveryPolicy {
    pub fn new() -> Self {
        Self {
            monotonic_progress: true,
        }
    }

    /// Accept any Sending progress order, as long as it stays within 0..=100.
    pub fn lenient() -> Self {
        Self {
            monotonic_progress: false,
        }
    }
}

impl Default for StandardDeliveryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryStatusPolicy for StandardDeliveryPolicy {
    fn validate(
        &self,
        previous: Option<&DeliveryStatus>,
        next: Option<&DeliveryStatus>,
    ) -> Result<(), InvalidTransition> {
        use DeliveryStatus::*;

        let next = match (previous, next) {
            (_, Some(next)) => next,
            (None, None) => return Ok(()),
            (Some(_), None) => return Err(reject(previous, None)),
        };

        if let Sending(p) = next {
            if *p > 100 {
                return Err(reject(previous, Some(next)));
            }
        }

        let allowed = match (previous, next) {
            (None, Sending(_) | Sent) => true,
            (None, _) => false,
            (Some(Sending(prev)), Sending(p)) => !self.monotonic_progress || p >= prev,
            (Some(Sending(_)), Sent | Delivered | Failed(_)) => true,
            (Some(Sending(_)), Read) => false,
            (Some(Sent), Sent | Delivered | Read) => true,
            (Some(Delivered), Delivered | Read) => true,
            (Some(Read), _) => false,
            (Some(Failed(_)), _) => true,
            _ => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(reject(previous, Some(next)))
        }
    }
}

fn reject(previous: Option<&DeliveryStatus>, next: Option<&DeliveryStatus>) -> InvalidTransition {
    InvalidTransition {
        from: previous.cloned(),
        to: next.cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeliveryFailure;

    fn all() -> Vec<DeliveryStatus> {
        vec![
            DeliveryStatus::Sending(0),
            DeliveryStatus::Sending(50),
            DeliveryStatus::Sending(100),
            DeliveryStatus::Sent,
            DeliveryStatus::Delivered,
            DeliveryStatus::Read,
            DeliveryStatus::Failed(DeliveryFailure::NetworkUnavailable),
        ]
    }

    #[test]
    fn read_is_absorbing() {
        let policy = StandardDeliveryPolicy::new();
        for next in all() {
            assert!(policy.validate(Some(&DeliveryStatus::Read), Some(&next)).is_err(), "{next}");
        }
    }

    #[test]
    fn failed_can_go_anywhere() {
        let policy = StandardDeliveryPolicy::new();
        let failed = DeliveryStatus::Failed(DeliveryFailure::ServerUnreachable);
        for next in all() {
            assert!(policy.validate(Some(&failed), Some(&next)).is_ok(), "{next}");
        }
    }

    #[test]
    fn sending_moves_forward_from_any_progress() {
        let policy = StandardDeliveryPolicy::new();
        for p in [0u8, 1, 42, 99, 100] {
            let from = DeliveryStatus::Sending(p);
            for next in [
                DeliveryStatus::Sending(100),
                DeliveryStatus::Sent,
                DeliveryStatus::Delivered,
                DeliveryStatus::Failed(DeliveryFailure::MessageTooLarge),
            ] {
                assert!(policy.validate(Some(&from), Some(&next)).is_ok(), "{from} -> {next}");
            }
            assert!(policy.validate(Some(&from), Some(&DeliveryStatus::Read)).is_err());
        }
    }

    #[test]
    fn initial_status() {
        let policy = StandardDeliveryPolicy::new();
        assert!(policy.validate(None, Some(&DeliveryStatus::Sending(0))).is_ok());
        assert!(policy.validate(None, Some(&DeliveryStatus::Sent)).is_ok());
        assert!(policy.validate(None, Some(&DeliveryStatus::Delivered)).is_err());
        assert!(policy.validate(None, Some(&DeliveryStatus::Read)).is_err());
        assert!(policy
            .validate(None, Some(&DeliveryStatus::Failed(DeliveryFailure::MessageExpired)))
            .is_err());
    }

    #[test]
    fn sent_and_delivered_rows() {
        let policy = StandardDeliveryPolicy::new();
        let sent = DeliveryStatus::Sent;
        assert!(policy.validate(Some(&sent), Some(&DeliveryStatus::Sending(10))).is_err());
        assert!(policy.validate(Some(&sent), Some(&DeliveryStatus::Read)).is_ok());
        assert!(policy
            .validate(Some(&sent), Some(&DeliveryStatus::Failed(DeliveryFailure::RecipientBlocked)))
            .is_err());

        let delivered = DeliveryStatus::Delivered;
        assert!(policy.validate(Some(&delivered), Some(&DeliveryStatus::Sent)).is_err());
        assert!(policy.validate(Some(&delivered), Some(&DeliveryStatus::Delivered)).is_ok());
        assert!(policy.validate(Some(&delivered), Some(&DeliveryStatus::Read)).is_ok());
    }

    #[test]
    fn progress_must_not_decrease() {
        let strict = StandardDeliveryPolicy::new();
        let err = strict
            .validate(Some(&DeliveryStatus::Sending(60)), Some(&DeliveryStatus::Sending(30)))
            .unwrap_err();
        assert_eq!(err.from, Some(DeliveryStatus::Sending(60)));
        assert_eq!(err.to, Some(DeliveryStatus::Sending(30)));

        let lenient = StandardDeliveryPolicy::lenient();
        assert!(lenient
            .validate(Some(&DeliveryStatus::Sending(60)), Some(&DeliveryStatus::Sending(30)))
            .is_ok());
    }

    #[test]
    fn progress_above_hundred_is_rejected() {
        let lenient = StandardDeliveryPolicy::lenient();
        assert!(lenient.validate(None, Some(&DeliveryStatus::Sending(101))).is_err());
    }

    #[test]
    fn status_can_not_be_cleared() {
        let policy = StandardDeliveryPolicy::lenient();
        assert!(policy.validate(None, None).is_ok());
        for from in all() {
            let err = policy.validate(Some(&from), None).unwrap_err();
            assert_eq!(err.to, None, "{from}");
        }
    }
}
