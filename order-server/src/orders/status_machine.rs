//! Order status machine
//!
//! ```text
//! pending → confirmed → preparing → ready → out_for_delivery → delivered → completed
//!    │          │           │         │            │
//!    └──────────┴───────────┴─────────┴────────────┴──────────→ cancelled
//! ```
//!
//! Forward moves may skip stages; backward and same-state moves are
//! rejected. `delivered`, `completed` and `cancelled` are terminal.
//!
//! The machine only decides. Side effects come back as [`Effect`] hints for
//! the caller to execute.

use super::error::{OrderError, OrderResult};
use shared::order::{OrderStatus, OrderType};

/// Side-effect hint produced by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    StartPrepTimer { estimated_minutes: u32 },
    StopPrepTimer,
    /// Cancel pending delayed work (auto-confirm) for the order
    CancelScheduled,
}

/// An allowed move with its hints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub effects: Vec<Effect>,
}

pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    if from.is_terminal() || from == to {
        return false;
    }
    match (from.rank(), to.rank()) {
        // Cancellation from any non-terminal state
        (_, None) => true,
        (Some(current), Some(requested)) => requested > current,
        (None, Some(_)) => false,
    }
}

/// Validate `from → to` and compute its hints
pub fn transition(from: OrderStatus, to: OrderStatus, order_type: OrderType) -> OrderResult<Transition> {
    if !can_transition(from, to) {
        return Err(OrderError::InvalidTransition { from, to });
    }

    let mut effects = Vec::new();
    match to {
        OrderStatus::Preparing => effects.push(Effect::StartPrepTimer {
            estimated_minutes: order_type.default_prep_minutes(),
        }),
        OrderStatus::Ready => effects.push(Effect::StopPrepTimer),
        _ if to.is_terminal() => {
            effects.push(Effect::StopPrepTimer);
            effects.push(Effect::CancelScheduled);
        }
        _ => {}
    }

    Ok(Transition { from, to, effects })
}

/// All states reachable in one move from `from`
pub fn next_states(from: OrderStatus) -> Vec<OrderStatus> {
    OrderStatus::ALL
        .into_iter()
        .filter(|to| can_transition(from, *to))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn test_forward_moves_allowed() {
        assert!(can_transition(Pending, Confirmed));
        assert!(can_transition(Confirmed, Preparing));
        assert!(can_transition(Ready, OutForDelivery));
        assert!(can_transition(OutForDelivery, Delivered));
        // Skips forward
        assert!(can_transition(Preparing, Delivered));
        assert!(can_transition(Pending, Completed));
    }

    #[test]
    fn test_backward_and_same_state_rejected() {
        assert!(!can_transition(Ready, Preparing));
        assert!(!can_transition(Confirmed, Pending));
        assert!(!can_transition(Preparing, Preparing));
    }

    #[test]
    fn test_delivered_to_preparing_is_invalid_transition() {
        let err = transition(Delivered, Preparing, OrderType::Delivery).unwrap_err();
        assert_eq!(
            err,
            OrderError::InvalidTransition {
                from: Delivered,
                to: Preparing
            }
        );
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for terminal in [Delivered, Completed, Cancelled] {
            assert!(next_states(terminal).is_empty(), "{terminal}");
        }
    }

    #[test]
    fn test_cancel_from_every_non_terminal_state() {
        for from in [Pending, Confirmed, Preparing, Ready, OutForDelivery] {
            let t = transition(from, Cancelled, OrderType::Pickup).unwrap();
            assert_eq!(t.effects, vec![Effect::StopPrepTimer, Effect::CancelScheduled]);
        }
        assert!(!can_transition(Cancelled, Cancelled));
    }

    #[test]
    fn test_monotonic_over_all_pairs() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                if let (Some(a), Some(b)) = (from.rank(), to.rank())
                    && b <= a
                {
                    assert!(!can_transition(from, to), "{from} -> {to}");
                }
            }
        }
    }

    #[test]
    fn test_preparing_starts_timer_with_type_estimate() {
        let t = transition(Confirmed, Preparing, OrderType::Pickup).unwrap();
        assert_eq!(t.effects, vec![Effect::StartPrepTimer { estimated_minutes: 15 }]);

        let t = transition(Confirmed, Preparing, OrderType::Delivery).unwrap();
        assert_eq!(t.effects, vec![Effect::StartPrepTimer { estimated_minutes: 30 }]);
    }

    #[test]
    fn test_ready_stops_timer_and_confirm_has_no_hints() {
        let t = transition(Preparing, Ready, OrderType::Pickup).unwrap();
        assert_eq!(t.effects, vec![Effect::StopPrepTimer]);

        let t = transition(Pending, Confirmed, OrderType::Pickup).unwrap();
        assert!(t.effects.is_empty());
    }
}
