//! Broadcast channel for zap events.
//!
//! Front ends subscribe to follow phase changes, quotes and the lifecycle of
//! submitted transactions.

use tokio::sync::broadcast;
use zap_types::ZapEvent;

/// Event bus for broadcasting zap events to multiple subscribers.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<ZapEvent>,
}

impl EventBus {
	/// Creates a new EventBus with the specified channel capacity.
	///
	/// Once the channel is full the oldest events are dropped for lagging
	/// receivers.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Creates a new subscriber receiving every event published after this
	/// call.
	pub fn subscribe(&self) -> broadcast::Receiver<ZapEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns an error if there are no active subscribers.
	pub fn publish(&self, event: ZapEvent) -> Result<(), broadcast::error::SendError<ZapEvent>> {
		self.sender.send(event)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use zap_types::Phase;

	#[test]
	fn test_subscribe_creates_receiver() {
		let event_bus = EventBus::new(10);
		assert_eq!(event_bus.sender.receiver_count(), 0);

		let _receiver = event_bus.subscribe();
		assert_eq!(event_bus.sender.receiver_count(), 1);
	}

	#[tokio::test]
	async fn test_publish_and_receive_event() {
		let event_bus = EventBus::new(10);
		let mut receiver = event_bus.subscribe();

		let event = ZapEvent::PhaseChanged {
			from: Phase::Idle,
			to: Phase::Quoting,
		};
		event_bus.publish(event.clone()).unwrap();

		assert_eq!(receiver.recv().await.unwrap(), event);
	}

	#[test]
	fn test_publish_with_no_subscribers() {
		let event_bus = EventBus::new(10);
		assert!(event_bus.publish(ZapEvent::ConnectionRequested).is_err());
	}

	#[tokio::test]
	async fn test_cloned_bus_shares_channel() {
		let event_bus1 = EventBus::new(10);
		let event_bus2 = event_bus1.clone();

		let mut receiver1 = event_bus1.subscribe();
		let mut receiver2 = event_bus2.subscribe();
		assert_eq!(event_bus1.sender.receiver_count(), 2);

		event_bus2
			.publish(ZapEvent::BalancesRefreshed { success: true })
			.unwrap();

		assert_eq!(
			receiver1.recv().await.unwrap(),
			ZapEvent::BalancesRefreshed { success: true }
		);
		assert_eq!(
			receiver2.recv().await.unwrap(),
			ZapEvent::BalancesRefreshed { success: true }
		);
	}
}
