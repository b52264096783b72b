mod events;
mod health_check;
mod subscriptions;
mod subscriptions_confirm;

pub use events::{handle_get_event, handle_list_events, handle_submit_event};
pub use health_check::health_check;
pub use subscriptions::{handle_create_subscription, handle_list_subscriptions, handle_unsubscribe};
pub use subscriptions_confirm::handle_confirm_subscription;
