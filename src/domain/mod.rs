pub mod channel_handle;
pub mod event;
pub mod interests;
pub mod new_event;
pub mod new_subscriber;
pub mod notification;
pub mod subscriber;
pub mod subscriber_email;
pub mod subscriber_name;
