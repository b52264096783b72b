use serde::{Serialize, Serializer};

pub const PENDING_CONFIRMATION: &str = "pending-confirmation";

/// Registration of a subscriber's endpoint with the notification provider.
///
/// A subscriber without any handle never managed to register a channel. Only the provider
/// moves a handle from `Pending` to `Confirmed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelHandle {
    Pending,
    Confirmed(String),
}

impl ChannelHandle {
    /// The provider-side identifier, only known once the channel is confirmed.
    pub fn confirmed_id(&self) -> Option<&str> {
        match self {
            ChannelHandle::Pending => None,
            ChannelHandle::Confirmed(id) => Some(id),
        }
    }

    pub fn parse(handle: String) -> Result<ChannelHandle, String> {
        let trimmed = handle.trim();

        if trimmed.is_empty() {
            return Err(String::from("channel handle cannot be empty"));
        }

        // Older providers spell the sentinel with a space.
        if trimmed == PENDING_CONFIRMATION || trimmed == "pending confirmation" {
            return Ok(ChannelHandle::Pending);
        }

        Ok(ChannelHandle::Confirmed(handle))
    }
}

impl AsRef<str> for ChannelHandle {
    fn as_ref(&self) -> &str {
        match self {
            ChannelHandle::Pending => PENDING_CONFIRMATION,
            ChannelHandle::Confirmed(id) => id,
        }
    }
}

impl Serialize for ChannelHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_ref())
    }
}
