use serde::Deserialize;

use crate::domain::interests::Interests;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_name::SubscriberName;

#[derive(Debug)]
pub struct NewSubscriber {
    pub email: SubscriberEmail,
    pub name: SubscriberName,
    pub interests: Interests,
}

// Every field is optional at the wire level so a missing one is reported as invalid input
// instead of a deserialization failure.
#[derive(Deserialize, Debug, Default)]
pub struct NewSubscriberBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub interests: Option<Vec<String>>,
}

impl NewSubscriberBody {
    pub fn new(name: &str, email: &str, interests: &[&str]) -> Self {
        Self {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            interests: Some(interests.iter().map(|tag| tag.to_string()).collect()),
        }
    }
}

impl TryFrom<NewSubscriberBody> for NewSubscriber {
    type Error = String;

    fn try_from(body: NewSubscriberBody) -> Result<Self, Self::Error> {
        let name = body
            .name
            .ok_or_else(|| String::from("name is required"))
            .and_then(SubscriberName::parse)?;
        let email = body
            .email
            .ok_or_else(|| String::from("email is required"))
            .and_then(SubscriberEmail::parse)?;
        let interests = Interests::parse(body.interests.unwrap_or_default());

        Ok(NewSubscriber {
            email,
            name,
            interests,
        })
    }
}
