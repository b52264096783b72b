use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use validator::validate_email;

#[derive(Debug)]
pub struct NewEvent {
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: String,
    pub category: String,
    pub description: String,
    pub organizer_email: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewEventBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub organizer_email: Option<String>,
}

impl TryFrom<NewEventBody> for NewEvent {
    type Error = String;

    fn try_from(body: NewEventBody) -> Result<Self, Self::Error> {
        let title = required("title", body.title)?;
        let date = required("date", body.date)?;
        let time = required("time", body.time)?;
        let location = required("location", body.location)?;
        let category = required("category", body.category)?;
        let description = required("description", body.description)?;
        let organizer_email = required("organizerEmail", body.organizer_email)?;

        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|_| format!("{} is not a valid date, expected YYYY-MM-DD", date))?;
        let time = NaiveTime::parse_from_str(&time, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&time, "%H:%M:%S"))
            .map_err(|_| format!("{} is not a valid time, expected HH:MM", time))?;

        if !validate_email(&organizer_email) {
            return Err(format!("{} email is not valid", organizer_email));
        }

        Ok(NewEvent {
            title,
            date,
            time,
            location,
            category,
            description,
            organizer_email,
        })
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(format!("{} is required", field)),
    }
}
