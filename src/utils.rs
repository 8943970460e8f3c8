use chrono::{DateTime, SecondsFormat, Utc};
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Json;
use serde::Serializer;
use serde_json::Value;

pub fn try_respond(req: &Request<'_>, json: Value, status: Status) -> response::Result<'static> {
    let response = Json(json).respond_to(req)?;
    Response::build_from(response).status(status).ok()
}

pub fn serialize_date<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = date.to_rfc3339_opts(SecondsFormat::Millis, true);
    serializer.serialize_str(&s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(serde_derive::Serialize)]
    struct Stamped {
        #[serde(serialize_with = "serialize_date")]
        at: DateTime<Utc>,
    }

    #[test]
    fn dates_serialize_as_rfc3339_millis() {
        let at = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();
        let value = serde_json::to_value(Stamped { at }).unwrap();
        assert_eq!(value["at"], "2021-03-04T05:06:07.000Z");
    }
}
