// src/alerts/prompt.rs
use super::types::NormalizedAlert;

/// Field whose presence adds the "quote your reference" nudge.
pub const REQUEST_NUMBER_FIELD: &str = "request_number";

pub const REQUEST_NUMBER_ADDENDUM: &str =
    " . Encourage the use of the request_number value when contacting the City";

/// Target for the rewrite instruction; tighter than the hard limit so one
/// rewrite usually lands under it.
pub const SHORTEN_TARGET: usize = 250;

/// Initial prompt: alert JSON, the link sentence, and an optional addendum.
pub fn alert_prompt(alert: &NormalizedAlert, link: &str) -> String {
    let mut prompt = format!(
        r#"
Please draft a tweet about a potential City of Cape Town service outage or update, using any of the details in the
following JSON. The "service_area" field refers to the responsible department.

{json}

Please end with the sentence '{link}' on its own line.

Only return the content of the post and keep it under 280 characters - you don't have to mention all of the details.
"#,
        json = alert.to_json_string(),
    );
    if alert.contains(REQUEST_NUMBER_FIELD) {
        prompt.push_str(REQUEST_NUMBER_ADDENDUM);
    }
    prompt
}

/// Rewrite instruction wrapped around an output that came back too long.
pub fn shorten_prompt(too_long: &str, link: &str) -> String {
    format!(
        r#"
Please shorten the following tweet so that it is under {SHORTEN_TARGET} characters.
Keep the sentence '{link}' on its own line at the end, and only return the content of the post.

{too_long}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::normalize::normalize;
    use serde_json::json;

    fn normalized(v: serde_json::Value) -> NormalizedAlert {
        normalize(&serde_json::from_value(v).unwrap()).unwrap()
    }

    #[test]
    fn addendum_only_with_request_number() {
        let base = json!({
            "Id": "1",
            "service_area": "Water",
            "start_timestamp": "2023-01-01T10:00:00.000Z",
            "forecast_end_timestamp": "2023-01-01T14:00:00.000Z",
        });
        let p = alert_prompt(&normalized(base.clone()), "LINK");
        assert!(p.contains(r#""service_area":"Water""#));
        assert!(p.contains("'LINK'"));
        assert!(!p.ends_with(REQUEST_NUMBER_ADDENDUM));

        let mut with_ref = base;
        with_ref["request_number"] = json!("R123");
        let p = alert_prompt(&normalized(with_ref), "LINK");
        assert!(p.ends_with(REQUEST_NUMBER_ADDENDUM));
    }

    #[test]
    fn shorten_wraps_text_and_keeps_link() {
        let p = shorten_prompt("very long text", "LINK");
        assert!(p.contains("very long text"));
        assert!(p.contains("'LINK'"));
        assert!(p.contains(&SHORTEN_TARGET.to_string()));
    }
}
