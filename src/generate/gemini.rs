use super::{GenerateError, Provider, invalid_response, prompt, read_error, transport_error};
use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Serialize)]
struct Request<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct Response {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<GeneratedContent>,
}

#[derive(Deserialize)]
struct GeneratedContent {
    parts: Option<Vec<GeneratedPart>>,
}

#[derive(Deserialize)]
struct GeneratedPart {
    text: Option<String>,
}

pub fn generate(
    agent: &ureq::Agent,
    api_key: &str,
    model: &str,
    diff: &str,
) -> Result<String, GenerateError> {
    let prompt = prompt::gemini(diff);
    let request = Request {
        contents: vec![Content {
            parts: vec![Part { text: &prompt }],
        }],
    };

    let url = format!("{API_BASE}/{model}:generateContent");
    let mut response = agent
        .post(&url)
        .header("x-goog-api-key", api_key)
        .send_json(&request)
        .map_err(|e| transport_error(Provider::Gemini, &e))?;
    if !response.status().is_success() {
        return Err(read_error(Provider::Gemini, &mut response));
    }

    let body: Response = response
        .body_mut()
        .read_json()
        .map_err(|e| invalid_response(Provider::Gemini, e.to_string()))?;
    extract_text(body).ok_or_else(|| invalid_response(Provider::Gemini, "no candidates returned"))
}

/// join the text parts of the first candidate
fn extract_text(response: Response) -> Option<String> {
    let parts = response
        .candidates?
        .into_iter()
        .next()?
        .content?
        .parts?;
    let text: String = parts.into_iter().filter_map(|p| p.text).collect();
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = Request {
            contents: vec![Content {
                parts: vec![Part { text: "hello" }],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "contents": [{ "parts": [{ "text": "hello" }] }] })
        );
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body = r#"{
            "candidates": [
                { "content": { "parts": [{ "text": "feat: add " }, { "text": "login" }], "role": "model" } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        }"#;
        let response: Response = serde_json::from_str(body).unwrap();
        assert_eq!(extract_text(response).as_deref(), Some("feat: add login"));
    }

    #[test]
    fn test_extract_text_without_candidates() {
        let response: Response = serde_json::from_str(r#"{"promptFeedback": {}}"#).unwrap();
        assert_eq!(extract_text(response), None);
    }
}
