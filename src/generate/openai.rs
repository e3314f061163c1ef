use super::{GenerateError, Provider, invalid_response, prompt, read_error, transport_error};
use serde::{Deserialize, Serialize};

const API_URL: &str = "https://api.openai.com/v1/chat/completions";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 200;

#[derive(Serialize)]
struct Request<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct Response {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

fn build_request<'a>(model: &'a str, user_prompt: &'a str) -> Request<'a> {
    Request {
        model,
        messages: vec![
            Message {
                role: "system",
                content: prompt::SYSTEM_PROMPT,
            },
            Message {
                role: "user",
                content: user_prompt,
            },
        ],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    }
}

pub fn generate(
    agent: &ureq::Agent,
    api_key: &str,
    model: &str,
    diff: &str,
) -> Result<String, GenerateError> {
    let user_prompt = prompt::openai_user(diff);
    let request = build_request(model, &user_prompt);

    let mut response = agent
        .post(API_URL)
        .header("Authorization", &format!("Bearer {api_key}"))
        .send_json(&request)
        .map_err(|e| transport_error(Provider::OpenAi, &e))?;
    if !response.status().is_success() {
        return Err(read_error(Provider::OpenAi, &mut response));
    }

    let body: Response = response
        .body_mut()
        .read_json()
        .map_err(|e| invalid_response(Provider::OpenAi, e.to_string()))?;
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| invalid_response(Provider::OpenAi, "no choices returned"))
}
