//! Interpretation of the model's reply.
//!
//! The reply is untrusted: it may be fenced, malformed or plain prose. Interpretation never
//! fails; anything that is not one of the two known actions degrades to showing the cleaned
//! text verbatim.

use serde::Deserialize;

use barberia_core::domain::appointment::BookingRequest;

/// Any action other than `book` that carries a `message` is shown as that message.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ModelAction {
    Book { appointment: BookingRequest },
    Reply { message: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyInterpretation {
    Action(ModelAction),
    Unstructured(String),
}

/// Removes every ```json / ``` marker (with the newline that may follow it) and trims.
pub fn strip_code_fences(raw: &str) -> String {
    let mut cleaned = raw.trim().to_string();
    for fence in ["```json", "```"] {
        cleaned = cleaned.replace(&format!("{fence}\n"), "").replace(fence, "");
    }
    cleaned.trim().to_string()
}

#[derive(Deserialize)]
struct OtherAction {
    action: String,
    message: String,
}

pub fn interpret_reply(raw: &str) -> ReplyInterpretation {
    let cleaned = strip_code_fences(raw);
    if let Ok(action) = serde_json::from_str::<ModelAction>(&cleaned) {
        return ReplyInterpretation::Action(action);
    }
    match serde_json::from_str::<OtherAction>(&cleaned) {
        Ok(other) if other.action != "book" => {
            ReplyInterpretation::Action(ModelAction::Reply { message: other.message })
        }
        _ => ReplyInterpretation::Unstructured(cleaned),
    }
}
