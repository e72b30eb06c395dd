//! Prompt text for the chat, document, and ID-image calls.

use asika_config::{FieldSpec, RegistrationConfig};

use crate::context::PromptContext;

/// Reply returned when a request carries no messages.
pub const NO_MESSAGE_REPLY: &str =
    "I didn't receive any user message. Could you tell me how I can help?";

/// Reply returned when the model call fails.
pub const APOLOGY_REPLY: &str =
    "I'm sorry, I couldn't process your request right now. Please try again in a moment.";

pub const PERSONA: &str = "You are Asika, a helpful fertility clinic assistant. \
Respond using only the information contained in the supplied source documents. \
If the documents do not cover a question, say you do not have that information instead of guessing. \
End with: is there anything specific you'd like to know, or do you want to ask me something else?";

/// The system instruction: persona, grounding rules, and the registration
/// marker protocol generated from `registration`.
pub fn system_instruction(registration: &RegistrationConfig) -> String {
    let fields = registration
        .fields
        .iter()
        .map(|f| format!("\"{}\": {}", f.name, f.hint))
        .collect::<Vec<_>>()
        .join(", ");
    let required = registration.required.join(", ");
    let trailing = &registration.trailing_sentinel;
    let sentinel = &registration.sentinel;

    format!(
        "{PERSONA}\n\n\
         Patient registration:\n\
         - If the user wants to register, collect these details conversationally: {names}.\n\
         - Required before registering: {required}.\n\
         - Read the collected details back and ask the user to confirm them.\n\
         - Only after the user explicitly confirms, add exactly one line at the end of your reply:\n\
         {sentinel} {{{fields}}}{trailing}\n\
         - Put the JSON object on that single line. Use null for anything the user did not provide.\n\
         - Never emit that line before confirmation, and never more than once per reply.",
        names = registration
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    )
}

/// The user turn: grounding context followed by the transcript.
pub fn user_turn(context: &PromptContext, transcript: &str) -> String {
    format!(
        "Source documents:\n\n{}\n\nConversation so far:\n{}",
        context.text(),
        transcript
    )
}

/// Instruction for structuring text extracted from an uploaded document.
pub fn document_instruction(fields: &[FieldSpec]) -> String {
    format!(
        "You extract patient details from clinic documents such as referral letters and intake forms. \
         Return a single JSON object with exactly these keys: {}. \
         Use null for any value the document does not state. Do not add commentary.",
        field_list(fields)
    )
}

/// Instruction for reading fields off an ID document image.
pub fn id_card_instruction(fields: &[FieldSpec]) -> String {
    format!(
        "You read identity documents (ID cards, passports, driver's licences). \
         Return a single JSON object with exactly these keys: {}. \
         Use null for any value that is not visible on the document. Do not add commentary.",
        field_list(fields)
    )
}

fn field_list(fields: &[FieldSpec]) -> String {
    fields
        .iter()
        .map(|f| format!("{} ({})", f.name, f.hint))
        .collect::<Vec<_>>()
        .join(", ")
}
