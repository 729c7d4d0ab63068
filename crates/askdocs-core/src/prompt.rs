//! Prompt template for context-grounded answers.

/// What the model is told to say when the context does not answer the question.
pub const UNKNOWN_ANSWER: &str = "I don't know.";

/// Default system message for the conversational front end.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions.";

/// Build the single user message sent to the completion endpoint.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the question based on the context below, and if the question \
         can't be answered based on the context, say \"{unknown}\" Try to \
         cite sources to the links in the context when possible.\n\n\
         Context: {context}\n\n\
         ---\n\n\
         Question: {question}\n\
         Answer:",
        unknown = UNKNOWN_ANSWER,
        context = context,
        question = question,
    )
}
