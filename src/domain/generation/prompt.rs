//! Prompt construction for grounded answers

use crate::domain::retrieval::Evidence;

/// Build the answer prompt from a question and its evidence
pub fn build_prompt(question: &str, evidence: &[Evidence]) -> String {
    let context = if evidence.is_empty() {
        "No relevant context was found.".to_string()
    } else {
        evidence
            .iter()
            .enumerate()
            .map(|(index, item)| match item.title {
                Some(ref title) => format!("Source {} ({}):\n{}", index + 1, title, item.text),
                None => format!("Source {}:\n{}", index + 1, item.text),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!(
        "Answer the question based on context. Be concise and precise.\n\n\
         Context:\n{}\n\nQuestion: {}\n\nAnswer:",
        context, question
    )
}
