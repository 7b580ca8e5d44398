//! Prompt templates, one per operation

use crate::providers::AnalysisType;
use std::fmt::Write;

/// Instructions for tweet generation. The author signature is appended
/// afterwards, so the model is told not to write one.
pub const TWEET_INSTRUCTIONS: &str = "You are a tweet creator
You search the web before creating a tweet
You always tweet using 3-5 phrases and use new lines
You will follow the topic the user mentions
You will always limit the post to 450 characters (leaving room for author signature)
You will NOT include any author signature in your tweet - this will be added automatically

FOLLOW THE SAMPLE TWEETS BELOW

<sample_tweet>
Rust 1.80 just landed with LazyLock in std 🔥

No more once_cell for lazy statics

see for yourself👇
</sample_tweet>

<sample_tweet>
We shipped streaming uploads today.

Files of any size now go straight to storage without touching disk.

Available now on every plan.
</sample_tweet>";

pub fn summarize(text: &str, max_length: Option<u32>) -> String {
    match max_length {
        Some(words) => format!(
            "Summarize the following text in {words} words or less. \
             Just return the summary, no other text or explanation: {text}"
        ),
        None => format!("Summarize the following text: {text}"),
    }
}

pub fn keywords(text: &str, max_keywords: Option<u32>) -> String {
    let count = max_keywords.map(|n| format!(" {n}")).unwrap_or_default();
    format!("Extract the most important{count} keywords from the following text.\n\nText: {text}")
}

pub fn tweet(topic: &str) -> String {
    format!(
        "Create ONE tweet about the following topic: {topic}. Use 3-5 phrases with new lines. \
         Keep it under 450 characters. Just return the tweet, no other text or explanation."
    )
}

pub fn translate(text: &str, target_language: &str, source_language: Option<&str>) -> String {
    let from = source_language
        .map(|source| format!(" from {source}"))
        .unwrap_or_default();
    format!(
        "Translate the following text{from} to {target_language}. Text: {text} \
         Just return the translated text, no other text or explanation."
    )
}

pub fn sentiment(text: &str, categories: &[String]) -> String {
    let categories = if categories.is_empty() {
        "positive, negative, neutral".to_string()
    } else {
        categories.join(", ")
    };
    format!(
        r#"Analyze the sentiment of the following text and return your response in JSON format.

Your response must include:
1. "sentiment": The overall sentiment classification (one of: {categories})
2. "confidence": A confidence score between 0 and 1 (where 1 is most confident)
3. "emotions": An array of emotion objects, each with "emotion" (string) and "score" (number 0-1)

The JSON keys must match exactly: "sentiment", "confidence", and "emotions".

Text to analyze: {text}"#
    )
}

pub fn generate_code(
    prompt: &str,
    language: Option<&str>,
    framework: Option<&str>,
    complexity: &str,
    include_comments: bool,
) -> String {
    let mut out = format!("Write {complexity}-level code for the following request: {prompt}\n");
    if let Some(language) = language {
        let _ = writeln!(out, "Language: {language}");
    }
    if let Some(framework) = framework {
        let _ = writeln!(out, "Framework: {framework}");
    }
    out.push_str(if include_comments {
        "Include helpful comments in the code.\n"
    } else {
        "Do not include comments in the code.\n"
    });
    out.push_str(
        "Return the code, the programming language it is written in, and a brief explanation of what it does.",
    );
    out
}

pub fn image_caption(style: &str, max_length: Option<u32>, include_details: bool) -> String {
    let mut out = format!("Write a {style} caption for this image.");
    if let Some(words) = max_length {
        let _ = write!(out, " Keep it under {words} words.");
    }
    if include_details {
        out.push_str(" Include technical details such as composition, lighting, and colors.");
    }
    out.push_str(" Just return the caption, no other text or explanation.");
    out
}

pub fn image_analysis(analysis_type: AnalysisType) -> &'static str {
    match analysis_type {
        AnalysisType::Caption => "Please provide a detailed caption/description of this image.",
        AnalysisType::Objects => {
            "Please identify and list all objects visible in this image. For each object, \
             provide the name and if possible, estimate confidence and approximate location."
        }
        AnalysisType::Both => {
            "Please analyze this image by: 1) Providing a detailed caption/description, and \
             2) Identifying and listing all objects visible in the image with their approximate \
             locations if possible."
        }
    }
}

pub fn document_question(document: &str, question: &str, max_length: Option<u32>) -> String {
    let length = match max_length {
        Some(chars) => format!("Keep your answer concise and under {chars} characters."),
        None => "Provide a comprehensive but concise answer.".to_string(),
    };
    format!(
        r#"Based on the following PDF content, please answer the question.

PDF Content:
"""
{document}
"""

Question: {question}

Instructions:
- Answer based only on the information provided in the PDF content
- If the PDF doesn't contain information to answer the question, clearly state that
- {length}
- Provide a direct, accurate answer"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_limits() {
        assert!(summarize("abc", Some(50)).contains("50 words or less"));
        assert!(!summarize("abc", None).contains("words or less"));
        assert!(keywords("abc", Some(5)).contains("important 5 keywords"));
        assert!(keywords("abc", None).contains("important keywords"));
    }

    #[test]
    fn test_sentiment_default_categories() {
        assert!(sentiment("great", &[]).contains("positive, negative, neutral"));
        let custom = sentiment("great", &["happy".to_string(), "sad".to_string()]);
        assert!(custom.contains("one of: happy, sad"));
    }

    #[test]
    fn test_generate_code_mentions_options() {
        let prompt = generate_code("fizzbuzz", Some("rust"), None, "simple", false);
        assert!(prompt.contains("simple-level"));
        assert!(prompt.contains("Language: rust"));
        assert!(!prompt.contains("Framework"));
        assert!(prompt.contains("Do not include comments"));
    }

    #[test]
    fn test_document_question_embeds_text() {
        let prompt = document_question("Invoice total: 42", "What is the total?", Some(100));
        assert!(prompt.contains("Invoice total: 42"));
        assert!(prompt.contains("under 100 characters"));
    }
}
