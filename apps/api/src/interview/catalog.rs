use serde::Serialize;

use crate::models::interview::InterviewType;

/// One entry on the interview selection screen.
#[derive(Debug, Clone, Serialize)]
pub struct InterviewTypeCard {
    pub interview_type: InterviewType,
    pub slug: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

pub fn interview_types() -> Vec<InterviewTypeCard> {
    InterviewType::ALL
        .into_iter()
        .map(|interview_type| {
            let (title, description) = match interview_type {
                InterviewType::Technical => (
                    "Technical Interview",
                    "Assess your coding and problem-solving skills.",
                ),
                InterviewType::Hr => ("HR Round", "Evaluate your personality and cultural fit."),
                InterviewType::Behavioral => (
                    "Behavioral Interview",
                    "Demonstrate how you handle work situations.",
                ),
                InterviewType::Fresher => (
                    "Fresher Interview",
                    "General questions for entry-level candidates.",
                ),
            };
            InterviewTypeCard {
                interview_type,
                slug: interview_type.slug(),
                title,
                description,
            }
        })
        .collect()
}
