// All LLM prompt constants for the Interview module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for question generation.
pub const QUESTION_SYSTEM: &str = "You are an experienced interviewer running a mock interview. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Question prompt template.
/// Replace: {interview_type}, {topic_section}, {difficulty_section}, {resume_section}.
/// Optional sections render to the empty string when the field is absent.
pub const QUESTION_PROMPT_TEMPLATE: &str = r#"Generate a dynamic and relevant interview question for a {interview_type} interview.
{topic_section}{difficulty_section}{resume_section}
The question should be challenging and insightful, designed to assess the candidate's skills and experience. Focus on open-ended questions that require the candidate to elaborate. The question itself should be 1-3 sentences.

Return a JSON object with this EXACT schema:
{
  "question": "the interview question"
}"#;

/// Replace: {topic}
pub const TOPIC_SECTION: &str = "The question should be about the following topic: {topic}.\n";

/// Replace: {difficulty}
pub const DIFFICULTY_SECTION: &str = "The question should be of {difficulty} difficulty.\n";

/// Replace: {resume_text}
pub const RESUME_SECTION: &str = r#"Base the question on the candidate's experience and skills as detailed in their resume below.
---
Resume:
{resume_text}
---
"#;

/// System prompt for answer feedback.
pub const FEEDBACK_SYSTEM: &str = "You are an expert interview coach providing instant, \
    production-quality feedback on mock interview answers. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Feedback prompt template.
/// Replace: {coach_instruction}, {interview_type}, {question}, {answer}
pub const FEEDBACK_PROMPT_TEMPLATE: &str = r#"{coach_instruction}

Analyze the user's answer based on the interview type and question.

Interview Type: {interview_type}
Question: {question}
Answer: {answer}

Return a JSON object with this EXACT schema:
{
  "overallScore": 7,
  "strengths": ["specific thing the candidate did well"],
  "areasForImprovement": ["actionable way to improve"],
  "summary": "one concise paragraph summarizing the feedback with encouragement"
}

HARD RULES:
1. `overallScore` is a single number from 0 to 10, where 0 is poor and 10 is excellent
2. `strengths` has 2-3 specific bullet points
3. `areasForImprovement` has 2-3 actionable bullet points
4. `summary` is never empty"#;

/// System prompt for response analysis.
pub const ANALYSIS_SYSTEM: &str = "You are an AI-powered interview coach providing detailed \
    feedback on responses during mock interviews. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object.";

/// Response analysis prompt template.
/// Replace: {coach_instruction}, {interview_type}, {question}, {response}
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"{coach_instruction}

Evaluate the response based on the following criteria, tailored to the interview type ({interview_type}):
- Clarity: How clear and easy to understand was the response?
- Relevance: How relevant was the response to the question asked?
- Confidence: How confident did the user sound in their response?

Question: {question}
Response: {response}

Return a JSON object with this EXACT schema (every value is prose):
{
  "clarity": "assessment of clarity with suggestions to be more clear and concise",
  "relevance": "assessment of relevance with suggestions to tailor the response",
  "confidence": "assessment of confidence with suggestions to improve it",
  "overallFeedback": "overall assessment of the response",
  "strengths": "key strengths demonstrated",
  "weaknesses": "areas where the response could be improved",
  "improvementSuggestions": "specific, actionable suggestions for future responses"
}"#;
