use serde_json::{json, Value};

pub static QUESTION_GENERATION_SYSTEM_MESSAGE: &str = "You are an experienced hiring manager preparing a candidate for an interview. \
Using the candidate's resume and the target job description, plus any company or extra information provided, \
write realistic interview questions tailored to this candidate and role. Mix behavioral, technical and \
role-specific questions. Each question must be answerable in a few minutes of speech. \
For every question give a short category (for example \"behavioral\", \"technical\", \"company\", \"role\") \
and one sentence explaining why an interviewer would ask it. Answer only with JSON matching the schema.";

pub static ANSWER_GRADING_SYSTEM_MESSAGE: &str = "You are an interview coach grading a candidate's spoken answer. \
Score the answer from 1 (poor) to 10 (outstanding) considering relevance to the question, structure \
(for example the STAR method for behavioral questions), specificity and evidence of impact. \
List concrete strengths and concrete improvements, then write two to four sentences of feedback \
addressed directly to the candidate. If role context is provided, judge the answer against that role. \
Answer only with JSON matching the schema.";

pub fn question_generation_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "questions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "question": { "type": "string" },
                        "category": { "type": "string" },
                        "rationale": { "type": "string" }
                    },
                    "required": ["question", "category", "rationale"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["questions"],
        "additionalProperties": false
    })
}

pub fn answer_grading_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "score": { "type": "number" },
            "strengths": { "type": "array", "items": { "type": "string" } },
            "improvements": { "type": "array", "items": { "type": "string" } },
            "feedback": { "type": "string" }
        },
        "required": ["score", "strengths", "improvements", "feedback"],
        "additionalProperties": false
    })
}
