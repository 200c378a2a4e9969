// src/llm/prompts.rs
//! Deterministic prompt builders for the three generation tasks.
//!
//! Prompts are pure functions of their typed inputs so a given resume always
//! produces the same request text. Each prompt pins the model to a strict
//! JSON output contract; the sanitizer downstream copes with the models that
//! ignore it anyway.

use serde_json::Value;

/// Prompt for parsing raw resume text into the structured résumé schema.
pub fn extraction_prompt(resume_text: &str) -> String {
    format!(
        r#"You are an AI resume parser.

Your task is to extract structured information from raw resume text and return the result strictly in JSON format that matches the given schema EXACTLY.

IMPORTANT RULES:
1. Output ONLY valid JSON. Do NOT include explanations, comments, markdown, or extra text.
2. Follow the schema structure and field names exactly as provided.
3. If any field is missing or not mentioned, use:
   - null for single-value fields
   - [] for arrays
   - default values where logically applicable
4. Infer values intelligently when possible.
5. Normalize data (trim strings, remove unnecessary symbols).
6. Skills, projects, and certifications must be arrays of strings.
7. internships must be an array of objects with {{ "company", "role" }}.
8. If multiple values are found, choose the most relevant/recent ones.

Communication skill evaluation: infer communication_rating (1-5) from resume
clarity and structure, use of action verbs, leadership roles, internship
descriptions, hackathon participation, grammar and professionalism. 1 means
very poor or unclear, 5 means strong leadership and impact-driven language.
If resume quality is average or above, do NOT leave it null.

CRITICAL OUTPUT RULES (MANDATORY):
- Return ONLY a raw JSON object.
- Do NOT wrap the response in markdown or code fences.
- Do NOT include any surrounding text.
- The response must start with {{ and end with }}.

Target JSON schema:

{{
  "name": String,
  "email": String,
  "phone": String,
  "linkedin": String,
  "github": String,
  "cgpa": Number,
  "twelfth_percent": Number,
  "tenth_percent": Number,
  "backlogs": Number,
  "experienceYears": Number,
  "desired_role": String,
  "communication_rating": Number,
  "skills": [String],
  "projects": [String],
  "certifications": [String],
  "hackathon": "Yes" | "No",
  "internships": [
    {{
      "company": String,
      "role": String
    }}
  ]
}}

Now parse the following resume text and return ONLY the JSON output:

{resume_text}"#
    )
}

/// Prompt for the ATS-style evaluation.
///
/// The model is asked for the per-category breakdown only; the aggregate
/// score is recomputed deterministically by the evaluation task, so the
/// output contract deliberately has no total field.
pub fn evaluation_prompt(resume_text: &str, desired_role: &str, experience_years: i64) -> String {
    format!(
        r#"You are an enterprise-grade Applicant Tracking System (ATS) resume evaluation engine.

Your task is to evaluate the resume quality and role alignment strictly based on ATS standards used by modern recruiters. You must behave like a deterministic scoring system, NOT a career coach.

The candidate has specified a desired job role and their years of experience. You must evaluate how well the resume aligns with that role.

SCORING CRITERIA (per-category maximums):

1) section_completeness (0-10): presence of summary, education, skills, experience, projects, certifications sections.
2) contact_score (0-5): email, phone, LinkedIn present and well formatted.
3) chronology_score (0-10): reverse chronological order, consistent date formats.
4) experience_quality (0-15): clear role descriptions, bullet-point clarity, impact-focused descriptions.
5) quantification_score (0-10): numbers, percentages, metrics, measurable impact.
6) action_verbs_score (0-10): strong action verbs; penalize weak or passive language.
7) skills_score (0-10): skills clearly listed and grouped; penalize overly generic skills.
8) readability_score (0-10): clear structure, logical spacing, consistent bullets, professional tone.
9) education_score (0-5): CGPA/percentage clarity, academic consistency.
10) role_alignment_score (0-15): how well skills, projects, and experience match the desired role and its industry-standard competencies.

CRITICAL RULES:
- Each category score MUST be within its stated range.
- Do NOT report a total score; report ONLY the per-category breakdown.
- Do NOT hallucinate missing sections. Use ONLY the provided resume text.
- Be strict but fair. Do NOT inflate scores.
- Return STRICT JSON ONLY. No markdown. No extra commentary.

OUTPUT FORMAT (STRICT JSON):

{{
  "breakdown": {{
    "section_completeness": number,
    "contact_score": number,
    "chronology_score": number,
    "experience_quality": number,
    "quantification_score": number,
    "action_verbs_score": number,
    "skills_score": number,
    "readability_score": number,
    "education_score": number,
    "role_alignment_score": number
  }},
  "role_analysis": {{
    "desired_role": "string",
    "role_match_level": "Poor | Moderate | Strong"
  }},
  "strengths": ["string"],
  "weaknesses": ["string"],
  "improvement_suggestions": ["string"]
}}

INPUT DATA:

Desired Role:
{desired_role}

Experience Years:
{experience_years}

Resume Text:
{resume_text}"#
    )
}

/// Prompt for the career roadmap, consuming the evaluation task's output.
pub fn roadmap_prompt(resume_text: &str, desired_role: &str, evaluation: &Value) -> String {
    format!(
        r#"You are an expert Career Strategist, ATS Optimization Specialist, and Campus Placement Mentor.

Your task is to generate a highly personalized, actionable career roadmap based strictly on the resume content and the ATS evaluation provided below.

Objectives: increase the ATS score, improve alignment with the desired role, strengthen resume competitiveness, improve placement readiness.

STYLE RULES:
- Do NOT use the candidate's name anywhere in the response.
- Do NOT use second-person language ("you", "your") or third-person references ("the candidate").
- Use a neutral, professional, dashboard-ready tone; analytical and structured.

FUNCTIONAL RULES:
- Align ALL recommendations strictly with the desired role.
- Use the ATS evaluation insights directly to address weaknesses and gaps.
- Do NOT provide generic advice; every recommendation must be specific, measurable, and actionable.
- Return ONLY structured JSON, no explanations outside JSON.

Desired Role:
{desired_role}

Resume Content:
{resume_text}

ATS Evaluation Result:
{evaluation}

Generate the response strictly in the following JSON format:

{{
  "career_profile_summary": {{
    "current_positioning": "",
    "role_alignment_score_estimate": 0,
    "key_gap_themes": []
  }},
  "roadmap": {{
    "short_term_0_3_months": {{
      "technical_skills_to_focus": [],
      "projects_to_build_or_improve": [],
      "resume_optimization_steps": [],
      "interview_preparation_strategy": [],
      "profile_building_strategy": []
    }},
    "mid_term_3_6_months": {{
      "advanced_skills_to_develop": [],
      "high_impact_projects": [],
      "certifications_or_specializations": [],
      "internship_or_experience_strategy": []
    }},
    "long_term_6_12_months": {{
      "specialization_direction": [],
      "portfolio_strengthening": [],
      "placement_strategy": []
    }}
  }},
  "priority_actions_ranked": [],
  "impact_projection": {{
    "resume_strength_improvement": "",
    "profile_competitiveness_boost": "",
    "expected_outcome_if_followed": ""
  }}
}}

Additional constraints:
- role_alignment_score_estimate must be between 0 and 100.
- priority_actions_ranked must include only the 3-5 highest-impact actions.
- Recommendations must clearly connect to weaknesses in the ATS evaluation."#
    )
}
