// All LLM prompt templates for the tailoring pipeline.
// Reuses cross-cutting fragments from llm_client::prompts.
//
// Placeholders are `{name}`. Templates are filled in one pass, so text
// substituted into a prompt is never scanned for placeholders again.

use crate::llm_client::prompts::PLAIN_TEXT_INSTRUCTION;

/// Company/role extraction. Replace: {jd_text}
pub const JOB_DETAILS_PROMPT_TEMPLATE: &str = r#"From the following job description, extract the company name and the job title.

Job Description:
{jd_text}

Respond with ONLY a YAML structure. Do not include any other text. The company name should be just the company's name, not a full sentence.

Example:
```yaml
company: "Google"
role: "Software Engineer"
```

Your output:
```yaml
company: "..."
role: "..."
```"#;

/// Summary rewrite. Replace: {jd_text}, {current_summary}, {plain_text}
pub const SUMMARY_PROMPT_TEMPLATE: &str = r#"Job Description:
{jd_text}

Current Summary:
{current_summary}

Task: Rewrite the professional summary to align with this job posting while maintaining impact.

Requirements:
- MUST be 2-3 sentences (not shorter)
- Preserve ALL quantified achievements from the original (percentages, numbers, metrics)
- Write in implied first person - no "I", "me" or "my"
- Lead with: [Title] with [X]+ years of experience in [specific domain]
- Include 2-4 specific technologies from the job description that match the background
- Match job description keywords naturally
- {plain_text}

CRITICAL RULES:
- Do NOT shorten the summary
- Do NOT lose metrics and numbers from the original
- Do NOT add metrics that don't exist in the original
- Do NOT use third person phrases like "he/she has"
- Do NOT use generic phrases like "extensive experience" - be specific

Output Format:
Return ONLY the following YAML structure:

```yaml
summary:
  - "Your tailored summary text in plain text format."
```"#;

/// Per-entry highlight rewrite.
/// Replace: {jd_text}, {company}, {position}, {highlights_yaml}, {plain_text}
pub const HIGHLIGHTS_PROMPT_TEMPLATE: &str = r#"Job Description:
{jd_text}

---

Current Experience Entry:
Company: {company}
Position: {position}
Highlights:
```yaml
{highlights_yaml}
```

---

Task: Rewrite the highlights for this experience entry to best match the job description.

Formula for each bullet:
[Action Verb] + [What You Did] + [Specific Technology/Tool] + [Quantified Impact]

Instructions:
1. Write in implied first person (action verbs, no "I", "me", "my")
2. Do not remove any highlights - rewrite all of them
3. Reorder highlights to put the most relevant ones first
4. Preserve ALL metrics and numbers from the original (%, $, time, scale, users)
5. Include specific technologies mentioned in both the highlight and the job description
6. Keep bullets concise - 1-2 lines maximum
7. {plain_text}

NEVER:
- Add content that wasn't in the original - only rewrite what exists
- Add explanatory phrases like "demonstrating expertise in" or "showcasing ability to"
- Use vague terms like "contributed to"

Output Format:
Return ONLY a YAML list of the tailored highlights:

```yaml
highlights:
  - "Tailored highlight 1"
  - "Tailored highlight 2"
```"#;

/// Skills reordering. Replace: {jd_text}, {skills_yaml}
pub const SKILLS_PROMPT_TEMPLATE: &str = r#"Job Description:
{jd_text}

---

Current Skills Section:
```yaml
{skills_yaml}
```

---

Task: Reorder the skill categories to prioritize those most relevant to the job description.

Instructions:
1. CRITICAL: Preserve ALL existing skill category labels EXACTLY as they are. Do NOT add, remove, or modify any labels.
2. Do not remove any skills or skill categories.
3. Reorder the skill categories to put the most relevant ones first.
4. Within each category, reorder the entries in the details field to put the most relevant ones first.

Output Format:
Return ONLY a YAML list of the tailored skills (no other text):

```yaml
skills:
  - label: "Exact original label 1"
    details: "Reordered skills, ..."
  - label: "Exact original label 2"
    details: "Reordered skills, ..."
```"#;

/// Job-relevant term extraction from the draft document.
/// Replace: {resume_content}, {jd_text}
pub const RESUME_KEYWORDS_PROMPT_TEMPLATE: &str = r#"Job Description:
{jd_text}

---

Resume Content:
{resume_content}

---

Task: Extract ONLY the technical terms from the resume that are RELEVANT to this specific job description.

Instructions:
- Only include terms that appear in BOTH the resume AND are mentioned or implied in the job description
- Focus on technologies and tools that align with the job requirements
- Exclude technologies that aren't relevant to this job
- Include related technologies (e.g. the job mentions "databases" and the resume has "PostgreSQL")
- Copy each term exactly as it is written in the resume

Output Format:
Return ONLY a YAML list (no explanatory text):

```yaml
keywords:
  - Keyword1
  - Keyword2
```"#;

pub fn job_details_prompt(jd_text: &str) -> String {
    fill(JOB_DETAILS_PROMPT_TEMPLATE, &[("jd_text", jd_text.trim())])
}

pub fn summary_prompt(jd_text: &str, current_summary: &str) -> String {
    fill(
        SUMMARY_PROMPT_TEMPLATE,
        &[
            ("plain_text", PLAIN_TEXT_INSTRUCTION),
            ("current_summary", current_summary.trim()),
            ("jd_text", jd_text.trim()),
        ],
    )
}

pub fn highlights_prompt(
    jd_text: &str,
    company: &str,
    position: &str,
    highlights_yaml: &str,
) -> String {
    fill(
        HIGHLIGHTS_PROMPT_TEMPLATE,
        &[
            ("plain_text", PLAIN_TEXT_INSTRUCTION),
            ("highlights_yaml", highlights_yaml.trim_end()),
            ("company", company),
            ("position", position),
            ("jd_text", jd_text.trim()),
        ],
    )
}

pub fn skills_prompt(jd_text: &str, skills_yaml: &str) -> String {
    fill(
        SKILLS_PROMPT_TEMPLATE,
        &[("skills_yaml", skills_yaml.trim_end()), ("jd_text", jd_text.trim())],
    )
}

pub fn resume_keywords_prompt(resume_content: &str, jd_text: &str) -> String {
    fill(
        RESUME_KEYWORDS_PROMPT_TEMPLATE,
        &[("resume_content", resume_content.trim_end()), ("jd_text", jd_text.trim())],
    )
}

/// Replaces each known `{name}` in `template`. Unknown braces are copied as-is.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut filled = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        filled.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let known = values.iter().find(|(name, _)| {
            tail.strip_prefix(*name).is_some_and(|after| after.starts_with('}'))
        });
        match known {
            Some((name, value)) => {
                filled.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                filled.push('{');
                rest = tail;
            }
        }
    }
    filled.push_str(rest);
    filled
}
