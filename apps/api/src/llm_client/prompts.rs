// Shared prompt fragments and the template filler.
// Each service keeps its own prompts alongside it.

/// Coaching register shared by every evaluation prompt.
pub const COACH_INSTRUCTION: &str = "\
    Be specific and constructive. Refer to what the candidate actually said. \
    Never invent content the candidate did not say. \
    Keep every point short and actionable.";

/// Fills `{name}` placeholders in a single pass.
///
/// Substituted values are never rescanned, so user text containing `{...}`
/// cannot leak into other sections. Braces that do not name a variable
/// (e.g. JSON examples) are copied through unchanged.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let hit = vars
            .iter()
            .find(|(name, _)| tail.starts_with(name) && tail[name.len()..].starts_with('}'));
        match hit {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
