//! Prompt text: the system persona, the code introduction that primes every
//! conversation, and the three default questions.
//!
//! Long files are condensed by [`extract_code_essence`] before being sent so
//! that the priming turn stays within `max_code_length` characters.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::conversation::{Question, QuestionSpec};
use crate::deepseek::Message;

pub const SYSTEM_PROMPT: &str = "You are an exceptional programming teacher and code reviewer \
who gives extremely detailed, step-by-step explanations of code. You break complex concepts \
down into simple terms anyone can follow while still covering every technical detail. You use \
examples, analogies and clear language so that beginners and experts alike understand the code.";

const OVERVIEW_PROMPT: &str = "What is the purpose of this code? Explain the main functionality, \
the algorithms used and the overall structure. Describe the problem being solved, the approach \
taken, and how the different parts of the code work together.";

const LINE_BY_LINE_PROMPT: &str = "Give an extremely thorough, step-by-step explanation of the \
code, as if teaching someone who is learning to program. For each significant section:

1. Explain exactly what it does in simple terms
2. Break down the logic and control flow in detail
3. Define technical terms and concepts when they first appear
4. Use examples to illustrate complex ideas where helpful
5. Explain WHY an approach or technique is used, not only WHAT it does
6. For complex algorithms or data structures, explain the underlying principles
7. Add simple text diagrams where they clarify flow or structure

Be especially careful with loops, conditionals, function calls and any complex operations. \
Assume no prior knowledge: the goal is to make this code understandable to everyone.";

const IMPROVEMENTS_PROMPT: &str = "What improvements could be made to this code? Consider \
performance, readability, maintainability, potential bugs, error handling and best practices. \
For each suggestion explain WHY it is an improvement and HOW to implement it, with code \
examples where appropriate.";

/// The overview, line-by-line and improvements questions, in that order.
pub fn default_questions() -> QuestionSpec {
    let question = |prompt: &str, suffix: &str, heading: &str, label: &str| Question {
        prompt: prompt.to_string(),
        suffix: suffix.to_string(),
        heading: heading.to_string(),
        label: label.to_string(),
    };
    QuestionSpec::new(vec![
        question(OVERVIEW_PROMPT, "_overview.md", "Code Overview", "Overview"),
        question(
            LINE_BY_LINE_PROMPT,
            "_line_by_line.md",
            "Step-by-Step Explanation",
            "Step-by-Step Explanation",
        ),
        question(
            IMPROVEMENTS_PROMPT,
            "_improvements.md",
            "Suggested Improvements",
            "Suggested Improvements",
        ),
    ])
}

/// Human-readable language name for a supported extension.
pub fn language_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "c" => "C",
        "cpp" => "C++",
        "dts" => "Device Tree Source",
        _ => "Unknown",
    }
}

static DEFINITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(def\s+\w+|class\s+\w+|\w+\s*\(\)|\w+::\w+)").expect("definition regex")
});

const ENTRY_POINTS: &[&str] = &[
    "def main",
    "if __name__",
    "int main",
    "void main",
    "public static void main",
];

const MAX_DEFINITIONS: usize = 20;
const ENTRY_POINT_EXCERPT: usize = 1000;

/// Condense `content` to at most `max_length` characters (plus a truncation
/// marker): the first fifth of the file, a list of definitions, and the
/// start of the entry point.
pub fn extract_code_essence(content: &str, max_length: usize) -> String {
    if content.chars().count() <= max_length {
        return content.to_string();
    }

    let lines: Vec<&str> = content.split('\n').collect();
    let head_lines = lines.len() / 5;
    let mut result = lines[..head_lines].join("\n");

    let definitions: Vec<&str> = DEFINITION_RE
        .find_iter(content)
        .take(MAX_DEFINITIONS)
        .map(|m| m.as_str())
        .collect();
    if !definitions.is_empty() {
        result.push_str("\n\n# Key function definitions found in the code:\n");
        let listed: Vec<String> = definitions.iter().map(|d| format!("# - {d}")).collect();
        result.push_str(&listed.join("\n"));
    }

    if let Some(entry) = entry_point_excerpt(content) {
        result.push_str("\n\n# Main entry point:\n");
        result.push_str(&entry);
    }

    if result.chars().count() > max_length {
        result = result.chars().take(max_length).collect();
        result.push_str("\n\n# [Code truncated due to length...]");
    }
    result
}

/// Up to [`ENTRY_POINT_EXCERPT`] characters starting at the last entry-point
/// marker that opens a block.
fn entry_point_excerpt(content: &str) -> Option<String> {
    ENTRY_POINTS
        .iter()
        .filter(|marker| content.contains(*marker))
        .filter_map(|marker| {
            let re = Regex::new(&format!(r"(?s){}.*?\{{", regex::escape(marker))).ok()?;
            re.find(content).map(|m| m.start())
        })
        .last()
        .map(|start| content[start..].chars().take(ENTRY_POINT_EXCERPT).collect())
}

/// The user turn that introduces the file before the questions.
pub fn initial_prompt(content: &str, file_name: &str, language: &str, max_code_length: usize) -> String {
    let essence = extract_code_essence(content, max_code_length);
    format!(
        "I'm going to ask you three sequential questions about the following {language} code file.\n\
         Please analyze this code carefully: I'll ask about its purpose, a comprehensive line-by-line \
         explanation, and potential improvements.\n\
         \n\
         I need extremely thorough and educational explanations that anyone can understand, \
         regardless of their programming experience.\n\
         \n\
         Filename: {file_name}\n\
         \n\
         Code:\n\
         ```{fence}\n\
         {essence}\n\
         ```",
        fence = language.to_lowercase(),
    )
}

/// System and user turns that open every conversation about `path`.
pub fn priming_turns(path: &Path, content: &str, max_code_length: usize) -> Vec<Message> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(initial_prompt(
            content,
            &file_name,
            language_for(path),
            max_code_length,
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deepseek::types::Role;

    #[test]
    fn default_questions_are_ordered() {
        let spec = default_questions();
        assert_eq!(
            spec.suffixes(),
            vec!["_overview.md", "_line_by_line.md", "_improvements.md"]
        );
        assert!(spec.get(0).unwrap().prompt.starts_with("What is the purpose"));
        assert!(spec.get(2).unwrap().prompt.starts_with("What improvements"));
    }

    #[test]
    fn language_mapping() {
        assert_eq!(language_for(Path::new("a.c")), "C");
        assert_eq!(language_for(Path::new("b.CPP")), "C++");
        assert_eq!(language_for(Path::new("board.dts")), "Device Tree Source");
        assert_eq!(language_for(Path::new("x.rs")), "Unknown");
    }

    #[test]
    fn short_code_is_kept_verbatim() {
        let code = "int main(void) { return 0; }";
        assert_eq!(extract_code_essence(code, 6000), code);
    }

    #[test]
    fn long_code_is_condensed_with_definitions_and_entry_point() {
        let mut code = String::new();
        for i in 0..200 {
            code.push_str(&format!("static int helper_{i}() {{ return {i}; }}\n"));
        }
        code.push_str("int main(void) {\n    return helper_1();\n}\n");

        let essence = extract_code_essence(&code, 3000);

        assert!(essence.starts_with("static int helper_0()"));
        assert!(essence.contains("# Key function definitions found in the code:"));
        assert!(essence.contains("# - helper_0()"));
        assert!(!essence.contains("# - helper_20()"));
        assert!(essence.contains("# Main entry point:\nint main(void) {"));
    }

    #[test]
    fn condensed_code_respects_length_limit() {
        let code = "x".repeat(500) + "\n" + &"y = 1;\n".repeat(1000);
        let essence = extract_code_essence(&code, 100);
        assert!(essence.ends_with("# [Code truncated due to length...]"));
        let body = essence.trim_end_matches("\n\n# [Code truncated due to length...]");
        assert_eq!(body.chars().count(), 100);
    }

    #[test]
    fn multibyte_content_does_not_split_characters() {
        let code = "// überprüfung\n".repeat(400);
        let essence = extract_code_essence(&code, 50);
        assert!(essence.contains("[Code truncated"));
    }

    #[test]
    fn priming_turns_embed_file_and_language() {
        let turns = priming_turns(Path::new("drivers/led.cpp"), "int x;", 6000);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::System);
        assert_eq!(turns[1].role, Role::User);
        assert!(turns[1].content.contains("following C++ code file"));
        assert!(turns[1].content.contains("Filename: led.cpp"));
        assert!(turns[1].content.contains("```c++\nint x;\n```"));
    }
}
