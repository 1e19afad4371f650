//! Prompt construction and query intent classification.

/// Query intents, each with its own prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    FileCount,
    RepoOverview,
    General,
}

const FILE_COUNT_PHRASES: &[&str] = &["how many files", "number of files", "file count"];

const OVERVIEW_PHRASES: &[&str] = &[
    "what is this repo about",
    "repository purpose",
    "project overview",
    "what does this repo do",
];

/// Classify a query by case-insensitive phrase match. File-count wins ties.
pub fn classify_intent(query: &str) -> Intent {
    let lower = query.to_lowercase();
    if FILE_COUNT_PHRASES.iter().any(|p| lower.contains(p)) {
        Intent::FileCount
    } else if OVERVIEW_PHRASES.iter().any(|p| lower.contains(p)) {
        Intent::RepoOverview
    } else {
        Intent::General
    }
}

/// Prompt asking for a structured summary of one file.
pub fn summarize_file_prompt(file_name: &str, content: &str) -> String {
    format!(
        "Analyze the following code from the file named \"{file_name}\". Provide a detailed summary (4-6 sentences) that includes:
- The main purpose of the file.
- Key functions, classes, or components defined (if any).
- Notable dependencies or imports used.
- How the file interacts with other parts of the codebase (e.g., data flow, API calls, or UI rendering).
- Any unique patterns, configurations, or notable implementations.
Output format should be plain text, clear, and structured for easy reading.

CODE:
{content}"
    )
}

/// Prompt answering `query` from a rendered context block.
pub fn query_prompt(intent: Intent, context: &str, artifact_count: usize, query: &str) -> String {
    match intent {
        Intent::FileCount => format!(
            "The repository contains {artifact_count} files, as determined by the number of file summaries stored. Below are the detailed summaries of these files for additional context, if needed.

Repository File Summaries:
{context}

User Query: {query}"
        ),
        Intent::RepoOverview => format!(
            "You are an AI assistant analyzing a codebase. Below are detailed summaries of the files in the current repository. Based on these summaries, provide a high-level overview (3-5 sentences) of the repository's purpose, main functionality, and key components. Highlight the overall architecture, primary features, and any notable technologies or patterns used. If possible, infer the type of application or system this repository represents.

Repository File Summaries:
{context}

User Query: {query}"
        ),
        Intent::General => format!(
            "You are an AI assistant analyzing a codebase. Below are detailed summaries of the files in the current repository to provide context for answering the user's query. Use this information to give accurate, codebase-specific responses, including references to specific files, functions, or components where relevant. If the query is broad, leverage the summaries to infer relationships or provide insights about the codebase structure.

Repository File Summaries:
{context}

User Query: {query}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_file_count_queries() {
        assert_eq!(classify_intent("How many files are in this repo?"), Intent::FileCount);
        assert_eq!(classify_intent("what's the NUMBER OF FILES here"), Intent::FileCount);
    }

    #[test]
    fn classifies_overview_queries() {
        assert_eq!(classify_intent("What is this repo about?"), Intent::RepoOverview);
        assert_eq!(classify_intent("give me a project overview"), Intent::RepoOverview);
        assert_eq!(classify_intent("Repository purpose?"), Intent::RepoOverview);
    }

    #[test]
    fn everything_else_is_general() {
        assert_eq!(classify_intent("Where is the retry logic implemented?"), Intent::General);
        assert_eq!(classify_intent(""), Intent::General);
    }

    #[test]
    fn file_count_takes_precedence() {
        assert_eq!(
            classify_intent("what is this repo about and how many files does it have"),
            Intent::FileCount
        );
    }

    #[test]
    fn summarize_prompt_names_file_and_all_facets() {
        let p = summarize_file_prompt("src/app.js", "let x = 1;");
        assert!(p.contains("\"src/app.js\""));
        assert!(p.contains("main purpose"));
        assert!(p.contains("Key functions"));
        assert!(p.contains("dependencies"));
        assert!(p.contains("interacts with other parts"));
        assert!(p.ends_with("CODE:\nlet x = 1;"));
    }

    #[test]
    fn file_count_template_states_count() {
        let p = query_prompt(Intent::FileCount, "ctx", 42, "how many files?");
        assert!(p.starts_with("The repository contains 42 files"));
        assert!(p.contains("Repository File Summaries:\nctx"));
        assert!(p.ends_with("User Query: how many files?"));
    }

    #[test]
    fn overview_and_general_templates_differ() {
        let o = query_prompt(Intent::RepoOverview, "ctx", 1, "q");
        let g = query_prompt(Intent::General, "ctx", 1, "q");
        assert!(o.contains("3-5 sentences"));
        assert!(g.contains("references to specific files"));
        assert!(!g.contains("3-5 sentences"));
    }
}
