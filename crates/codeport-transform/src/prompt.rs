//! Prompts sent to the model for one file.

/// Base system prompt: rewrite in place, or emit a multi-file project.
pub const BASE_SYSTEM_PROMPT: &str = "You are an expert software architect. \
If the user asks to PORT or REWRITE code into a new language/framework that requires multiple files (like Spring Boot), \
you MUST output every single file needed for the new project.\n\n\
STRICT OUTPUT FORMAT:\n\
To create a file, start with: ### FILE: <path/to/filename>\n\
Followed immediately by the code for that file.\n\
Example:\n\
### FILE: pom.xml\n\
<project>...</project>\n\
### FILE: src/main/java/com/example/App.java\n\
package com.example;\n\
...\n\n\
Do not output conversational text. Just the file markers and code.";

/// User prompt carrying the file and the instructions.
pub fn user_prompt(filename: &str, instructions: &str, content: &str) -> String {
    format!("CURRENT FILE: {filename}\nINSTRUCTION: {instructions}\nCONTENT:\n{content}")
}

/// Query sent to the knowledge base for one file.
pub fn rag_query(instructions: &str, filename: &str) -> String {
    format!("{instructions} {filename}")
}

/// Wrap retrieved text as a context block.
///
/// Returns `None` for empty text or text mentioning an error, which
/// retrieval servers use for "nothing found".
pub fn knowledge_block(retrieved: &str) -> Option<String> {
    if retrieved.trim().is_empty() || retrieved.to_lowercase().contains("error") {
        return None;
    }
    Some(format!(
        "\n\n--- KNOWLEDGE BASE CONTEXT ---\n\
         The following information was retrieved from the knowledge base. \
         Use this context to inform your code generation:\n\n\
         {retrieved}\n\
         --- END CONTEXT ---\n"
    ))
}

/// Assemble the system prompt.
///
/// `tools` is the rendered tool catalog, offered only in agentic mode.
pub fn system_prompt(knowledge: Option<&str>, tools: Option<&str>) -> String {
    let mut prompt = BASE_SYSTEM_PROMPT.to_string();
    if let Some(knowledge) = knowledge {
        prompt.push_str(knowledge);
    }
    if let Some(tools) = tools {
        prompt.push_str("\n\n");
        prompt.push_str(tools);
        prompt.push('\n');
        prompt.push_str(codeport_agent::tool_call_instructions());
    }
    prompt
}
