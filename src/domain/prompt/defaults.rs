//! Default prompt texts used by synthesizers, selectors, planners and agents

use super::PromptTemplate;

pub const TEXT_QA_TMPL: &str = "Context information is below.\n\
---------------------\n\
{context_str}\n\
---------------------\n\
Given the context information and not prior knowledge, answer the query.\n\
Query: {query_str}\n\
Answer: ";

pub const REFINE_TMPL: &str = "The original query is as follows: {query_str}\n\
We have provided an existing answer: {existing_answer}\n\
We have the opportunity to refine the existing answer (only if needed) with some more context below.\n\
------------\n\
{context_msg}\n\
------------\n\
Given the new context, refine the original answer to better answer the query. \
If the context isn't useful, return the original answer.\n\
Refined Answer: ";

pub const TREE_SUMMARIZE_TMPL: &str = "Context information from multiple sources is below.\n\
---------------------\n\
{context_str}\n\
---------------------\n\
Given the information from multiple sources and not prior knowledge, answer the query.\n\
Query: {query_str}\n\
Answer: ";

pub const SIMPLE_INPUT_TMPL: &str = "{query_str}";

pub const HYDE_TMPL: &str = "Please write a passage to answer the question.\n\
Try to include as many key details as possible.\n\
\n\
{query_str}\n\
\n\
Passage: ";

pub const SINGLE_SELECT_TMPL: &str = "Some choices are given below. It is provided in a numbered list \
(1 to {num_choices}), where each item in the list corresponds to a summary.\n\
---------------------\n\
{context_list}\n\
---------------------\n\
Using only the choices above and not prior knowledge, return the choice that is most relevant \
to the question: '{query_str}'\n\
\n\
The output should be a JSON list with exactly one object, for example:\n\
[{{\"choice\": 1, \"reason\": \"<why this choice>\"}}]\n";

pub const MULTI_SELECT_TMPL: &str = "Some choices are given below. It is provided in a numbered list \
(1 to {num_choices}), where each item in the list corresponds to a summary.\n\
---------------------\n\
{context_list}\n\
---------------------\n\
Using only the choices above and not prior knowledge, return the top choices \
(no more than {max_outputs}, but only select what is needed) that are most relevant \
to the question: '{query_str}'\n\
\n\
The output should be a JSON list of objects, for example:\n\
[{{\"choice\": 1, \"reason\": \"<why>\"}}, {{\"choice\": 3, \"reason\": \"<why>\"}}]\n";

pub const SUB_QUESTION_TMPL: &str = "Given a user question and a list of tools, output a list of \
relevant sub-questions that, when answered together, answer the user question.\n\
Write one sub-question per line in the form:\n\
[tool_name] sub-question\n\
Only use the tool names listed below.\n\
\n\
# Tools\n\
{tools_str}\n\
\n\
# User Question\n\
{query_str}\n\
\n\
# Sub-questions\n";

pub const REACT_SYSTEM_TMPL: &str = "You are designed to help with a variety of tasks, from answering \
questions to providing summaries to other types of analyses.\n\
\n\
## Tools\n\
You have access to the following tools:\n\
{tool_desc}\n\
\n\
## Output Format\n\
To use a tool, answer in the following format:\n\
\n\
Thought: I need to use a tool to help me answer the question.\n\
Action: tool name (one of {tool_names})\n\
Action Input: the input to the tool as JSON, e.g. {{\"input\": \"hello world\"}}\n\
\n\
The tool result will be returned as an observation. Repeat the format until you have \
enough information to answer, then respond with:\n\
\n\
Thought: I can answer without using any more tools.\n\
Answer: [your answer here]\n";

pub const KG_KEYWORD_EXTRACT_TMPL: &str = "A question is provided below. Given the question, extract up to \
{max_keywords} keywords from the text. Focus on extracting the keywords that we can use to best \
lookup answers to the question. Avoid stopwords.\n\
---------------------\n\
{query_str}\n\
---------------------\n\
Provide keywords in the following comma-separated format: 'KEYWORDS: <keywords>'\n";

pub fn text_qa_prompt() -> PromptTemplate {
    PromptTemplate::new(TEXT_QA_TMPL)
}

pub fn refine_prompt() -> PromptTemplate {
    PromptTemplate::new(REFINE_TMPL)
}

pub fn tree_summarize_prompt() -> PromptTemplate {
    PromptTemplate::new(TREE_SUMMARIZE_TMPL)
}

pub fn simple_input_prompt() -> PromptTemplate {
    PromptTemplate::new(SIMPLE_INPUT_TMPL)
}

pub fn hyde_prompt() -> PromptTemplate {
    PromptTemplate::new(HYDE_TMPL)
}

pub fn single_select_prompt() -> PromptTemplate {
    PromptTemplate::new(SINGLE_SELECT_TMPL)
}

pub fn multi_select_prompt() -> PromptTemplate {
    PromptTemplate::new(MULTI_SELECT_TMPL)
}

pub fn sub_question_prompt() -> PromptTemplate {
    PromptTemplate::new(SUB_QUESTION_TMPL)
}

pub fn react_system_prompt() -> PromptTemplate {
    PromptTemplate::new(REACT_SYSTEM_TMPL)
}

pub fn kg_keyword_extract_prompt() -> PromptTemplate {
    PromptTemplate::new(KG_KEYWORD_EXTRACT_TMPL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_variables() {
        assert_eq!(text_qa_prompt().variables(), &["context_str", "query_str"]);
        assert_eq!(
            refine_prompt().variables(),
            &["query_str", "existing_answer", "context_msg"]
        );
        assert_eq!(simple_input_prompt().variables(), &["query_str"]);
        assert_eq!(
            multi_select_prompt().variables(),
            &["num_choices", "context_list", "max_outputs", "query_str"]
        );
        assert_eq!(react_system_prompt().variables(), &["tool_desc", "tool_names"]);
    }

    #[test]
    fn test_select_prompt_renders_json_example() {
        let rendered = single_select_prompt()
            .format(&[
                ("num_choices", "2"),
                ("context_list", "(1) a\n\n(2) b"),
                ("query_str", "q"),
            ])
            .unwrap();

        assert!(rendered.contains(r#"[{"choice": 1, "reason": "<why this choice>"}]"#));
    }
}
