use std::collections::BTreeMap;
use std::path::PathBuf;

use super::types::ChainStepConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_COLLECTION: &str = "kakaotalk";
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_SEPARATOR: &str = "\n";
pub const DEFAULT_TOP_K: usize = 5;

pub const DEFAULT_CALLBACK_DELAY_MS: u64 = 1000;

pub const KNOWLEDGE_TOOL_NAME: &str = "query_to_vectordb";

pub fn default_system_prompt() -> String {
    "You are an encyclopedia of KakaoTalk services. We search the database for user \
     questions and provide expert answers to relevant sentences.\n\
     Your users are Korean, so you need to communicate in Korean.\n\
     - You search the database for user questions using function calling and expertly \
     answer relevant sentences."
        .to_string()
}

pub fn default_tool_description() -> String {
    "Searches the database for sentences related to KakaoTalk.".to_string()
}

pub fn default_query_description() -> String {
    "Keyword or sentence about KakaoTalk to search for".to_string()
}

pub fn default_corpus_path() -> PathBuf {
    PathBuf::from("data/kakao_channel.txt")
}

pub fn default_intent_prompt() -> PathBuf {
    PathBuf::from("data/parse_intent.txt")
}

pub fn default_intent_list() -> PathBuf {
    PathBuf::from("data/intent_list.txt")
}

pub fn default_chains() -> BTreeMap<String, Vec<ChainStepConfig>> {
    let mut chains = BTreeMap::new();

    chains.insert(
        "bug".to_string(),
        vec![
            ChainStepConfig {
                template: PathBuf::from("data/bug_say_sorry.txt"),
                output_key: "bug_step1".to_string(),
            },
            ChainStepConfig {
                template: PathBuf::from("data/bug_request_context.txt"),
                output_key: "bug_step2".to_string(),
            },
        ],
    );

    chains.insert(
        "enhancement".to_string(),
        vec![ChainStepConfig {
            template: PathBuf::from("data/enhancement_say_thanks.txt"),
            output_key: "enhancement_step1".to_string(),
        }],
    );

    chains
}
