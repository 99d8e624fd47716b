use common::storage::types::search_params::SearchParams;

pub static RESOURCE_SEARCH_SYSTEM_MESSAGE: &str = "You help people find eating disorder support \
resources near them. Search the web for current, real resources and answer with a single JSON \
object of the form {\"introduction\": string, \"categories\": [{\"name\": string, \"resources\": \
[{\"name\": string, \"description\": string, \"url\": string, \"phone\": string, \"address\": \
string, \"cost\": string, \"notes\": string}]}]}. Omit fields you cannot verify. Do not wrap the \
JSON in prose.";

pub fn build_search_message(params: &SearchParams) -> String {
    let preference = params.preference.as_deref().unwrap_or("both");
    let mut message = format!(
        "Location: {}\nPreferred format (in-person, virtual or both): {preference}",
        params.location
    );

    if !params.extra.is_empty() {
        let context = serde_json::to_string_pretty(&params.extra).unwrap_or_default();
        message.push_str("\nAdditional context from the self-assessment:\n");
        message.push_str(&context);
    }

    message
}
