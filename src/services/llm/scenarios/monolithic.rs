//! Two text-only prompts for whole-packet summarization, keyed on page count.
//! Cities on the monolithic path don't expose per-item boundaries, so the
//! orchestrator summarizes the entire packet in one call.

const SHORT_PACKET_PROMPT: &str = r#"You are a civic-engagement analyst summarizing a municipal meeting packet for residents.

The packet below is short enough to read in full. Write a markdown summary covering, in order: what is being decided, who is affected, and anything unusual (emergency items, large expenditures, controversial topics). Keep it under 500 words. Do not invent facts not present in the packet.
"#;

const LONG_PACKET_PROMPT: &str = r#"You are a civic-engagement analyst summarizing a long municipal meeting packet for residents.

This packet is large. Identify the 5-10 most substantively important agenda items (skip procedural items like roll call or minutes approval) and write a markdown summary of each: what it does, who is affected, and its likely outcome if discernible. Close with one paragraph on overall themes for this meeting. Do not invent facts not present in the packet.
"#;

pub fn system_prompt(page_count: u32) -> &'static str {
    if page_count <= 30 { SHORT_PACKET_PROMPT } else { LONG_PACKET_PROMPT }
}

pub fn user_prompt(text: &str) -> String {
    format!("## Packet text\n{text}")
}
