//! TwiML documents returned to Twilio voice webhooks.

use crate::domain::value_objects::alerts::CallResponse;

pub const CHECK_IN_PROMPT: &str = "こちらは熱中症見守りサービスです。\
体調に問題がなければ1を、少し疲れている場合は2を、助けが必要な場合は3を押してください。";

pub const RETRY_PROMPT: &str = "入力を確認できませんでした。もう一度お願いします。";

pub const NO_INPUT_MESSAGE: &str = "入力が確認できませんでした。後ほどもう一度お電話します。";

pub const CLOSED_MESSAGE: &str = "この確認はすでに終了しています。ご協力ありがとうございました。";

pub fn acknowledgement(response: CallResponse) -> &'static str {
    match response {
        CallResponse::Ok => "ありがとうございます。引き続き水分補給と涼しい場所での休憩を心がけてください。",
        CallResponse::Tired => "承知しました。ご家族に連絡します。涼しい場所で休んでください。",
        CallResponse::Help => "承知しました。すぐにご家族と担当者に連絡します。",
    }
}

/// A single-digit `<Gather>` posting back to `action_url`. Falls through to
/// `NO_INPUT_MESSAGE` when nothing is pressed.
pub fn gather_prompt(action_url: &str, prompt: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<Response>"#,
            r#"<Gather numDigits="1" timeout="8" method="POST" action="{action}">"#,
            r#"<Say language="ja-JP">{prompt}</Say>"#,
            r#"</Gather>"#,
            r#"<Say language="ja-JP">{fallback}</Say>"#,
            r#"</Response>"#
        ),
        action = escape_xml(action_url),
        prompt = escape_xml(prompt),
        fallback = escape_xml(NO_INPUT_MESSAGE),
    )
}

pub fn say_and_hangup(message: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<Response><Say language="ja-JP">{message}</Say><Hangup/></Response>"#
        ),
        message = escape_xml(message),
    )
}

fn escape_xml(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
