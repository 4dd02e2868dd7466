//! Prompt templates of the three minutes actions.

/// Answer the QA prompt asks for when the minutes do not cover the question.
pub const NOT_IN_MINUTES: &str = "記載がありません";

pub fn summary_prompt(raw_text: &str) -> String {
    format!(
        "あなたは会議議事録の要約専門家です。以下の会議議事録を要約してください。

【要約の品質要件】
- 読みやすさ優先（箇条書き主体）
- 以下の要素を含める（存在する範囲で）：
  1. 決定事項（何が決まったか）
  2. 主要論点（何が議論されたか）
  3. 次アクションの方向性（担当者や期限は別途確定するため、ここでは断定しない）
- 議事録にない内容は創作しない

【会議議事録】
{raw_text}

【要約】"
    )
}

pub fn action_extraction_prompt(raw_text: &str) -> String {
    format!(
        "あなたは会議議事録からアクション項目を抽出するアシスタントです。
以下の会議議事録から、誰かが実行すべきタスクをすべて抽出してください。

【出力形式】
次の形式のJSON配列のみを出力してください。説明文は不要です。
[
  {{
    \"task_content\": \"タスクの内容（必須）\",
    \"assignee_name\": \"担当者名。記載がなければ null\",
    \"due_at\": \"期限（YYYY-MM-DD）。記載がなければ null\",
    \"note\": \"補足。なければ null\",
    \"evidence\": \"根拠となる議事録の原文（必須）\"
  }}
]

【ルール】
- evidence には議事録の該当箇所をそのまま引用する
- 議事録にない担当者や期限を推測で埋めない
- タスクが1件もない場合は [] を出力する

【会議議事録】
{raw_text}"
    )
}

pub fn qa_prompt(raw_text: &str, question: &str) -> String {
    format!(
        "あなたは会議議事録の内容について質問に答えるアシスタントです。
以下の会議議事録だけを根拠に、質問に回答してください。

【出力形式】
次の形式のJSONオブジェクトのみを出力してください。説明文は不要です。
{{
  \"answer\": \"回答\",
  \"evidence\": \"根拠となる議事録の原文\"
}}

【ルール】
- 議事録に記載がない場合は answer を \"{NOT_IN_MINUTES}\" とし、evidence にはその判断の根拠を書く
- 議事録にない内容は創作しない

【会議議事録】
{raw_text}

【質問】
{question}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_embed_inputs() {
        assert!(summary_prompt("Participants: A, B").contains("Participants: A, B"));

        let extraction = action_extraction_prompt("議題1");
        assert!(extraction.contains("議題1"));
        assert!(extraction.contains("\"evidence\""));

        let qa = qa_prompt("Participants: A, B", "Who attended?");
        assert!(qa.contains("Who attended?"));
        assert!(qa.contains(NOT_IN_MINUTES));
    }
}
